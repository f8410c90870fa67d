use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Server rejected request: {0}")]
    Server(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Background image unreadable: {0}")]
    Image(#[from] image::ImageError),

    #[error("Raster surface: {0}")]
    Raster(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ReviewError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
