use portal_types::Markup;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient toast for the surrounding page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

/// Events broadcast from a review session to whoever hosts it.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A markup was confirmed by the server.
    MarkupCreated(Markup),

    MarkupDeleted { markup_id: Uuid },

    Notice(Notice),

    /// The markup list was re-fetched.
    Refreshed { markups: usize, comments: usize },

    /// The initial-load spinner turned on or off.
    LoadingChanged(bool),
}
