use std::future::Future;

use portal_types::api::{
    ApiResponse, CreateGeneralCommentRequest, CreateMarkupCommentRequest, CreateMarkupRequest,
    DeleteMarkupRequest, DeleteMarkupResponse, HEADER_USER_ID, HEADER_USER_NAME,
    HEADER_VISITOR_NAME, MarkupList,
};
use portal_types::{Actor, Attachment, GeneralComment, Markup, MarkupComment};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};

/// The markup service as seen by the core.
pub trait MarkupApi: Send + Sync + 'static {
    fn list(&self, attachment_id: Uuid) -> impl Future<Output = Result<MarkupList>> + Send;

    fn create_markup(&self, req: CreateMarkupRequest) -> impl Future<Output = Result<Markup>> + Send;

    fn delete_markup(&self, markup_id: Uuid) -> impl Future<Output = Result<()>> + Send;

    fn create_markup_comment(
        &self,
        req: CreateMarkupCommentRequest,
    ) -> impl Future<Output = Result<MarkupComment>> + Send;

    fn create_general_comment(
        &self,
        req: CreateGeneralCommentRequest,
    ) -> impl Future<Output = Result<GeneralComment>> + Send;
}

/// reqwest-backed [`MarkupApi`].
#[derive(Clone)]
pub struct HttpMarkupApi {
    client: Client,
    base_url: String,
}

impl HttpMarkupApi {
    pub fn new(config: &ReviewConfig, actor: &Actor) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(actor_headers(actor)?)
            .build()
            .map_err(ReviewError::Transport)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw bytes of the attachment, for the canvas background.
    pub async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        let resp = self.client.get(&attachment.url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReviewError::Status { status, body });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

fn actor_headers(actor: &Actor) -> Result<HeaderMap> {
    let value = |s: &str| {
        HeaderValue::from_str(s).map_err(|_| ReviewError::Config(format!("'{s}' is not a valid header value")))
    };
    let mut headers = HeaderMap::new();
    match actor {
        Actor::Owner { user_id, name } => {
            headers.insert(HEADER_USER_ID, value(&user_id.to_string())?);
            headers.insert(HEADER_USER_NAME, value(name)?);
        }
        Actor::Visitor { name: Some(name) } => {
            headers.insert(HEADER_VISITOR_NAME, value(name)?);
        }
        Actor::Visitor { name: None } => {}
    }
    Ok(headers)
}

/// Send and unwrap the `{ content | err }` envelope.
async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    let body = resp.text().await?;

    match serde_json::from_str::<ApiResponse<T>>(&body) {
        Ok(envelope) => envelope.into_result().map_err(ReviewError::Server),
        Err(_) if !status.is_success() => Err(ReviewError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ReviewError::Decode(e.to_string())),
    }
}

impl MarkupApi for HttpMarkupApi {
    async fn list(&self, attachment_id: Uuid) -> Result<MarkupList> {
        debug!(%attachment_id, "Listing markups");
        send(
            self.client
                .get(self.url("/markups"))
                .query(&[("attachmentId", attachment_id.to_string())]),
        )
        .await
    }

    async fn create_markup(&self, req: CreateMarkupRequest) -> Result<Markup> {
        send(self.client.post(self.url("/markups")).json(&req)).await
    }

    async fn delete_markup(&self, markup_id: Uuid) -> Result<()> {
        let _: DeleteMarkupResponse = send(
            self.client
                .delete(self.url("/markups"))
                .json(&DeleteMarkupRequest { markup_id }),
        )
        .await?;
        Ok(())
    }

    async fn create_markup_comment(&self, req: CreateMarkupCommentRequest) -> Result<MarkupComment> {
        send(self.client.post(self.url("/markups/comments")).json(&req)).await
    }

    async fn create_general_comment(&self, req: CreateGeneralCommentRequest) -> Result<GeneralComment> {
        send(self.client.post(self.url("/comments")).json(&req)).await
    }
}
