use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GeneralComment, Markup, MarkupType, Point};

// -- Headers --

/// Owner user id. Identity headers are trusted; session handling lives elsewhere.
pub const HEADER_USER_ID: &str = "x-portal-user-id";
pub const HEADER_USER_NAME: &str = "x-portal-user-name";
pub const HEADER_VISITOR_NAME: &str = "x-visitor-name";

// -- Envelope --

/// Uniform response envelope: `content` on success, `err` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(content: T) -> Self {
        Self {
            content: Some(content),
            err: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: None,
            err: Some(message.into()),
        }
    }

    /// Collapse the envelope. A body with neither field is treated as an error.
    pub fn into_result(self) -> Result<T, String> {
        match (self.content, self.err) {
            (_, Some(err)) => Err(err),
            (Some(content), None) => Ok(content),
            (None, None) => Err("empty response".to_string()),
        }
    }
}

// -- Markups --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMarkupsQuery {
    pub attachment_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupList {
    #[serde(default)]
    pub markups: Vec<Markup>,
    #[serde(default)]
    pub general_comments: Vec<GeneralComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarkupRequest {
    pub attachment_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MarkupType,
    #[serde(default)]
    pub canvas_data: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteMarkupRequest {
    pub markup_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMarkupResponse {
    pub markup_id: Uuid,
}

// -- Comments --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMarkupCommentRequest {
    pub markup_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGeneralCommentRequest {
    pub attachment_id: Uuid,
    pub text: String,
}
