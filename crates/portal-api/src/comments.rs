use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use portal_types::api::{CreateGeneralCommentRequest, CreateMarkupCommentRequest};
use portal_types::{Actor, GeneralComment, MarkupComment};
use tracing::debug;

use crate::AppState;
use crate::error::{ApiResult, ok};

/// Attach text to a markup (the pin's comment).
pub async fn create_markup_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateMarkupCommentRequest>, JsonRejection>,
) -> ApiResult<MarkupComment> {
    let Json(req) = body?;
    let comment = state
        .store
        .add_markup_comment(req.markup_id, &req.text, actor.author())?;
    debug!(markup_id = %req.markup_id, comment_id = %comment.id, "Markup comment added");
    ok(comment)
}

pub async fn create_general_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateGeneralCommentRequest>, JsonRejection>,
) -> ApiResult<GeneralComment> {
    let Json(req) = body?;
    let comment = state
        .store
        .add_general_comment(req.attachment_id, &req.text, actor.author())?;
    debug!(attachment_id = %req.attachment_id, comment_id = %comment.id, "General comment added");
    ok(comment)
}
