use axum::{
    Extension, Json,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
};
use portal_types::api::{
    CreateMarkupRequest, DeleteMarkupRequest, DeleteMarkupResponse, ListMarkupsQuery, MarkupList,
};
use portal_types::{Actor, Markup};
use tracing::debug;

use crate::AppState;
use crate::error::{ApiResult, ok};

pub async fn list_markups(
    State(state): State<AppState>,
    query: Result<Query<ListMarkupsQuery>, QueryRejection>,
) -> ApiResult<MarkupList> {
    let Query(query) = query?;
    ok(state.store.list(query.attachment_id))
}

pub async fn create_markup(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateMarkupRequest>, JsonRejection>,
) -> ApiResult<Markup> {
    let Json(req) = body?;
    let markup = state.store.create_markup(req, actor.author())?;
    debug!(markup_id = %markup.id, kind = ?markup.kind, attachment_id = %markup.attachment_id, "Markup created");
    ok(markup)
}

pub async fn delete_markup(
    State(state): State<AppState>,
    Extension(_actor): Extension<Actor>,
    body: Result<Json<DeleteMarkupRequest>, JsonRejection>,
) -> ApiResult<DeleteMarkupResponse> {
    let Json(req) = body?;
    state.store.delete_markup(req.markup_id)?;
    debug!(markup_id = %req.markup_id, "Markup deleted");
    ok(DeleteMarkupResponse {
        markup_id: req.markup_id,
    })
}
