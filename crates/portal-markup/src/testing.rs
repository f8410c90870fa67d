//! In-process fake of the markup service for unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use portal_types::api::{
    CreateGeneralCommentRequest, CreateMarkupCommentRequest, CreateMarkupRequest, MarkupList,
};
use portal_types::{Actor, Attachment, GeneralComment, Markup, MarkupComment};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::client::MarkupApi;
use crate::error::{Result, ReviewError};
use crate::geometry::{DEFAULT_COLOR, DEFAULT_STROKE_WIDTH};

pub fn owner() -> Actor {
    Actor::Owner {
        user_id: Uuid::from_u128(0x5eed),
        name: "Morgan Reyes".into(),
    }
}

pub fn sample_attachment() -> Attachment {
    Attachment {
        id: Uuid::from_u128(0xa77ac),
        url: "https://files.example.test/portal/mockup.png".into(),
        content_type: "image/png".into(),
        path: "portal/42/mockup.png".into(),
    }
}

#[derive(Default)]
pub struct FakeState {
    pub markups: Vec<Markup>,
    pub general: Vec<GeneralComment>,
    pub created: Vec<CreateMarkupRequest>,
    pub deleted: Vec<Uuid>,

    pub list_calls: usize,
    pub create_calls: usize,
    pub markup_comment_calls: usize,
    pub general_comment_calls: usize,

    pub fail_list: bool,
    pub fail_create_markup: bool,
    pub fail_markup_comment: bool,
    pub fail_general_comment: bool,
    pub fail_all_deletes: bool,
    pub fail_delete: HashSet<Uuid>,

    /// Holds general comment posts until a permit is added.
    pub general_gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
pub struct FakeApi {
    pub inner: Mutex<FakeState>,
}

fn rejected() -> ReviewError {
    ReviewError::Server("rejected".into())
}

impl MarkupApi for FakeApi {
    async fn list(&self, _attachment_id: Uuid) -> Result<MarkupList> {
        let mut inner = self.inner.lock();
        inner.list_calls += 1;
        if inner.fail_list {
            return Err(rejected());
        }
        Ok(MarkupList {
            markups: inner.markups.clone(),
            general_comments: inner.general.clone(),
        })
    }

    async fn create_markup(&self, req: CreateMarkupRequest) -> Result<Markup> {
        let mut inner = self.inner.lock();
        inner.create_calls += 1;
        if inner.fail_create_markup {
            return Err(rejected());
        }
        let markup = Markup {
            id: Uuid::new_v4(),
            attachment_id: req.attachment_id,
            kind: req.kind,
            canvas_data: req.canvas_data.clone(),
            position: req.position,
            color: req.color.clone().unwrap_or_else(|| DEFAULT_COLOR.into()),
            stroke_width: req.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            author: owner().author(),
            created_at: Utc::now(),
            comments: Vec::new(),
        };
        inner.created.push(req);
        inner.markups.push(markup.clone());
        Ok(markup)
    }

    async fn delete_markup(&self, markup_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_all_deletes || inner.fail_delete.contains(&markup_id) {
            return Err(rejected());
        }
        inner.markups.retain(|m| m.id != markup_id);
        inner.deleted.push(markup_id);
        Ok(())
    }

    async fn create_markup_comment(&self, req: CreateMarkupCommentRequest) -> Result<MarkupComment> {
        let mut inner = self.inner.lock();
        inner.markup_comment_calls += 1;
        if inner.fail_markup_comment {
            return Err(rejected());
        }
        let comment = MarkupComment {
            id: Uuid::new_v4(),
            markup_id: req.markup_id,
            text: req.text,
            author: owner().author(),
            created_at: Utc::now(),
        };
        let markup = inner
            .markups
            .iter_mut()
            .find(|m| m.id == req.markup_id)
            .ok_or_else(|| ReviewError::Server("Markup not found".into()))?;
        markup.comments.push(comment.clone());
        Ok(comment)
    }

    async fn create_general_comment(&self, req: CreateGeneralCommentRequest) -> Result<GeneralComment> {
        let gate = self.inner.lock().general_gate.clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        let mut inner = self.inner.lock();
        inner.general_comment_calls += 1;
        if inner.fail_general_comment {
            return Err(rejected());
        }
        let comment = GeneralComment {
            id: Uuid::new_v4(),
            attachment_id: req.attachment_id,
            text: req.text,
            author: owner().author(),
            created_at: Utc::now(),
        };
        inner.general.push(comment.clone());
        Ok(comment)
    }
}
