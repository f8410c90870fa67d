//! In-memory markup store, keyed by attachment.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use portal_types::api::{CreateMarkupRequest, MarkupList};
use portal_types::{Author, GeneralComment, Markup, MarkupComment, MarkupType};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_COLOR: &str = "#ef4444";
pub const DEFAULT_STROKE_WIDTH: u8 = 3;
pub const STROKE_WIDTH_RANGE: std::ops::RangeInclusive<u8> = 1..=20;

#[derive(Default)]
struct AttachmentThread {
    /// Creation order.
    markups: Vec<Markup>,
    general_comments: Vec<GeneralComment>,
}

#[derive(Default)]
struct StoreInner {
    threads: HashMap<Uuid, AttachmentThread>,
    /// markup id -> attachment id
    markup_owner: HashMap<Uuid, Uuid>,
}

#[derive(Default)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

fn required_text(text: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment text is required".into()));
    }
    Ok(text.to_string())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, attachment_id: Uuid) -> MarkupList {
        let inner = self.inner.read();
        inner
            .threads
            .get(&attachment_id)
            .map(|t| MarkupList {
                markups: t.markups.clone(),
                general_comments: t.general_comments.clone(),
            })
            .unwrap_or_default()
    }

    pub fn create_markup(&self, req: CreateMarkupRequest, author: Author) -> Result<Markup, ApiError> {
        if req.kind == MarkupType::Comment && req.position.is_none() {
            return Err(ApiError::BadRequest("Comment markups need a position".into()));
        }
        let stroke_width = req.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH);
        if !STROKE_WIDTH_RANGE.contains(&stroke_width) {
            return Err(ApiError::BadRequest(format!(
                "Stroke width must be between {} and {}",
                STROKE_WIDTH_RANGE.start(),
                STROKE_WIDTH_RANGE.end()
            )));
        }

        let markup = Markup {
            id: Uuid::new_v4(),
            attachment_id: req.attachment_id,
            kind: req.kind,
            canvas_data: req.canvas_data,
            position: req.position,
            color: req
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            stroke_width,
            author,
            created_at: Utc::now(),
            comments: Vec::new(),
        };

        let mut inner = self.inner.write();
        inner.markup_owner.insert(markup.id, markup.attachment_id);
        inner
            .threads
            .entry(markup.attachment_id)
            .or_default()
            .markups
            .push(markup.clone());
        Ok(markup)
    }

    pub fn delete_markup(&self, markup_id: Uuid) -> Result<(), ApiError> {
        let mut inner = self.inner.write();
        let attachment_id = inner
            .markup_owner
            .remove(&markup_id)
            .ok_or(ApiError::NotFound("Markup"))?;
        if let Some(thread) = inner.threads.get_mut(&attachment_id) {
            thread.markups.retain(|m| m.id != markup_id);
        }
        Ok(())
    }

    pub fn add_markup_comment(
        &self,
        markup_id: Uuid,
        text: &str,
        author: Author,
    ) -> Result<MarkupComment, ApiError> {
        let text = required_text(text)?;
        let mut inner = self.inner.write();
        let attachment_id = *inner
            .markup_owner
            .get(&markup_id)
            .ok_or(ApiError::NotFound("Markup"))?;
        let markup = inner
            .threads
            .get_mut(&attachment_id)
            .and_then(|t| t.markups.iter_mut().find(|m| m.id == markup_id))
            .ok_or_else(|| ApiError::Internal(format!("Markup {markup_id} indexed but missing")))?;

        let comment = MarkupComment {
            id: Uuid::new_v4(),
            markup_id,
            text,
            author,
            created_at: Utc::now(),
        };
        markup.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn add_general_comment(
        &self,
        attachment_id: Uuid,
        text: &str,
        author: Author,
    ) -> Result<GeneralComment, ApiError> {
        let text = required_text(text)?;
        let comment = GeneralComment {
            id: Uuid::new_v4(),
            attachment_id,
            text,
            author,
            created_at: Utc::now(),
        };
        self.inner
            .write()
            .threads
            .entry(attachment_id)
            .or_default()
            .general_comments
            .push(comment.clone());
        Ok(comment)
    }
}
