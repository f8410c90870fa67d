//! Markup persistence adapter: turns finished gestures into API calls and
//! reconciles optimistic local state with what the server confirms.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use portal_types::api::{CreateGeneralCommentRequest, CreateMarkupCommentRequest, CreateMarkupRequest};
use portal_types::{Actor, GeneralComment, Markup, MarkupType, Point};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::MarkupApi;
use crate::error::ReviewError;
use crate::events::{Notice, ViewerEvent};
use crate::geometry::Path;
use crate::poller::Refresh;
use crate::state::{OptimisticComment, ReviewState, SharedState, appended, without};

/// Result of placing a comment pin.
#[derive(Debug, Clone, PartialEq)]
pub enum PinOutcome {
    /// Pin and its text were both saved.
    Created(Markup),
    /// The pin exists but its text could not be saved.
    Orphaned(Markup),
    /// Nothing was saved.
    NotCreated,
}

/// Per-markup result of a clear-all run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearReport {
    pub deleted: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

pub struct MarkupAdapter<A: MarkupApi> {
    api: Arc<A>,
    attachment_id: Uuid,
    actor: Actor,
    state: SharedState,
    events: broadcast::Sender<ViewerEvent>,
}

impl<A: MarkupApi> MarkupAdapter<A> {
    pub fn new(
        api: Arc<A>,
        attachment_id: Uuid,
        actor: Actor,
        events: broadcast::Sender<ViewerEvent>,
    ) -> Self {
        Self {
            api,
            attachment_id,
            actor,
            state: Arc::new(RwLock::new(ReviewState::default())),
            events,
        }
    }

    pub fn attachment_id(&self) -> Uuid {
        self.attachment_id
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Cheap copy of the current state (lists are shared).
    pub fn snapshot(&self) -> ReviewState {
        self.state.read().clone()
    }

    fn emit(&self, event: ViewerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn fail(&self, message: &str, err: &ReviewError) {
        warn!(attachment_id = %self.attachment_id, "{}: {}", message, err);
        self.emit(ViewerEvent::Notice(Notice::error(message)));
    }

    fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
        self.emit(ViewerEvent::LoadingChanged(loading));
    }

    /// Add a server markup unless a refresh already brought it in.
    fn insert_markup(&self, markup: &Markup) {
        let mut state = self.state.write();
        if !state.markups.iter().any(|m| m.id == markup.id) {
            state.markups = appended(&state.markups, markup.clone());
        }
    }

    fn remove_markup(&self, markup_id: Uuid) {
        let mut state = self.state.write();
        state.markups = without(&state.markups, |m| m.id == markup_id);
    }

    // --- Reads ---

    /// Fetch markups and general comments. Only the initial open shows the
    /// spinner; a failed initial load shows an empty list, a failed background
    /// refresh keeps what is already on screen.
    pub async fn load(&self, show_spinner: bool) {
        if show_spinner {
            self.set_loading(true);
        }

        match self.api.list(self.attachment_id).await {
            Ok(list) => {
                let (markups, comments) = (list.markups.len(), list.general_comments.len());
                {
                    let mut state = self.state.write();
                    let fetched = &list.general_comments;
                    // Confirmed optimistic entries give way once the server copy is listed.
                    state.optimistic = without(&state.optimistic, |o| {
                        o.confirmed_id
                            .is_some_and(|id| fetched.iter().any(|c| c.id == id))
                    });
                    state.markups = Arc::new(list.markups);
                    state.general_comments = Arc::new(list.general_comments);
                }
                debug!(attachment_id = %self.attachment_id, markups, comments, "Markups refreshed");
                self.emit(ViewerEvent::Refreshed { markups, comments });
            }
            Err(e) if show_spinner => {
                warn!(attachment_id = %self.attachment_id, "Initial markup load failed: {}", e);
                let mut state = self.state.write();
                state.markups = Arc::default();
                state.general_comments = Arc::default();
            }
            Err(e) => {
                debug!(attachment_id = %self.attachment_id, "Background refresh failed: {}", e);
            }
        }

        if show_spinner {
            self.set_loading(false);
        }
    }

    // --- Drawings ---

    /// Persist a finished stroke. On failure the stroke stays visible in the
    /// pending buffer and is not retried.
    pub async fn commit_path(&self, path: Path) -> Option<Markup> {
        {
            let mut state = self.state.write();
            state.pending_paths = appended(&state.pending_paths, path.clone());
        }

        let req = CreateMarkupRequest {
            attachment_id: self.attachment_id,
            kind: MarkupType::Drawing,
            canvas_data: path.points.clone(),
            color: Some(path.color.clone()),
            stroke_width: Some(path.stroke_width),
            position: None,
        };

        match self.api.create_markup(req).await {
            Ok(markup) => {
                {
                    let mut state = self.state.write();
                    state.pending_paths = without(&state.pending_paths, |p| *p == path);
                }
                self.insert_markup(&markup);
                debug!(markup_id = %markup.id, points = markup.canvas_data.len(), "Drawing saved");
                self.emit(ViewerEvent::MarkupCreated(markup.clone()));
                Some(markup)
            }
            Err(e) => {
                self.fail("Failed to save drawing", &e);
                None
            }
        }
    }

    // --- Comment pins ---

    /// Create a pin, then attach its text. A failed second step leaves the
    /// pin without text; it is not rolled back.
    pub async fn place_pin(&self, at: Point, text: &str, color: &str) -> PinOutcome {
        let text = text.trim();
        if text.is_empty() {
            return PinOutcome::NotCreated;
        }

        self.state.write().saving_pin = true;
        let outcome = self.place_pin_inner(at, text, color).await;
        self.state.write().saving_pin = false;
        outcome
    }

    async fn place_pin_inner(&self, at: Point, text: &str, color: &str) -> PinOutcome {
        let req = CreateMarkupRequest {
            attachment_id: self.attachment_id,
            kind: MarkupType::Comment,
            canvas_data: Vec::new(),
            color: Some(color.to_string()),
            stroke_width: None,
            position: Some(at),
        };

        let mut markup = match self.api.create_markup(req).await {
            Ok(markup) => markup,
            Err(e) => {
                self.fail("Failed to add comment", &e);
                return PinOutcome::NotCreated;
            }
        };

        let comment_req = CreateMarkupCommentRequest {
            markup_id: markup.id,
            text: text.to_string(),
        };

        match self.api.create_markup_comment(comment_req).await {
            Ok(comment) => {
                markup.comments.push(comment);
                self.insert_markup(&markup);
                self.emit(ViewerEvent::MarkupCreated(markup.clone()));
                PinOutcome::Created(markup)
            }
            Err(e) => {
                self.insert_markup(&markup);
                self.emit(ViewerEvent::MarkupCreated(markup.clone()));
                self.fail("Comment pin was saved without its text", &e);
                PinOutcome::Orphaned(markup)
            }
        }
    }

    // --- Deletes ---

    /// Delete the last markup in the list.
    pub async fn undo_last(&self) -> Option<Uuid> {
        let last = self.state.read().markups.last().map(|m| m.id)?;

        match self.api.delete_markup(last).await {
            Ok(()) => {
                self.remove_markup(last);
                self.emit(ViewerEvent::MarkupDeleted { markup_id: last });
                Some(last)
            }
            Err(e) => {
                self.fail("Failed to undo markup", &e);
                None
            }
        }
    }

    /// Delete every known markup, one call at a time. `confirm` receives the
    /// markup count and must approve before anything is sent. Best-effort:
    /// a failed delete does not stop the rest.
    pub async fn clear_all<F>(&self, confirm: F) -> Option<ClearReport>
    where
        F: FnOnce(usize) -> bool,
    {
        let markups = self.state.read().markups.clone();
        if markups.is_empty() || !confirm(markups.len()) {
            return None;
        }

        let mut report = ClearReport::default();
        for markup in markups.iter() {
            match self.api.delete_markup(markup.id).await {
                Ok(()) => {
                    self.remove_markup(markup.id);
                    self.emit(ViewerEvent::MarkupDeleted { markup_id: markup.id });
                    report.deleted.push(markup.id);
                }
                Err(e) => {
                    warn!(markup_id = %markup.id, "Delete during clear failed: {}", e);
                    report.failed.push(markup.id);
                }
            }
        }

        if report.failed.is_empty() {
            info!(attachment_id = %self.attachment_id, count = report.deleted.len(), "Cleared markups");
            self.emit(ViewerEvent::Notice(Notice::info("All markups cleared")));
        } else {
            self.emit(ViewerEvent::Notice(Notice::error(format!(
                "Failed to delete {} of {} markups",
                report.failed.len(),
                markups.len()
            ))));
        }
        Some(report)
    }

    // --- General comments ---

    pub fn set_composer(&self, text: &str) {
        self.state.write().composer = text.to_string();
    }

    /// Post the composer text. The entry appears and the box clears before
    /// the request goes out; on failure both are undone.
    pub async fn submit_comment(&self) -> Option<GeneralComment> {
        let (temp_id, raw, text) = {
            let mut state = self.state.write();
            let raw = state.composer.clone();
            let text = raw.trim().to_string();
            if state.submitting_comment || text.is_empty() {
                return None;
            }

            let temp_id = Uuid::new_v4();
            let optimistic = OptimisticComment {
                comment: GeneralComment {
                    id: temp_id,
                    attachment_id: self.attachment_id,
                    text: text.clone(),
                    author: self.actor.author(),
                    created_at: Utc::now(),
                },
                confirmed_id: None,
            };
            state.optimistic = appended(&state.optimistic, optimistic);
            state.composer.clear();
            state.submitting_comment = true;
            (temp_id, raw, text)
        };

        let req = CreateGeneralCommentRequest {
            attachment_id: self.attachment_id,
            text,
        };
        let result = self.api.create_general_comment(req).await;

        let mut state = self.state.write();
        state.submitting_comment = false;
        match result {
            Ok(comment) => {
                let confirmed: Vec<OptimisticComment> = state
                    .optimistic
                    .iter()
                    .cloned()
                    .map(|mut o| {
                        if o.comment.id == temp_id {
                            o.confirmed_id = Some(comment.id);
                        }
                        o
                    })
                    .collect();
                state.optimistic = Arc::new(confirmed);
                Some(comment)
            }
            Err(e) => {
                state.optimistic = without(&state.optimistic, |o| o.comment.id == temp_id);
                if state.composer.is_empty() {
                    state.composer = raw;
                }
                drop(state);
                self.fail("Failed to post comment", &e);
                None
            }
        }
    }
}

impl<A: MarkupApi> Refresh for MarkupAdapter<A> {
    async fn refresh(&self, show_spinner: bool) {
        self.load(show_spinner).await
    }
}
