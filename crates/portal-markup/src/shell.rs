//! The review session for one open attachment: canvas, tools, feed and sync
//! wired together.

use std::sync::Arc;

use portal_types::{Actor, Attachment, Markup, Point};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::{ClearReport, MarkupAdapter, PinOutcome};
use crate::canvas::{BackgroundLayer, Scene, Surface, render};
use crate::client::{HttpMarkupApi, MarkupApi};
use crate::config::ReviewConfig;
use crate::error::Result;
use crate::events::ViewerEvent;
use crate::geometry::CanvasRect;
use crate::poller::{self, ActivityTracker, Interaction, PollPolicy, PollStatus, PollerHandle, Visibility};
use crate::state::ReviewState;
use crate::timeline::{self, EMPTY_FEED_LABEL, FeedItem};
use crate::tools::{Action, Tool, ToolState};

const EVENT_CAPACITY: usize = 256;

/// Share of the desktop width given to the canvas; the feed gets the rest.
pub const CANVAS_SPLIT: f64 = 0.7;

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Canvas and feed side by side, toolbar always visible.
    #[default]
    Desktop,
    /// Single pane with an overflow menu and zoom buttons.
    Mobile,
}

/// Canvas zoom and pan offset on the mobile layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    level: f64,
    pan: Point,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            level: 1.0,
            pan: Point::default(),
        }
    }
}

impl Zoom {
    pub fn level(self) -> f64 {
        self.level
    }

    pub fn pan(self) -> Point {
        self.pan
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.level = (self.level + ZOOM_STEP).min(ZOOM_MAX);
        self.level
    }

    /// Back at or below 1x there is nothing to pan across, so the offset resets.
    pub fn zoom_out(&mut self) -> f64 {
        self.level = (self.level - ZOOM_STEP).max(ZOOM_MIN);
        if self.level <= 1.0 {
            self.pan = Point::default();
        }
        self.level
    }

    /// Shift the magnified view. Ignored unless zoomed in.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Point {
        if self.level > 1.0 {
            self.pan = Point::new(self.pan.x + dx, self.pan.y + dy);
        }
        self.pan
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Entries of the mobile overflow menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    SelectTool(Tool),
    ToggleMarkups,
    Undo,
    ClearAll,
    Download,
}

/// Tooltip for the pin under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub markup_id: Uuid,
    pub anchor: Point,
    pub text: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub href: String,
    pub file_name: String,
}

pub struct ReviewSession<A: MarkupApi> {
    attachment: Attachment,
    layout: Layout,
    adapter: Arc<MarkupAdapter<A>>,
    tools: ToolState,
    background: BackgroundLayer,
    show_markups: bool,
    zoom: Zoom,
    activity: Arc<ActivityTracker>,
    visibility: watch::Sender<Visibility>,
    events: broadcast::Sender<ViewerEvent>,
    poller: Option<PollerHandle>,
}

impl ReviewSession<HttpMarkupApi> {
    /// Open a session against the HTTP service described by `config`,
    /// fetching the background image when the attachment is one.
    pub async fn connect(
        config: &ReviewConfig,
        attachment: Attachment,
        actor: Actor,
        layout: Layout,
    ) -> Result<Self> {
        let api = Arc::new(HttpMarkupApi::new(config, &actor)?);
        let mut session = Self::open(api.clone(), attachment, actor, layout, config.poll_policy()).await;

        if session.background.is_loading() {
            session.background = match api.fetch_attachment(&session.attachment).await {
                Ok(bytes) => BackgroundLayer::decode_or_failed(&bytes),
                Err(e) => {
                    warn!(attachment_id = %session.attachment.id, "Background fetch failed: {}", e);
                    BackgroundLayer::Failed
                }
            };
        }
        Ok(session)
    }
}

impl<A: MarkupApi> ReviewSession<A> {
    /// Load markups with the spinner, then start background polling.
    pub async fn open(
        api: Arc<A>,
        attachment: Attachment,
        actor: Actor,
        layout: Layout,
        policy: PollPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let adapter = Arc::new(MarkupAdapter::new(api, attachment.id, actor, events.clone()));
        let activity = Arc::new(ActivityTracker::new());
        let (visibility, visibility_rx) = watch::channel(Visibility::Visible);

        adapter.load(true).await;
        let poller = poller::spawn(adapter.clone(), activity.clone(), visibility_rx, policy);

        info!(attachment_id = %attachment.id, ?layout, "Review session opened");

        Self {
            background: BackgroundLayer::for_attachment(&attachment),
            attachment,
            layout,
            adapter,
            tools: ToolState::new(),
            show_markups: true,
            zoom: Zoom::default(),
            activity,
            visibility,
            events,
            poller: Some(poller),
        }
    }

    /// Stop polling and wait for the poller to exit.
    pub async fn close(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.shutdown().await;
        }
        debug!(attachment_id = %self.attachment.id, "Review session closed");
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn snapshot(&self) -> ReviewState {
        self.adapter.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    pub fn poll_status(&self) -> Option<PollStatus> {
        self.poller.as_ref().map(PollerHandle::status)
    }

    /// Spinner: initial markup load, or a background image still arriving.
    pub fn is_loading(&self) -> bool {
        self.adapter.state().read().loading || self.background.is_loading()
    }

    pub fn background(&self) -> &BackgroundLayer {
        &self.background
    }

    pub fn set_background_bytes(&mut self, bytes: &[u8]) {
        self.background = BackgroundLayer::decode_or_failed(bytes);
    }

    pub fn download_link(&self) -> DownloadLink {
        DownloadLink {
            href: self.attachment.url.clone(),
            file_name: self.attachment.file_name().to_string(),
        }
    }

    // --- Layout ---

    pub fn toolbar_visible(&self) -> bool {
        self.layout == Layout::Desktop
    }

    /// Canvas and feed widths for a desktop viewport.
    pub fn split(&self, width: f64) -> (f64, f64) {
        let canvas = width * CANVAS_SPLIT;
        (canvas, width - canvas)
    }

    /// Overflow menu entries; empty on desktop where the toolbar is shown.
    pub fn menu(&self) -> Vec<MenuAction> {
        if self.layout == Layout::Desktop {
            return Vec::new();
        }
        Tool::ALL
            .into_iter()
            .map(MenuAction::SelectTool)
            .chain([
                MenuAction::ToggleMarkups,
                MenuAction::Undo,
                MenuAction::ClearAll,
                MenuAction::Download,
            ])
            .collect()
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.record_interaction(Interaction::Click);
        self.zoom.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.record_interaction(Interaction::Click);
        self.zoom.zoom_out()
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Point {
        self.record_interaction(Interaction::Touch);
        self.zoom.pan_by(dx, dy)
    }

    pub fn reset_zoom(&mut self) {
        self.record_interaction(Interaction::Click);
        self.zoom.reset();
    }

    // --- Activity ---

    pub fn record_interaction(&self, kind: Interaction) {
        self.activity.record(kind);
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.send_replace(visibility);
    }

    /// Re-fetch without the spinner.
    pub async fn refresh(&self) {
        self.adapter.load(false).await;
    }

    // --- Tools ---

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.record_interaction(Interaction::Click);
        self.tools.set_tool(tool)
    }

    pub fn set_color(&mut self, color: &str) {
        self.record_interaction(Interaction::Input);
        self.tools.set_color(color);
    }

    pub fn set_stroke_width(&mut self, width: u8) {
        self.record_interaction(Interaction::Input);
        self.tools.set_stroke_width(width);
    }

    pub fn show_markups(&self) -> bool {
        self.show_markups
    }

    /// Hiding markups also drops any pin hover.
    pub fn toggle_markups(&mut self) -> bool {
        self.record_interaction(Interaction::Click);
        self.show_markups = !self.show_markups;
        if !self.show_markups {
            self.tools.clear_hover();
        }
        self.show_markups
    }

    // --- Pointer input, in client coordinates ---

    pub fn pointer_down(&mut self, rect: CanvasRect, client: Point) -> Vec<Action> {
        self.record_interaction(Interaction::PointerDown);
        self.tools.on_pointer_down(rect.to_canvas(client))
    }

    pub fn pointer_move(&mut self, rect: CanvasRect, client: Point) -> Vec<Action> {
        self.record_interaction(Interaction::PointerMove);
        let markups = self.adapter.state().read().markups.clone();
        self.tools
            .on_pointer_move(rect.to_canvas(client), &markups, self.show_markups)
    }

    /// End the drag; a committable stroke is saved before this returns.
    pub async fn pointer_up(&mut self) -> Option<Markup> {
        let actions = self.tools.on_pointer_up();
        self.commit(actions).await
    }

    pub async fn pointer_leave(&mut self) -> Option<Markup> {
        let actions = self.tools.on_pointer_leave();
        self.commit(actions).await
    }

    async fn commit(&self, actions: Vec<Action>) -> Option<Markup> {
        let path = actions.into_iter().find_map(|action| match action {
            Action::CommitPath(path) => Some(path),
            _ => None,
        })?;
        self.adapter.commit_path(path).await
    }

    // --- Comment pins ---

    /// Save the open pin composer. The composer closes unless nothing was
    /// created, so a failed save can be retried.
    pub async fn save_pin_comment(&mut self, text: &str) -> PinOutcome {
        self.record_interaction(Interaction::Click);
        let Some(at) = self.tools.composer_anchor() else {
            return PinOutcome::NotCreated;
        };
        let color = self.tools.color().to_string();

        let outcome = self.adapter.place_pin(at, text, &color).await;
        if outcome != PinOutcome::NotCreated {
            self.tools.take_composer();
        }
        outcome
    }

    pub fn cancel_pin_comment(&mut self) {
        self.tools.take_composer();
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        let markup_id = self.tools.hovered()?;
        let anchor = self.tools.tooltip_anchor()?;
        let state = self.adapter.state().read();
        let markup = state.markups.iter().find(|m| m.id == markup_id)?;
        Some(Tooltip {
            markup_id,
            anchor,
            text: markup.pin_text().unwrap_or_default().to_string(),
            author: timeline::display_name(&markup.author, self.adapter.actor()),
        })
    }

    // --- Deletes ---

    pub async fn undo_last(&self) -> Option<Uuid> {
        self.record_interaction(Interaction::Click);
        self.adapter.undo_last().await
    }

    pub async fn clear_all<F>(&self, confirm: F) -> Option<ClearReport>
    where
        F: FnOnce(usize) -> bool,
    {
        self.record_interaction(Interaction::Click);
        self.adapter.clear_all(confirm).await
    }

    // --- Feed ---

    pub fn set_composer(&self, text: &str) {
        self.record_interaction(Interaction::Input);
        self.adapter.set_composer(text);
    }

    pub async fn submit_comment(&self) -> bool {
        self.record_interaction(Interaction::Click);
        self.adapter.submit_comment().await.is_some()
    }

    pub fn feed(&self) -> Vec<FeedItem> {
        let state = self.adapter.snapshot();
        let feed = timeline::merge(&state.markups, &state.general_comments, &state.optimistic);
        timeline::items(feed, self.adapter.actor())
    }

    /// Text shown in place of an empty feed.
    pub fn feed_placeholder(&self) -> Option<&'static str> {
        self.feed().is_empty().then_some(EMPTY_FEED_LABEL)
    }

    // --- Drawing ---

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        let state = self.adapter.snapshot();
        let scene = Scene {
            background: &self.background,
            markups: &state.markups,
            pending: &state.pending_paths,
            active: self.tools.active_path(),
            show_markups: self.show_markups,
        };
        render(surface, &scene);
    }
}
