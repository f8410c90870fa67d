//! The activity feed: pins, general comments and not-yet-confirmed comments in
//! one chronological list.

use chrono::{DateTime, Utc};
use portal_types::{Actor, Author, GeneralComment, Markup, MarkupType, Point};
use uuid::Uuid;

use crate::state::OptimisticComment;

pub const EMPTY_FEED_LABEL: &str = "No comments yet";

/// Avatar color for the viewer's own entries.
pub const BRAND_COLOR: &str = "#6366f1";

pub const AVATAR_PALETTE: [&str; 8] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#14b8a6", "#3b82f6", "#8b5cf6", "#ec4899",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// A comment pin on the canvas.
    Comment,
    /// A general comment, confirmed or optimistic.
    Message,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: Uuid,
    pub kind: FeedKind,
    /// Empty for a pin whose text never saved.
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub position: Option<Point>,
    pub markup_id: Option<Uuid>,
    pub pending: bool,
}

impl FeedEntry {
    fn from_pin(markup: &Markup) -> Self {
        Self {
            id: markup.id,
            kind: FeedKind::Comment,
            text: markup.pin_text().unwrap_or_default().to_string(),
            author: markup.author.clone(),
            created_at: markup.created_at,
            position: markup.position,
            markup_id: Some(markup.id),
            pending: false,
        }
    }

    fn from_message(comment: &GeneralComment, pending: bool) -> Self {
        Self {
            id: comment.id,
            kind: FeedKind::Message,
            text: comment.text.clone(),
            author: comment.author.clone(),
            created_at: comment.created_at,
            position: None,
            markup_id: None,
            pending,
        }
    }
}

/// Concatenate the three sources and sort ascending by creation time.
///
/// The sort is stable, so entries with equal timestamps keep source order.
/// Ids are not de-duplicated across sources.
pub fn merge(
    markups: &[Markup],
    general: &[GeneralComment],
    optimistic: &[OptimisticComment],
) -> Vec<FeedEntry> {
    let mut feed: Vec<FeedEntry> = markups
        .iter()
        .filter(|m| m.kind == MarkupType::Comment)
        .map(FeedEntry::from_pin)
        .chain(general.iter().map(|c| FeedEntry::from_message(c, false)))
        .chain(
            optimistic
                .iter()
                .map(|o| FeedEntry::from_message(&o.comment, o.confirmed_id.is_none())),
        )
        .collect();
    feed.sort_by_key(|e| e.created_at);
    feed
}

/// Name shown next to an entry, as seen by `viewer`.
pub fn display_name(author: &Author, viewer: &Actor) -> String {
    if author.is_owner() {
        if viewer.is_owner() {
            return "You".to_string();
        }
        return author.user_name.clone().unwrap_or_else(|| "Owner".to_string());
    }
    author
        .visitor_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Anonymous")
        .to_string()
}

pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|token| token.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn avatar_color(name: &str) -> &'static str {
    let sum: usize = name.chars().map(|c| c as usize).sum();
    AVATAR_PALETTE[sum % AVATAR_PALETTE.len()]
}

/// A feed entry resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub entry: FeedEntry,
    pub name: String,
    pub initials: String,
    pub color: &'static str,
    pub own: bool,
}

pub fn items(feed: Vec<FeedEntry>, viewer: &Actor) -> Vec<FeedItem> {
    feed.into_iter()
        .map(|entry| {
            let name = display_name(&entry.author, viewer);
            let own = viewer.wrote(&entry.author);
            let color = if own { BRAND_COLOR } else { avatar_color(&name) };
            FeedItem {
                initials: initials(&name),
                name,
                color,
                own,
                entry,
            }
        })
        .collect()
}
