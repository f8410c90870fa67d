use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A stored file attached to a portal message. Read-only for the markup core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub url: String,
    pub content_type: String,
    pub path: String,
}

impl Attachment {
    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case("application/pdf")
    }

    pub fn is_image(&self) -> bool {
        self.content_type.to_ascii_lowercase().starts_with("image/")
    }

    /// Last path segment, used as the download file name.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkupType {
    Drawing,
    Comment,
    Highlight,
    Shape,
}

/// Who created a markup or comment. Owners carry a user id, visitors only a
/// free-form name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,
}

impl Author {
    pub fn is_owner(&self) -> bool {
        self.user_id.is_some()
    }
}

/// The party currently using the review surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Actor {
    Owner { user_id: Uuid, name: String },
    Visitor { name: Option<String> },
}

impl Actor {
    pub fn author(&self) -> Author {
        match self {
            Self::Owner { user_id, name } => Author {
                user_id: Some(*user_id),
                user_name: Some(name.clone()),
                visitor_name: None,
            },
            Self::Visitor { name } => Author {
                user_id: None,
                user_name: None,
                visitor_name: name.clone(),
            },
        }
    }

    /// True when `author` is this actor. Anonymous visitors are never matched,
    /// since nothing tells two of them apart.
    pub fn wrote(&self, author: &Author) -> bool {
        match self {
            Self::Owner { user_id, .. } => author.user_id == Some(*user_id),
            Self::Visitor { name: Some(name) } => {
                author.user_id.is_none() && author.visitor_name.as_deref() == Some(name.as_str())
            }
            Self::Visitor { name: None } => false,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner { .. })
    }
}

/// Text attached to a markup (a pin's comment thread).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupComment {
    pub id: Uuid,
    pub markup_id: Uuid,
    pub text: String,
    #[serde(flatten)]
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

/// A single annotation placed on an attachment.
///
/// Markups are immutable once created; only `comments` grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Markup {
    pub id: Uuid,
    pub attachment_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MarkupType,
    #[serde(default)]
    pub canvas_data: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    pub color: String,
    pub stroke_width: u8,
    #[serde(flatten)]
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<MarkupComment>,
}

impl Markup {
    /// Text of the pin's first comment, if it has one.
    pub fn pin_text(&self) -> Option<&str> {
        self.comments.first().map(|c| c.text.as_str())
    }

    pub fn is_pin(&self) -> bool {
        self.kind == MarkupType::Comment && self.position.is_some()
    }
}

/// A free-standing remark on an attachment with no position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralComment {
    pub id: Uuid,
    pub attachment_id: Uuid,
    pub text: String,
    #[serde(flatten)]
    pub author: Author,
    pub created_at: DateTime<Utc>,
}
