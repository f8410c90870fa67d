pub mod api;
pub mod models;

pub use models::{
    Actor, Attachment, Author, GeneralComment, Markup, MarkupComment, MarkupType, Point,
};
