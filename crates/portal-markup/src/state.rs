use std::sync::Arc;

use parking_lot::RwLock;
use portal_types::{GeneralComment, Markup};
use uuid::Uuid;

use crate::geometry::Path;

/// A general comment shown before the server has confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticComment {
    /// Carries a temporary id until the next sync supersedes it.
    pub comment: GeneralComment,
    /// Server id once the create call succeeded.
    pub confirmed_id: Option<Uuid>,
}

/// Everything the review surface shows for one attachment.
///
/// Lists are only ever replaced wholesale, never mutated in place, so readers
/// can compare `Arc` pointers to see whether anything changed.
#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    pub markups: Arc<Vec<Markup>>,
    pub general_comments: Arc<Vec<GeneralComment>>,
    pub optimistic: Arc<Vec<OptimisticComment>>,
    /// Strokes committed locally and not (yet) confirmed. Failed strokes stay
    /// here until the viewer is reopened.
    pub pending_paths: Arc<Vec<Path>>,
    /// Text in the general comment box.
    pub composer: String,
    pub submitting_comment: bool,
    pub saving_pin: bool,
    /// Spinner for the initial load.
    pub loading: bool,
}

pub type SharedState = Arc<RwLock<ReviewState>>;

/// Copy of `items` with `item` appended.
pub(crate) fn appended<T: Clone>(items: &[T], item: T) -> Arc<Vec<T>> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(items);
    next.push(item);
    Arc::new(next)
}

/// Copy of `items` without the entries matching `pred`.
pub(crate) fn without<T: Clone>(items: &[T], pred: impl Fn(&T) -> bool) -> Arc<Vec<T>> {
    Arc::new(items.iter().filter(|item| !pred(item)).cloned().collect())
}
