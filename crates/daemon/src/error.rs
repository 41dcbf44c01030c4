use tabdeck_core::note::NoteError;
use tabdeck_core::{GroupKey, ItemKey};

/// A snapshot sub-source or the annotation store could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} unavailable: {1}")]
    Unavailable(&'static str, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The item control service rejected a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("no such item: {0}")]
    NoSuchItem(u64),

    #[error("no such window: {0}")]
    NoSuchContainer(u64),
}

impl ControlError {
    pub fn rejected(operation: &'static str, reason: impl ToString) -> Self {
        Self::Rejected {
            operation,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("item is already in {0}")]
    SameGroup(GroupKey),

    #[error("unknown group: {0}")]
    UnknownGroup(GroupKey),

    #[error("group {0} does not accept moved items")]
    NotMovable(GroupKey),

    #[error("item {item} is not in {group}")]
    NotInGroup { item: ItemKey, group: GroupKey },

    #[error("item {0} is not a local tab")]
    NotLocal(ItemKey),

    #[error("move failed: {0}")]
    Failed(#[from] ControlError),
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("item {0} is not displayed")]
    UnknownItem(ItemKey),

    #[error("item {0} is not a local tab")]
    NotLocal(ItemKey),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Store(#[from] SourceError),

    #[error(transparent)]
    Note(#[from] NoteError),
}
