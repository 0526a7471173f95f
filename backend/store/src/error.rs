use thiserror::Error;

/// A reducer refused an action. The state is left untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: i32,
        len: usize,
    },

    #[error("filter already present: {0}")]
    DuplicateFilter(String),

    #[error("filter not found: {0}")]
    FilterNotFound(String),

    #[error("invalid parent filter: {0}")]
    InvalidParent(String),

    #[error("widget not found: {0}")]
    WidgetNotFound(String),

    #[error("stash not found: {0}")]
    StashNotFound(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("cannot {action} while {from}")]
    InvalidTransition { from: String, action: &'static str },
}
