use thiserror::Error;

/// Error surfaced by the backend collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backend error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct BackendError {
    pub status: Option<u16>,
    pub trace_id: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            trace_id: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(format!("{what} not found")).with_status(404)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Failure of a single dispatched command.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("unhandled command: {0}")]
    Unhandled(String),

    #[error("invalid payload for {command}: {message}")]
    InvalidPayload { command: String, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{command} rejected in state {state}")]
    InvalidState { command: String, state: String },

    #[error("{0} rejected: dashboard is read-only")]
    ReadOnly(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("command cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Short machine-readable code used in failure event payloads.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Unhandled(_) => "UNHANDLED_COMMAND",
            CommandError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            CommandError::Validation(_) => "VALIDATION_ERROR",
            CommandError::InvalidState { .. } => "INVALID_STATE",
            CommandError::ReadOnly(_) => "READ_ONLY",
            CommandError::Backend(_) => "BACKEND_ERROR",
            CommandError::Cancelled => "CANCELLED",
            CommandError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
