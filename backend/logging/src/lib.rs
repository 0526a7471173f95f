//! Telemetry and structured logging for Tessera.
//!
//! Handles log redaction, JSON output with daily file rotation, and
//! dashboard event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger};
pub use logger::{init_logger, LoggerOptions};
pub use redact::{redact_sensitive_data, redact_value};
