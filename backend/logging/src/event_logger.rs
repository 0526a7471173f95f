//! Dashboard Event Logger
//!
//! Writes every emitted `DashboardEvent` to the `dashboard_events` tracing
//! target with its payload redacted. Failure events log at `warn`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tessera_core::{DashboardEvent, EventKind};
use tracing::{info, warn};

use crate::redact::redact_value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub workspace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl EventLogEntry {
    pub fn from_event(event: &DashboardEvent) -> Self {
        Self {
            workspace: event.ctx.workspace.clone(),
            dashboard: event.ctx.dashboard_ref.as_ref().map(tessera_core::serialize_obj_ref),
            kind: event.kind,
            correlation_id: event.correlation_id.clone(),
            timestamp: event.timestamp,
            payload: redact_value(&event.payload),
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a dashboard event. Usable directly as an emitter callback.
    pub fn log_event(event: &DashboardEvent) {
        let entry = EventLogEntry::from_event(event);
        let payload = entry.payload.to_string();
        let correlation_id = entry.correlation_id.as_deref().unwrap_or("-");

        if entry.kind.is_failure() {
            warn!(
                target: "dashboard_events",
                kind = %entry.kind,
                correlation_id,
                workspace = %entry.workspace,
                payload = %payload,
                "dashboard event"
            );
        } else {
            info!(
                target: "dashboard_events",
                kind = %entry.kind,
                correlation_id,
                workspace = %entry.workspace,
                payload = %payload,
                "dashboard event"
            );
        }
    }
}
