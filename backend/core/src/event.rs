use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::DashboardContext;

/// Something that happened while processing a command.
///
/// `correlation_id` repeats the id of the originating command so callers can
/// match asynchronous outcomes to their requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub ctx: Arc<DashboardContext>,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DashboardEvent {
    pub fn new(
        kind: EventKind,
        ctx: Arc<DashboardContext>,
        correlation_id: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            correlation_id,
            ctx,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Event types with their stable wire names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[serde(rename = "GDC.DASH/EVT.COMMAND.STARTED")]
    CommandStarted,
    #[serde(rename = "GDC.DASH/EVT.COMMAND.REJECTED")]
    CommandRejected,
    #[serde(rename = "GDC.DASH/EVT.COMMAND.FAILED")]
    CommandFailed,
    #[serde(rename = "GDC.DASH/EVT.INTERNAL.ERROR")]
    InternalError,

    #[serde(rename = "GDC.DASH/EVT.INITIALIZED")]
    DashboardInitialized,
    #[serde(rename = "GDC.DASH/EVT.INITIALIZATION_FAILED")]
    DashboardInitializationFailed,
    #[serde(rename = "GDC.DASH/EVT.SAVED")]
    DashboardSaved,
    #[serde(rename = "GDC.DASH/EVT.RENAMED")]
    DashboardRenamed,
    #[serde(rename = "GDC.DASH/EVT.RESET")]
    DashboardWasReset,

    #[serde(rename = "GDC.DASH/EVT.DATE_FILTER_CONFIG.MODE_CHANGED")]
    DateFilterConfigModeChanged,
    #[serde(rename = "GDC.DASH/EVT.RENDER.SCREEN_SIZE_CHANGED")]
    ScreenSizeChanged,

    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.CHANGED")]
    FilterContextChanged,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.SELECTION_CHANGED")]
    DateFilterSelectionChanged,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.ADDED")]
    DateFilterAdded,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.REMOVED")]
    DateFilterRemoved,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADDED")]
    AttributeFilterAdded,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVED")]
    AttributeFiltersRemoved,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVED")]
    AttributeFilterMoved,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.SELECTION_CHANGED")]
    AttributeFilterSelectionChanged,
    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.PARENT_CHANGED")]
    AttributeFilterParentChanged,

    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED")]
    LayoutSectionAdded,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED")]
    LayoutSectionMoved,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_REMOVED")]
    LayoutSectionRemoved,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_HEADER_CHANGED")]
    LayoutSectionHeaderChanged,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEMS_ADDED")]
    LayoutSectionItemsAdded,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REMOVED")]
    LayoutSectionItemRemoved,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED")]
    LayoutSectionItemMoved,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REPLACED")]
    LayoutSectionItemReplaced,
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.LAYOUT_CHANGED")]
    LayoutChanged,
    #[serde(rename = "GDC.DASH/EVT.WIDGET.HEADER_CHANGED")]
    WidgetHeaderChanged,

    #[serde(rename = "GDC.DASH/EVT.RENDER.ASYNC.REQUESTED")]
    AsyncRenderRequested,
    #[serde(rename = "GDC.DASH/EVT.RENDER.ASYNC.RESOLVED")]
    AsyncRenderResolved,
    #[serde(rename = "GDC.DASH/EVT.RENDER.RESOLVED")]
    AllAsyncRendersResolved,

    #[serde(rename = "GDC.DASH/EVT.WIDGET.EXECUTION_RESULT_UPSERTED")]
    ExecutionResultUpserted,
    #[serde(rename = "GDC.DASH/EVT.DRILL_TARGETS.ADDED")]
    DrillTargetsAdded,
    #[serde(rename = "GDC.DASH/EVT.WIDGET.PREDICTION_RESULT_UPSERTED")]
    PredictionResultUpserted,
    #[serde(rename = "GDC.DASH/EVT.WIDGET.KDA_RESULT_UPSERTED")]
    KeyDriverAnalysisResultUpserted,

    #[serde(rename = "GDC.DASH/EVT.FILTER_VIEWS.RELOADED")]
    FilterViewsReloaded,
    #[serde(rename = "GDC.DASH/EVT.USER_INTERACTION.TRIGGERED")]
    CustomEvent,
}

impl EventKind {
    /// Events that report a failed or refused command.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EventKind::CommandRejected
                | EventKind::CommandFailed
                | EventKind::InternalError
                | EventKind::DashboardInitializationFailed
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_support::null_context;

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::CommandStarted.to_string(), "GDC.DASH/EVT.COMMAND.STARTED");
        assert_eq!(
            EventKind::ScreenSizeChanged.to_string(),
            "GDC.DASH/EVT.RENDER.SCREEN_SIZE_CHANGED"
        );
    }

    #[test]
    fn test_event_serializes_type_and_correlation() {
        let event = DashboardEvent::new(
            EventKind::DashboardRenamed,
            null_context(),
            Some("c-1".into()),
            serde_json::json!({"title": "Sales"}),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "GDC.DASH/EVT.RENAMED");
        assert_eq!(json["correlationId"], "c-1");
        assert_eq!(json["ctx"]["workspace"], "ws");
        assert_eq!(json["payload"]["title"], "Sales");
    }

    #[test]
    fn test_failure_kinds() {
        assert!(EventKind::CommandFailed.is_failure());
        assert!(!EventKind::DashboardSaved.is_failure());
    }
}
