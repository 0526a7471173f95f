//! Commands accepted by the dashboard command bus.
//!
//! Commands travel as `{ "type", "correlationId"?, "payload" }`. The Rust side
//! is a closed enum so handler coverage is checked by `match`; `CommandKind`
//! is its fieldless discriminant and the registry key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_config::{DashboardConfig, DateFilterConfigMode};

use crate::error::CommandError;
use crate::refs::{serialize_obj_ref, ObjRef};
use crate::types::{
    AttributeElements, AttributeFilterParent, DashboardLayoutItem, DateBound, DateFilterGranularity, DateFilterType,
    DrillTargets, ExecutionResult, KeyDriverAnalysisResult, PredictionResult, ScreenSize,
    SectionHeader, SelectionMode,
};

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// New selection for a date filter. No bounds means "all time".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilterSelection {
    #[serde(rename = "type")]
    pub filter_type: DateFilterType,
    pub granularity: DateFilterGranularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateBound>,
}

impl DateFilterSelection {
    pub fn all_time() -> Self {
        Self {
            filter_type: DateFilterType::Relative,
            granularity: DateFilterGranularity::Date,
            from: None,
            to: None,
        }
    }

    pub fn is_all_time(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeSelectionType {
    #[default]
    In,
    NotIn,
}

/// One entry of a bulk filter change. Attribute filters are matched by
/// display form; date filters by data set, none meaning the common one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterSelection {
    AttributeFilter {
        display_form: ObjRef,
        elements: AttributeElements,
        #[serde(default)]
        selection_type: AttributeSelectionType,
    },
    DateFilter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_set: Option<ObjRef>,
        selection: DateFilterSelection,
    },
}

/// An item to place into a section: either a full item or the id of a stash
/// holding items removed earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemDefinition {
    Item(DashboardLayoutItem),
    Stashed(String),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum DashboardCommand {
    #[serde(rename = "GDC.DASH/CMD.INITIALIZE")]
    InitializeDashboard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dashboard_ref: Option<ObjRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<DashboardConfig>,
    },
    #[serde(rename = "GDC.DASH/CMD.SAVE")]
    SaveDashboard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    #[serde(rename = "GDC.DASH/CMD.RENAME")]
    RenameDashboard { title: String },
    #[serde(rename = "GDC.DASH/CMD.RESET")]
    ResetDashboard {},

    #[serde(rename = "GDC.DASH/CMD.DATE_FILTER_CONFIG.SET_MODE")]
    SetDashboardDateFilterConfigMode { mode: DateFilterConfigMode },
    #[serde(rename = "GDC.DASH/CMD.SET_SCREEN_SIZE")]
    SetScreenSize { screen_size: ScreenSize },

    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.CHANGE_SELECTION")]
    ChangeFilterContextSelection {
        filters: Vec<FilterSelection>,
        /// Attribute filters not mentioned go back to "all", date filters to all time.
        #[serde(default)]
        reset_others: bool,
    },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.CHANGE_SELECTION")]
    ChangeDateFilterSelection {
        /// Absent targets the common date filter.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_set: Option<ObjRef>,
        selection: DateFilterSelection,
    },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.ADD")]
    AddDateFilter {
        data_set: ObjRef,
        #[serde(default = "append_index")]
        index: i32,
    },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.REMOVE")]
    RemoveDateFilter { data_set: ObjRef },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD")]
    AddAttributeFilter {
        display_form: ObjRef,
        #[serde(default = "append_index")]
        index: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_selection: Option<AttributeElements>,
        #[serde(default)]
        initial_is_negative_selection: bool,
        #[serde(default)]
        selection_mode: SelectionMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVE")]
    RemoveAttributeFilters { filter_local_ids: Vec<String> },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVE")]
    MoveAttributeFilter { filter_local_id: String, index: i32 },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.CHANGE_SELECTION")]
    ChangeAttributeFilterSelection {
        filter_local_id: String,
        elements: AttributeElements,
        #[serde(default)]
        selection_type: AttributeSelectionType,
    },
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.SET_PARENT")]
    SetAttributeFilterParent {
        filter_local_id: String,
        parent_filters: Vec<AttributeFilterParent>,
    },

    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_SECTION")]
    AddLayoutSection {
        #[serde(default = "append_index")]
        index: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_header: Option<SectionHeader>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_items: Vec<ItemDefinition>,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_SECTION")]
    MoveLayoutSection { section_index: usize, to_index: i32 },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_SECTION")]
    RemoveLayoutSection {
        index: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.CHANGE_SECTION_HEADER")]
    ChangeLayoutSectionHeader {
        index: usize,
        header: SectionHeader,
        /// Keep old header fields the new header leaves out.
        #[serde(default)]
        merge: bool,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS")]
    AddSectionItems {
        section_index: usize,
        #[serde(default = "append_index")]
        item_index: i32,
        items: Vec<ItemDefinition>,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_ITEM")]
    RemoveSectionItem {
        section_index: usize,
        item_index: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
        /// Also drop the section when it ends up empty.
        #[serde(default)]
        eager: bool,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM")]
    MoveSectionItem {
        section_index: usize,
        item_index: i32,
        to_section_index: usize,
        #[serde(default = "append_index")]
        to_item_index: i32,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REPLACE_ITEM")]
    ReplaceSectionItem {
        section_index: usize,
        item_index: i32,
        item: ItemDefinition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
    },
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.UNDO")]
    UndoLayoutChanges {},
    #[serde(rename = "GDC.DASH/CMD.WIDGET.CHANGE_HEADER")]
    ChangeWidgetHeader { widget_ref: ObjRef, title: String },

    #[serde(rename = "GDC.DASH/CMD.RENDER.ASYNC.REQUEST")]
    RequestAsyncRender { id: String },
    #[serde(rename = "GDC.DASH/CMD.RENDER.ASYNC.RESOLVE")]
    ResolveAsyncRender { id: String },

    #[serde(rename = "GDC.DASH/CMD.EXECUTION_RESULT.UPSERT")]
    UpsertExecutionResult { result: ExecutionResult },
    #[serde(rename = "GDC.DASH/CMD.DRILL_TARGETS.ADD")]
    AddDrillTargets { targets: DrillTargets },
    #[serde(rename = "GDC.DASH/CMD.WIDGET.PREDICTION_RESULT.UPSERT")]
    UpsertPredictionResult { result: PredictionResult },
    #[serde(rename = "GDC.DASH/CMD.WIDGET.KDA_RESULT.UPSERT")]
    UpsertKeyDriverAnalysisResult { result: KeyDriverAnalysisResult },

    #[serde(rename = "GDC.DASH/CMD.FILTER_VIEWS.RELOAD")]
    ReloadFilterViews {},
    #[serde(rename = "GDC.DASH/CMD.EVENT.TRIGGER")]
    TriggerEvent {
        name: String,
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "GDC.DASH/CMD.INSIGHT_WIDGET.REFRESH")]
    RefreshInsightWidget { widget_ref: ObjRef },
}

fn append_index() -> i32 {
    -1
}

/// Fieldless discriminant of [`DashboardCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    #[serde(rename = "GDC.DASH/CMD.INITIALIZE")]
    InitializeDashboard,
    #[serde(rename = "GDC.DASH/CMD.SAVE")]
    SaveDashboard,
    #[serde(rename = "GDC.DASH/CMD.RENAME")]
    RenameDashboard,
    #[serde(rename = "GDC.DASH/CMD.RESET")]
    ResetDashboard,
    #[serde(rename = "GDC.DASH/CMD.DATE_FILTER_CONFIG.SET_MODE")]
    SetDashboardDateFilterConfigMode,
    #[serde(rename = "GDC.DASH/CMD.SET_SCREEN_SIZE")]
    SetScreenSize,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.CHANGE_SELECTION")]
    ChangeFilterContextSelection,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.CHANGE_SELECTION")]
    ChangeDateFilterSelection,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.ADD")]
    AddDateFilter,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.REMOVE")]
    RemoveDateFilter,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD")]
    AddAttributeFilter,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVE")]
    RemoveAttributeFilters,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVE")]
    MoveAttributeFilter,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.CHANGE_SELECTION")]
    ChangeAttributeFilterSelection,
    #[serde(rename = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.SET_PARENT")]
    SetAttributeFilterParent,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_SECTION")]
    AddLayoutSection,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_SECTION")]
    MoveLayoutSection,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_SECTION")]
    RemoveLayoutSection,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.CHANGE_SECTION_HEADER")]
    ChangeLayoutSectionHeader,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS")]
    AddSectionItems,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_ITEM")]
    RemoveSectionItem,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM")]
    MoveSectionItem,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.REPLACE_ITEM")]
    ReplaceSectionItem,
    #[serde(rename = "GDC.DASH/CMD.FLUID_LAYOUT.UNDO")]
    UndoLayoutChanges,
    #[serde(rename = "GDC.DASH/CMD.WIDGET.CHANGE_HEADER")]
    ChangeWidgetHeader,
    #[serde(rename = "GDC.DASH/CMD.RENDER.ASYNC.REQUEST")]
    RequestAsyncRender,
    #[serde(rename = "GDC.DASH/CMD.RENDER.ASYNC.RESOLVE")]
    ResolveAsyncRender,
    #[serde(rename = "GDC.DASH/CMD.EXECUTION_RESULT.UPSERT")]
    UpsertExecutionResult,
    #[serde(rename = "GDC.DASH/CMD.DRILL_TARGETS.ADD")]
    AddDrillTargets,
    #[serde(rename = "GDC.DASH/CMD.WIDGET.PREDICTION_RESULT.UPSERT")]
    UpsertPredictionResult,
    #[serde(rename = "GDC.DASH/CMD.WIDGET.KDA_RESULT.UPSERT")]
    UpsertKeyDriverAnalysisResult,
    #[serde(rename = "GDC.DASH/CMD.FILTER_VIEWS.RELOAD")]
    ReloadFilterViews,
    #[serde(rename = "GDC.DASH/CMD.EVENT.TRIGGER")]
    TriggerEvent,
    #[serde(rename = "GDC.DASH/CMD.INSIGHT_WIDGET.REFRESH")]
    RefreshInsightWidget,
}

impl CommandKind {
    pub fn from_wire(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }

    /// Commands that change the persisted dashboard document.
    pub fn edits_document(&self) -> bool {
        matches!(
            self,
            CommandKind::SaveDashboard
                | CommandKind::RenameDashboard
                | CommandKind::AddLayoutSection
                | CommandKind::MoveLayoutSection
                | CommandKind::RemoveLayoutSection
                | CommandKind::ChangeLayoutSectionHeader
                | CommandKind::AddSectionItems
                | CommandKind::RemoveSectionItem
                | CommandKind::MoveSectionItem
                | CommandKind::ReplaceSectionItem
                | CommandKind::UndoLayoutChanges
                | CommandKind::ChangeWidgetHeader
        )
    }
}

impl CommandKind {
    /// Commands that only make sense once the dashboard is loaded. The rest
    /// (initialization, screen size, date filter mode, render barrier, custom
    /// events) are accepted in any non-error state.
    pub fn requires_ready(&self) -> bool {
        !matches!(
            self,
            CommandKind::InitializeDashboard
                | CommandKind::SetScreenSize
                | CommandKind::SetDashboardDateFilterConfigMode
                | CommandKind::RequestAsyncRender
                | CommandKind::ResolveAsyncRender
                | CommandKind::TriggerEvent
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

impl DashboardCommand {
    pub fn kind(&self) -> CommandKind {
        use DashboardCommand as C;
        match self {
            C::InitializeDashboard { .. } => CommandKind::InitializeDashboard,
            C::SaveDashboard { .. } => CommandKind::SaveDashboard,
            C::RenameDashboard { .. } => CommandKind::RenameDashboard,
            C::ResetDashboard {} => CommandKind::ResetDashboard,
            C::SetDashboardDateFilterConfigMode { .. } => CommandKind::SetDashboardDateFilterConfigMode,
            C::SetScreenSize { .. } => CommandKind::SetScreenSize,
            C::ChangeFilterContextSelection { .. } => CommandKind::ChangeFilterContextSelection,
            C::ChangeDateFilterSelection { .. } => CommandKind::ChangeDateFilterSelection,
            C::AddDateFilter { .. } => CommandKind::AddDateFilter,
            C::RemoveDateFilter { .. } => CommandKind::RemoveDateFilter,
            C::AddAttributeFilter { .. } => CommandKind::AddAttributeFilter,
            C::RemoveAttributeFilters { .. } => CommandKind::RemoveAttributeFilters,
            C::MoveAttributeFilter { .. } => CommandKind::MoveAttributeFilter,
            C::ChangeAttributeFilterSelection { .. } => CommandKind::ChangeAttributeFilterSelection,
            C::SetAttributeFilterParent { .. } => CommandKind::SetAttributeFilterParent,
            C::AddLayoutSection { .. } => CommandKind::AddLayoutSection,
            C::MoveLayoutSection { .. } => CommandKind::MoveLayoutSection,
            C::RemoveLayoutSection { .. } => CommandKind::RemoveLayoutSection,
            C::ChangeLayoutSectionHeader { .. } => CommandKind::ChangeLayoutSectionHeader,
            C::AddSectionItems { .. } => CommandKind::AddSectionItems,
            C::RemoveSectionItem { .. } => CommandKind::RemoveSectionItem,
            C::MoveSectionItem { .. } => CommandKind::MoveSectionItem,
            C::ReplaceSectionItem { .. } => CommandKind::ReplaceSectionItem,
            C::UndoLayoutChanges {} => CommandKind::UndoLayoutChanges,
            C::ChangeWidgetHeader { .. } => CommandKind::ChangeWidgetHeader,
            C::RequestAsyncRender { .. } => CommandKind::RequestAsyncRender,
            C::ResolveAsyncRender { .. } => CommandKind::ResolveAsyncRender,
            C::UpsertExecutionResult { .. } => CommandKind::UpsertExecutionResult,
            C::AddDrillTargets { .. } => CommandKind::AddDrillTargets,
            C::UpsertPredictionResult { .. } => CommandKind::UpsertPredictionResult,
            C::UpsertKeyDriverAnalysisResult { .. } => CommandKind::UpsertKeyDriverAnalysisResult,
            C::ReloadFilterViews {} => CommandKind::ReloadFilterViews,
            C::TriggerEvent { .. } => CommandKind::TriggerEvent,
            C::RefreshInsightWidget { .. } => CommandKind::RefreshInsightWidget,
        }
    }

    /// Serialized ref of the widget this command targets, if any.
    pub fn target_widget(&self) -> Option<String> {
        use DashboardCommand as C;
        let widget = match self {
            C::ChangeWidgetHeader { widget_ref, .. } | C::RefreshInsightWidget { widget_ref } => widget_ref,
            C::UpsertExecutionResult { result } => &result.widget_ref,
            C::AddDrillTargets { targets } => &targets.widget_ref,
            C::UpsertPredictionResult { result } => &result.widget_ref,
            C::UpsertKeyDriverAnalysisResult { result } => &result.widget_ref,
            _ => return None,
        };
        Some(serialize_obj_ref(widget))
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A command together with the caller's correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    pub correlation_id: Option<String>,
    pub command: DashboardCommand,
}

impl CommandEnvelope {
    pub fn new(command: DashboardCommand) -> Self {
        Self {
            correlation_id: None,
            command,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.command.kind()
    }

    /// Decode `{ type, correlationId?, payload? }`.
    ///
    /// An unknown `type` yields [`CommandError::Unhandled`]; a known type with a
    /// malformed payload yields [`CommandError::InvalidPayload`].
    pub fn from_json(value: &Value) -> Result<Self, CommandError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::InvalidPayload {
                command: "<unknown>".into(),
                message: "missing string field 'type'".into(),
            })?;
        if CommandKind::from_wire(type_name).is_none() {
            return Err(CommandError::Unhandled(type_name.to_string()));
        }
        let correlation_id = value
            .get("correlationId")
            .and_then(Value::as_str)
            .map(String::from);
        let payload = value
            .get("payload")
            .cloned()
            .filter(|p| !p.is_null())
            .unwrap_or_else(|| Value::Object(Default::default()));

        let command = serde_json::from_value(serde_json::json!({
            "type": type_name,
            "payload": payload,
        }))
        .map_err(|e| CommandError::InvalidPayload {
            command: type_name.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            correlation_id,
            command,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(&self.command).unwrap_or(Value::Null);
        if let (Some(id), Some(obj)) = (&self.correlation_id, value.as_object_mut()) {
            obj.insert("correlationId".into(), Value::String(id.clone()));
        }
        value
    }
}
