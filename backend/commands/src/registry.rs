/// Handler registry keyed by command kind.
use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::{CommandKind, DashboardCommand};

use crate::dispatch::{DirectHandler, RoutineHandler};
use crate::handlers;

/// How routines of one kind are scheduled relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Spawned immediately; may interleave with anything.
    Concurrent,
    /// Commands targeting the same widget run in submission order.
    PerWidget,
    /// All commands sharing the name run in submission order.
    Named(&'static str),
}

impl QueuePolicy {
    /// Queue key for `command`, or `None` to run it concurrently.
    pub fn queue_key(&self, command: &DashboardCommand, serialize_widgets: bool) -> Option<String> {
        match self {
            QueuePolicy::Concurrent => None,
            QueuePolicy::PerWidget if serialize_widgets => {
                command.target_widget().map(|w| format!("widget:{w}"))
            }
            QueuePolicy::PerWidget => None,
            QueuePolicy::Named(name) => Some(format!("queue:{name}")),
        }
    }
}

#[derive(Clone)]
pub enum Handler {
    Direct(Arc<dyn DirectHandler>),
    Routine(Arc<dyn RoutineHandler>, QueuePolicy),
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<CommandKind, Handler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_direct(&mut self, kind: CommandKind, handler: impl DirectHandler + 'static) -> &mut Self {
        self.handlers.insert(kind, Handler::Direct(Arc::new(handler)));
        self
    }

    pub fn register_routine(
        &mut self,
        kind: CommandKind,
        policy: QueuePolicy,
        handler: impl RoutineHandler + 'static,
    ) -> &mut Self {
        self.handlers
            .insert(kind, Handler::Routine(Arc::new(handler), policy));
        self
    }

    pub fn unregister(&mut self, kind: CommandKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn get(&self, kind: CommandKind) -> Option<&Handler> {
        self.handlers.get(&kind)
    }

    pub fn is_registered(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registry with every built-in handler.
///
/// `RefreshInsightWidget` is deliberately left out: dispatching it always
/// yields an unhandled-command rejection.
pub fn default_registry() -> CommandRegistry {
    use handlers::{dashboard, filter_views, filters, layout, render, results, ui};
    use CommandKind as K;

    let mut registry = CommandRegistry::new();
    registry
        .register_routine(K::InitializeDashboard, QueuePolicy::Concurrent, dashboard::InitializeHandler)
        .register_routine(K::SaveDashboard, QueuePolicy::Named("save"), dashboard::SaveHandler)
        .register_direct(K::RenameDashboard, dashboard::RenameHandler)
        .register_direct(K::ResetDashboard, dashboard::ResetHandler)
        .register_routine(K::ReloadFilterViews, QueuePolicy::Concurrent, filter_views::ReloadFilterViewsHandler)
        .register_direct(K::SetDashboardDateFilterConfigMode, ui::SetDateFilterConfigModeHandler)
        .register_direct(K::SetScreenSize, ui::SetScreenSizeHandler)
        .register_direct(K::TriggerEvent, ui::TriggerEventHandler)
        .register_direct(K::ChangeDateFilterSelection, filters::ChangeDateFilterSelectionHandler)
        .register_direct(K::AddDateFilter, filters::AddDateFilterHandler)
        .register_direct(K::RemoveDateFilter, filters::RemoveDateFilterHandler)
        .register_direct(K::AddAttributeFilter, filters::AddAttributeFilterHandler)
        .register_direct(K::RemoveAttributeFilters, filters::RemoveAttributeFiltersHandler)
        .register_direct(K::MoveAttributeFilter, filters::MoveAttributeFilterHandler)
        .register_direct(K::ChangeAttributeFilterSelection, filters::ChangeAttributeSelectionHandler)
        .register_direct(K::ChangeFilterContextSelection, filters::ChangeFilterContextSelectionHandler)
        .register_direct(K::SetAttributeFilterParent, filters::SetAttributeFilterParentHandler)
        .register_routine(K::AddLayoutSection, QueuePolicy::Named("layout"), layout::AddSectionHandler)
        .register_routine(K::AddSectionItems, QueuePolicy::Named("layout"), layout::AddItemsHandler)
        .register_direct(K::MoveLayoutSection, layout::MoveSectionHandler)
        .register_routine(K::ReplaceSectionItem, QueuePolicy::Named("layout"), layout::ReplaceItemHandler)
        .register_direct(K::RemoveLayoutSection, layout::RemoveSectionHandler)
        .register_direct(K::ChangeLayoutSectionHeader, layout::ChangeSectionHeaderHandler)
        .register_direct(K::RemoveSectionItem, layout::RemoveItemHandler)
        .register_direct(K::MoveSectionItem, layout::MoveItemHandler)
        .register_direct(K::UndoLayoutChanges, layout::UndoHandler)
        .register_direct(K::ChangeWidgetHeader, layout::ChangeWidgetHeaderHandler)
        .register_direct(K::RequestAsyncRender, render::RequestAsyncRenderHandler)
        .register_direct(K::ResolveAsyncRender, render::ResolveAsyncRenderHandler)
        .register_routine(K::UpsertExecutionResult, QueuePolicy::PerWidget, results::UpsertExecutionResultHandler)
        .register_routine(K::AddDrillTargets, QueuePolicy::PerWidget, results::AddDrillTargetsHandler)
        .register_routine(K::UpsertPredictionResult, QueuePolicy::PerWidget, results::UpsertPredictionHandler)
        .register_routine(
            K::UpsertKeyDriverAnalysisResult,
            QueuePolicy::PerWidget,
            results::UpsertKeyDriverAnalysisHandler,
        );
    registry
}
