//! The composed state tree and the root reducer.

use std::sync::Arc;

use serde::Serialize;
use tessera_config::{DashboardConfig, DateFilterConfigMode};
use tessera_core::{
    Alert, BackendCapabilities, DrillTargets, Entitlements, ExecutionResult, Permissions,
};

use crate::error::StoreError;
use crate::slices::analytics::{self, AnalyticsAction, AnalyticsState};
use crate::slices::cache::{self, CacheAction, CachedValue};
use crate::slices::filter_context::{self, FilterContextAction, FilterContextState};
use crate::slices::filter_views::{self, FilterViewsAction, FilterViewsState};
use crate::slices::insights::{self, InsightsAction, InsightsState};
use crate::slices::keyed::{self, KeyedAction, KeyedSlice};
use crate::slices::layout::{self, LayoutAction, LayoutState};
use crate::slices::lifecycle::{self, LifecycleAction, LifecycleState};
use crate::slices::render::{self, RenderAction, RenderState};
use crate::slices::ui::{self, UiAction, UiState};

/// Every slice sits behind its own `Arc`. Reducers go through
/// `Arc::make_mut`, so a slice no action touched keeps its pointer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub lifecycle: Arc<LifecycleState>,
    pub config: Arc<DashboardConfig>,
    pub filter_context: Arc<FilterContextState>,
    pub layout: Arc<LayoutState>,
    pub insights: Arc<InsightsState>,
    pub alerts: Arc<CachedValue<Vec<Alert>>>,
    pub filter_views: Arc<FilterViewsState>,
    pub entitlements: Arc<CachedValue<Entitlements>>,
    pub permissions: Arc<CachedValue<Permissions>>,
    pub capabilities: Arc<CachedValue<BackendCapabilities>>,
    pub drill_targets: Arc<KeyedSlice<DrillTargets>>,
    pub execution_results: Arc<KeyedSlice<ExecutionResult>>,
    pub analytics: Arc<AnalyticsState>,
    pub render: Arc<RenderState>,
    pub ui: Arc<UiState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    Lifecycle(LifecycleAction),
    SetConfig(DashboardConfig),
    FilterContext(FilterContextAction),
    Layout(LayoutAction),
    Insights(InsightsAction),
    Alerts(CacheAction<Vec<Alert>>),
    FilterViews(FilterViewsAction),
    Entitlements(CacheAction<Entitlements>),
    Permissions(CacheAction<Permissions>),
    Capabilities(CacheAction<BackendCapabilities>),
    DrillTargets(KeyedAction<DrillTargets>),
    ExecutionResults(KeyedAction<ExecutionResult>),
    Analytics(AnalyticsAction),
    Render(RenderAction),
    Ui(UiAction),
    /// Applied all-or-nothing.
    Batch(Vec<StoreAction>),
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::Lifecycle(a) => a.name(),
            StoreAction::SetConfig(_) => "config/set",
            StoreAction::FilterContext(a) => a.name(),
            StoreAction::Layout(a) => a.name(),
            StoreAction::Insights(_) => "insights",
            StoreAction::Alerts(_) => "alerts",
            StoreAction::FilterViews(_) => "filterViews",
            StoreAction::Entitlements(_) => "entitlements",
            StoreAction::Permissions(_) => "permissions",
            StoreAction::Capabilities(_) => "backendCapabilities",
            StoreAction::DrillTargets(_) => "drillTargets",
            StoreAction::ExecutionResults(_) => "executionResults",
            StoreAction::Analytics(_) => "analytics",
            StoreAction::Render(_) => "render",
            StoreAction::Ui(_) => "ui",
            StoreAction::Batch(_) => "batch",
        }
    }
}

impl From<LifecycleAction> for StoreAction {
    fn from(a: LifecycleAction) -> Self {
        StoreAction::Lifecycle(a)
    }
}

impl From<FilterContextAction> for StoreAction {
    fn from(a: FilterContextAction) -> Self {
        StoreAction::FilterContext(a)
    }
}

impl From<LayoutAction> for StoreAction {
    fn from(a: LayoutAction) -> Self {
        StoreAction::Layout(a)
    }
}

impl From<RenderAction> for StoreAction {
    fn from(a: RenderAction) -> Self {
        StoreAction::Render(a)
    }
}

impl From<AnalyticsAction> for StoreAction {
    fn from(a: AnalyticsAction) -> Self {
        StoreAction::Analytics(a)
    }
}

impl From<UiAction> for StoreAction {
    fn from(a: UiAction) -> Self {
        StoreAction::Ui(a)
    }
}

impl From<FilterViewsAction> for StoreAction {
    fn from(a: FilterViewsAction) -> Self {
        StoreAction::FilterViews(a)
    }
}

/// Route an action to exactly one slice. On error `state` may be partially
/// updated; callers apply to a scratch copy.
pub fn reduce(state: &mut DashboardState, action: StoreAction) -> Result<(), StoreError> {
    match action {
        StoreAction::Lifecycle(a) => lifecycle::reduce(Arc::make_mut(&mut state.lifecycle), a)?,
        StoreAction::SetConfig(config) => state.config = Arc::new(config),
        StoreAction::FilterContext(a) => filter_context::reduce(Arc::make_mut(&mut state.filter_context), a)?,
        StoreAction::Layout(a) => layout::reduce(Arc::make_mut(&mut state.layout), a)?,
        StoreAction::Insights(a) => insights::reduce(Arc::make_mut(&mut state.insights), a),
        StoreAction::Alerts(a) => cache::reduce(Arc::make_mut(&mut state.alerts), a),
        StoreAction::FilterViews(a) => filter_views::reduce(Arc::make_mut(&mut state.filter_views), a),
        StoreAction::Entitlements(a) => cache::reduce(Arc::make_mut(&mut state.entitlements), a),
        StoreAction::Permissions(a) => cache::reduce(Arc::make_mut(&mut state.permissions), a),
        StoreAction::Capabilities(a) => cache::reduce(Arc::make_mut(&mut state.capabilities), a),
        StoreAction::DrillTargets(a) => keyed::reduce(Arc::make_mut(&mut state.drill_targets), a),
        StoreAction::ExecutionResults(a) => keyed::reduce(Arc::make_mut(&mut state.execution_results), a),
        StoreAction::Analytics(a) => analytics::reduce(Arc::make_mut(&mut state.analytics), a),
        StoreAction::Render(a) => render::reduce(Arc::make_mut(&mut state.render), a),
        StoreAction::Ui(a) => ui::reduce(Arc::make_mut(&mut state.ui), a),
        StoreAction::Batch(actions) => {
            for a in actions {
                reduce(state, a)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cross-slice selectors
// ---------------------------------------------------------------------------

impl DashboardState {
    pub fn is_read_only(&self) -> bool {
        self.config.read_only()
    }

    /// Session override first, then configuration, then `active`.
    pub fn date_filter_config_mode(&self) -> DateFilterConfigMode {
        self.ui
            .date_filter_config_mode
            .or_else(|| self.config.date_filter_config.as_ref().and_then(|c| c.mode))
            .unwrap_or_default()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities.get().copied().unwrap_or_default()
    }

    pub fn alerts(&self) -> &[Alert] {
        self.alerts.get().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slices::render::RenderAction;

    #[test]
    fn test_untouched_slices_keep_identity() {
        let before = DashboardState::default();
        let mut after = before.clone();
        reduce(&mut after, RenderAction::Request("a".into()).into()).unwrap();

        assert!(!Arc::ptr_eq(&before.render, &after.render));
        assert!(Arc::ptr_eq(&before.layout, &after.layout));
        assert!(Arc::ptr_eq(&before.filter_context, &after.filter_context));
    }

    #[test]
    fn test_date_filter_mode_precedence() {
        let mut state = DashboardState::default();
        assert_eq!(state.date_filter_config_mode(), DateFilterConfigMode::Active);
        reduce(
            &mut state,
            StoreAction::SetConfig(DashboardConfig {
                date_filter_config: Some(tessera_config::DateFilterConfig {
                    mode: Some(DateFilterConfigMode::Readonly),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        )
        .unwrap();
        assert_eq!(state.date_filter_config_mode(), DateFilterConfigMode::Readonly);
        reduce(&mut state, UiAction::SetDateFilterConfigMode(DateFilterConfigMode::Hidden).into()).unwrap();
        assert_eq!(state.date_filter_config_mode(), DateFilterConfigMode::Hidden);
    }

    #[test]
    fn test_alerts_default_to_empty() {
        let state = DashboardState::default();
        assert!(state.alerts().is_empty());
    }
}
