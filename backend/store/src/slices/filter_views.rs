//! Saved filter views. Loads are generation-tagged: a result is committed only
//! if no newer load started after it.

use serde::Serialize;
use tessera_core::FilterView;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterViewsState {
    pub generation: u64,
    pub loading: bool,
    pub views: Vec<FilterView>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterViewsAction {
    BeginLoad,
    Loaded { generation: u64, views: Vec<FilterView> },
    LoadFailed { generation: u64 },
}

pub fn reduce(state: &mut FilterViewsState, action: FilterViewsAction) {
    match action {
        FilterViewsAction::BeginLoad => {
            state.generation += 1;
            state.loading = true;
        }
        FilterViewsAction::Loaded { generation, views } if generation == state.generation => {
            state.views = views;
            state.loading = false;
        }
        FilterViewsAction::LoadFailed { generation } if generation == state.generation => {
            state.views.clear();
            state.loading = false;
        }
        FilterViewsAction::Loaded { generation, .. } | FilterViewsAction::LoadFailed { generation } => {
            tracing::debug!(generation, current = state.generation, "dropping stale filter views load");
        }
    }
}
