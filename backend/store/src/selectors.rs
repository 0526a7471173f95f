//! Memoized selectors over the live state.
//!
//! Each selector keys on the `Arc`s of the slices it reads, so repeated calls
//! between unrelated dispatches return pointer-equal results.

use std::sync::Arc;

use tessera_core::{DashboardAttributeFilter, DashboardDateFilter, ObjRef, Widget};

use crate::memo::MemoSelector;
use crate::slices::filter_context::{self, FilterContextState};
use crate::slices::insights::{self, InsightsState};
use crate::slices::layout::{self, LayoutState};
use crate::state::DashboardState;

#[derive(Debug)]
pub struct DashboardSelectors {
    widgets: MemoSelector<Arc<LayoutState>, Vec<Widget>>,
    date_filters: MemoSelector<Arc<FilterContextState>, Vec<DashboardDateFilter>>,
    attribute_filters: MemoSelector<Arc<FilterContextState>, Vec<DashboardAttributeFilter>>,
    missing_insights: MemoSelector<(Arc<LayoutState>, Arc<InsightsState>), Vec<ObjRef>>,
}

impl Default for DashboardSelectors {
    fn default() -> Self {
        Self {
            widgets: MemoSelector::new(|l: &Arc<LayoutState>| layout::widgets(l)),
            date_filters: MemoSelector::new(|f: &Arc<FilterContextState>| filter_context::date_filters(f)),
            attribute_filters: MemoSelector::new(|f: &Arc<FilterContextState>| {
                filter_context::attribute_filters(f)
            }),
            missing_insights: MemoSelector::new(|(l, i): &(Arc<LayoutState>, Arc<InsightsState>)| {
                insights::missing(i, &layout::insight_refs(l))
            }),
        }
    }
}

impl DashboardSelectors {
    pub fn widgets(&self, state: &DashboardState) -> Arc<Vec<Widget>> {
        self.widgets.select(Arc::clone(&state.layout))
    }

    pub fn date_filters(&self, state: &DashboardState) -> Arc<Vec<DashboardDateFilter>> {
        self.date_filters.select(Arc::clone(&state.filter_context))
    }

    pub fn attribute_filters(&self, state: &DashboardState) -> Arc<Vec<DashboardAttributeFilter>> {
        self.attribute_filters.select(Arc::clone(&state.filter_context))
    }

    /// Insights referenced by layout widgets that are not loaded.
    pub fn missing_insights(&self, state: &DashboardState) -> Arc<Vec<ObjRef>> {
        self.missing_insights
            .select((Arc::clone(&state.layout), Arc::clone(&state.insights)))
    }
}
