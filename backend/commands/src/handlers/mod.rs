/// Built-in command handlers.
///
/// Each handler is a unit struct implementing `DirectHandler` or
/// `RoutineHandler`; `registry::default_registry` wires them to their kinds.
use tessera_core::{CommandError, DashboardLayout, DashboardLayoutItem, ObjRef};
use tessera_store::slices::insights::{self, InsightsAction};
use tessera_store::StoreAction;
use tracing::debug;

use crate::dispatch::CommandContext;

pub mod dashboard;
pub mod filter_views;
pub mod filters;
pub mod layout;
pub mod render;
pub mod results;
pub mod ui;

/// Distinct insight refs used by `items`, in order.
pub(crate) fn item_insight_refs<'a>(items: impl IntoIterator<Item = &'a DashboardLayoutItem>) -> Vec<ObjRef> {
    let mut out: Vec<ObjRef> = Vec::new();
    for widget in items.into_iter().filter_map(|i| i.widget.as_ref()) {
        for r in widget.insight_refs() {
            if !out.contains(r) {
                out.push(r.clone());
            }
        }
    }
    out
}

pub(crate) fn layout_insight_refs(layout: &DashboardLayout) -> Vec<ObjRef> {
    item_insight_refs(layout.sections.iter().flat_map(|s| s.items.iter()))
}

/// Fetch insights referenced by `items` that the store does not hold yet.
/// An insight the backend cannot find makes the command invalid.
pub(crate) async fn ensure_insights(ctx: &CommandContext, items: &[DashboardLayoutItem]) -> Result<(), CommandError> {
    let wanted = item_insight_refs(items);
    let missing = ctx.store.select(|s| insights::missing(&s.insights, &wanted));
    if missing.is_empty() {
        return Ok(());
    }

    debug!(count = missing.len(), "loading insights for new layout items");
    let loaded = ctx.backend().get_insights(ctx.workspace(), &missing).await?;
    if let Some(absent) = missing
        .iter()
        .find(|r| !loaded.iter().any(|i| &i.insight_ref == *r))
    {
        return Err(CommandError::Validation(format!("insight {absent} does not exist")));
    }
    ctx.dispatch(StoreAction::Insights(InsightsAction::Upsert(loaded)))
}
