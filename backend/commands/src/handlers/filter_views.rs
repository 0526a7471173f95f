use async_trait::async_trait;
use serde_json::json;
use tessera_core::{CommandError, DashboardCommand, EventKind};
use tessera_store::slices::filter_views::FilterViewsAction;
use tracing::{debug, warn};

use crate::dispatch::{rejected, CommandContext, RoutineHandler};

/// Reload saved filter views. Loads may overlap; only the newest one commits.
pub struct ReloadFilterViewsHandler;

#[async_trait]
impl RoutineHandler for ReloadFilterViewsHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        if !matches!(command, DashboardCommand::ReloadFilterViews {}) {
            return Err(ctx.mismatch(&command));
        }

        let generation = ctx
            .store
            .dispatch_and_select(FilterViewsAction::BeginLoad.into(), |s| s.filter_views.generation)
            .map_err(rejected)?;
        let dashboard_ref = ctx.store.select(|s| s.lifecycle.dashboard_ref.clone());

        let loaded = ctx
            .backend()
            .get_filter_views(ctx.workspace(), dashboard_ref.as_ref())
            .await;

        let is_current = |s: &tessera_store::DashboardState| s.filter_views.generation == generation;
        match loaded {
            Ok(views) => {
                let count = views.len();
                let committed = ctx
                    .store
                    .dispatch_if(is_current, FilterViewsAction::Loaded { generation, views }.into())
                    .map_err(rejected)?;
                if committed {
                    ctx.emit(EventKind::FilterViewsReloaded, json!({ "count": count }));
                } else {
                    debug!(generation, "newer filter views load in flight, result dropped");
                }
                Ok(())
            }
            Err(e) => {
                warn!(generation, error = %e, "filter views reload failed");
                ctx.store
                    .dispatch_if(is_current, FilterViewsAction::LoadFailed { generation }.into())
                    .map_err(rejected)?;
                Err(e.into())
            }
        }
    }
}
