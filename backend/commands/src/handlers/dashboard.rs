//! Dashboard-level commands: initialize, save, rename, reset.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tessera_core::{
    BackendError, CommandError, DashboardCommand, DashboardDocument, EventKind, FilterContextItem,
};
use tessera_store::slices::cache::CacheAction;
use tessera_store::slices::filter_context::FilterContextAction;
use tessera_store::slices::filter_views::FilterViewsAction;
use tessera_store::slices::insights::InsightsAction;
use tessera_store::slices::keyed::KeyedAction;
use tessera_store::slices::layout::LayoutAction;
use tessera_store::slices::lifecycle::{IntegrationCounts, LifecycleAction, LifecycleStatus};
use tessera_store::slices::render::RenderAction;
use tessera_store::{DashboardStore, StoreAction};
use tracing::{debug, info, warn};

use crate::dispatch::{rejected, CommandContext, DirectHandler, RoutineHandler};
use crate::handlers::layout_insight_refs;

// ---------------------------------------------------------------------------
// InitializeDashboard
// ---------------------------------------------------------------------------

pub struct InitializeHandler;

/// Run an optional load. Disabled loads and failures both yield the empty
/// value; failures are logged.
async fn soft_load<T, F, Fut>(what: &'static str, enabled: bool, load: F) -> T
where
    T: Default,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    if !enabled {
        debug!(what, "skipping disabled load");
        return T::default();
    }
    match load().await {
        Ok(value) => value,
        Err(e) => {
            warn!(what, error = %e, trace_id = ?e.trace_id, "optional load failed, using empty value");
            T::default()
        }
    }
}

#[async_trait]
impl RoutineHandler for InitializeHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (requested_ref, overrides) = match command {
            DashboardCommand::InitializeDashboard {
                dashboard_ref,
                config,
            } => (dashboard_ref, config),
            other => return Err(ctx.mismatch(&other)),
        };

        // units requested from here on belong to the dashboard being loaded
        let begin = StoreAction::Batch(vec![LifecycleAction::BeginInitialize.into(), RenderAction::Reset.into()]);
        let generation = ctx
            .store
            .dispatch_and_select(begin, |s| s.lifecycle.generation)
            .map_err(rejected)?;
        let views_generation = ctx
            .store
            .dispatch_and_select(FilterViewsAction::BeginLoad.into(), |s| s.filter_views.generation)
            .map_err(rejected)?;

        let dashboard_ref = requested_ref.or_else(|| ctx.dashboard.dashboard_ref.clone());
        let config = match &overrides {
            Some(o) => ctx.dashboard.config.merged_with(o),
            None => ctx.dashboard.config.clone(),
        };
        let flags = config.flags();
        let backend = ctx.backend();
        let caps = backend.capabilities();
        let ws = ctx.workspace();

        info!(
            workspace = %ws,
            dashboard = ?dashboard_ref.as_ref().map(ToString::to_string),
            generation,
            "initializing dashboard"
        );

        let mandatory = async {
            let (entitlements, permissions, document) = tokio::try_join!(
                backend.get_entitlements(),
                backend.get_permissions(ws),
                async {
                    match &dashboard_ref {
                        Some(r) => backend.get_dashboard(ws, r).await.map(Some),
                        None => Ok(None),
                    }
                },
            )?;
            let refs = document
                .as_ref()
                .map(|d| layout_insight_refs(&d.layout))
                .unwrap_or_default();
            let insights = if refs.is_empty() {
                Vec::new()
            } else {
                backend.get_insights(ws, &refs).await?
            };
            Ok::<_, BackendError>((entitlements, permissions, document, insights))
        };

        let optional = async {
            tokio::join!(
                soft_load("accessible dashboards", true, || backend.list_accessible_dashboards(ws)),
                soft_load("alerts", caps.supports_kpi_widget && flags.alerting(), || {
                    backend.get_alerts(ws, dashboard_ref.as_ref())
                }),
                soft_load(
                    "filter views",
                    caps.supports_filter_views && flags.filter_views(),
                    || backend.get_filter_views(ws, dashboard_ref.as_ref())
                ),
                soft_load(
                    "date hierarchy templates",
                    caps.supports_attribute_hierarchies && flags.date_hierarchies(),
                    || backend.get_date_hierarchy_templates(ws)
                ),
                soft_load(
                    "notification channels",
                    caps.supports_notification_channels && flags.notification_channels(),
                    || backend.count_notification_channels()
                ),
                soft_load(
                    "webhooks",
                    caps.supports_notification_channels && flags.webhooks(),
                    || backend.count_webhooks()
                ),
                soft_load(
                    "automations",
                    caps.supports_automations && flags.automations(),
                    || backend.count_automations(ws)
                ),
            )
        };

        let (loaded, (accessible, alerts, views, templates, channels, webhooks, automations)) =
            tokio::join!(mandatory, optional);

        let (entitlements, permissions, document, insights) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(generation, error = %e, trace_id = ?e.trace_id, "dashboard initialization failed");
                let failed = LifecycleAction::InitializationFailed {
                    generation,
                    message: e.to_string(),
                };
                let applied = ctx
                    .store
                    .dispatch_if(|s| s.lifecycle.generation == generation, failed.into())
                    .map_err(rejected)?;
                if applied {
                    ctx.emit(
                        EventKind::DashboardInitializationFailed,
                        json!({ "message": e.message, "status": e.status, "traceId": e.trace_id }),
                    );
                }
                return Err(CommandError::Backend(e));
            }
        };

        let document = document.unwrap_or_else(|| DashboardDocument {
            dashboard_ref: None,
            title: String::new(),
            description: None,
            layout: Default::default(),
            filter_context: Vec::<FilterContextItem>::new(),
            updated: None,
        });
        let insight_count = insights.len();

        let commit = StoreAction::Batch(vec![
            StoreAction::SetConfig(config),
            StoreAction::Capabilities(CacheAction::Set(caps)),
            StoreAction::Entitlements(CacheAction::Set(entitlements)),
            StoreAction::Permissions(CacheAction::Set(permissions)),
            StoreAction::Alerts(CacheAction::Set(alerts)),
            FilterViewsAction::Loaded {
                generation: views_generation,
                views,
            }
            .into(),
            StoreAction::Insights(InsightsAction::Clear),
            StoreAction::Insights(InsightsAction::Upsert(insights)),
            FilterContextAction::SetFilters(document.filter_context.clone()).into(),
            LayoutAction::SetLayout(document.layout.clone()).into(),
            StoreAction::DrillTargets(KeyedAction::Clear),
            StoreAction::ExecutionResults(KeyedAction::Clear),
            LifecycleAction::Initialized {
                generation,
                dashboard_ref: document.dashboard_ref.clone().or(dashboard_ref.clone()),
                title: document.title.clone(),
                description: document.description.clone(),
                accessible_dashboards: accessible,
                date_hierarchy_templates: templates,
                counts: IntegrationCounts {
                    notification_channels: channels,
                    webhooks,
                    automations,
                },
            }
            .into(),
        ]);

        let committed = ctx
            .store
            .dispatch_if(
                |s| s.lifecycle.generation == generation && s.lifecycle.status == LifecycleStatus::Initializing,
                commit,
            )
            .map_err(rejected)?;
        if !committed {
            debug!(generation, "initialization superseded, dropping results");
            return Err(CommandError::Cancelled);
        }

        info!(generation, insights = insight_count, "dashboard initialized");
        ctx.emit(
            EventKind::DashboardInitialized,
            json!({
                "dashboardRef": document.dashboard_ref.or(dashboard_ref),
                "title": document.title,
                "insightCount": insight_count,
            }),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SaveDashboard
// ---------------------------------------------------------------------------

pub struct SaveHandler;

/// Returns the lifecycle to `Ready` when a save does not complete.
struct SavingGuard {
    store: Arc<DashboardStore>,
    armed: bool,
}

impl SavingGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SavingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let action = LifecycleAction::SaveFinished { dashboard_ref: None };
        if let Err(e) = self.store.dispatch(action.into()) {
            warn!(error = %e, "could not leave saving state");
        }
    }
}

#[async_trait]
impl RoutineHandler for SaveHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let title = match command {
            DashboardCommand::SaveDashboard { title } => title,
            other => return Err(ctx.mismatch(&other)),
        };
        if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CommandError::Validation("dashboard title must not be empty".into()));
        }

        ctx.dispatch(LifecycleAction::BeginSave)?;
        let guard = SavingGuard {
            store: Arc::clone(&ctx.store),
            armed: true,
        };

        let state = ctx.state();
        let is_new = state.lifecycle.dashboard_ref.is_none();
        let retitled = title.is_some();
        let document = DashboardDocument {
            dashboard_ref: state.lifecycle.dashboard_ref.clone(),
            title: title.unwrap_or_else(|| state.lifecycle.title.clone()),
            description: state.lifecycle.description.clone(),
            layout: state.layout.layout.clone(),
            filter_context: state.filter_context.filters.clone(),
            updated: None,
        };

        let saved = ctx.backend().save_dashboard(ctx.workspace(), &document).await?;
        guard.disarm();

        // edits made while the request was in flight stay live but unsaved
        let mut commit = vec![
            LifecycleAction::SaveFinished {
                dashboard_ref: saved.dashboard_ref.clone(),
            }
            .into(),
            FilterContextAction::SetOriginal(saved.filter_context.clone()).into(),
            LayoutAction::SetOriginal(saved.layout.clone()).into(),
        ];
        if retitled {
            commit.push(LifecycleAction::SetTitle(saved.title.clone()).into());
        }
        ctx.dispatch(StoreAction::Batch(commit))?;

        info!(title = %saved.title, is_new, "dashboard saved");
        ctx.emit(
            EventKind::DashboardSaved,
            json!({ "dashboardRef": saved.dashboard_ref, "title": saved.title, "isNewDashboard": is_new }),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RenameDashboard / ResetDashboard
// ---------------------------------------------------------------------------

pub struct RenameHandler;

impl DirectHandler for RenameHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let title = match command {
            DashboardCommand::RenameDashboard { title } => title,
            other => return Err(ctx.mismatch(&other)),
        };
        if title.trim().is_empty() {
            return Err(CommandError::Validation("dashboard title must not be empty".into()));
        }
        ctx.dispatch(LifecycleAction::SetTitle(title.clone()))?;
        ctx.emit(EventKind::DashboardRenamed, json!({ "newTitle": title }));
        Ok(())
    }
}

pub struct ResetHandler;

impl DirectHandler for ResetHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        if !matches!(command, DashboardCommand::ResetDashboard {}) {
            return Err(ctx.mismatch(&command));
        }
        ctx.dispatch(StoreAction::Batch(vec![
            FilterContextAction::ResetToOriginal.into(),
            LayoutAction::ResetToOriginal.into(),
        ]))?;
        ctx.emit(EventKind::DashboardWasReset, json!({}));
        Ok(())
    }
}
