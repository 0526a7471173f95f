#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_commands::testing::{context, sample_dashboard, sample_insights, RecordingBackend};
use tessera_commands::{default_registry, CommandBus, CommandRegistry};
use tessera_config::DashboardConfig;
use tessera_core::{CommandEnvelope, DashboardCommand, DashboardEvent, EventKind, ObjRef};
use tessera_store::{DashboardState, DashboardStore};

pub fn dashboard_ref(id: &str) -> ObjRef {
    ObjRef::typed(id, "analyticalDashboard")
}

pub fn bus_with(backend: Arc<RecordingBackend>, dashboard: Option<ObjRef>, config: DashboardConfig) -> CommandBus {
    bus_with_registry(backend, dashboard, config, default_registry())
}

pub fn bus_with_registry(
    backend: Arc<RecordingBackend>,
    dashboard: Option<ObjRef>,
    config: DashboardConfig,
    registry: CommandRegistry,
) -> CommandBus {
    let store = DashboardStore::with_state(DashboardState {
        config: Arc::new(config.clone()),
        ..Default::default()
    });
    CommandBus::new(context(backend, dashboard, config), Arc::new(store), registry)
}

/// Backend holding `sample_dashboard("d1")` and its insights.
pub fn sample_backend() -> RecordingBackend {
    RecordingBackend::new()
        .with_dashboard(sample_dashboard("d1"))
        .with_insights(sample_insights())
}

pub async fn initialize(bus: &CommandBus) {
    bus.dispatch_and_wait(CommandEnvelope::new(DashboardCommand::InitializeDashboard {
        dashboard_ref: None,
        config: None,
    }))
    .await
    .expect("initialization succeeds");
}

/// Bus over the sample dashboard, already initialized.
pub async fn ready_bus() -> (CommandBus, Arc<RecordingBackend>) {
    let backend = Arc::new(sample_backend());
    let bus = bus_with(Arc::clone(&backend), Some(dashboard_ref("d1")), DashboardConfig::default());
    initialize(&bus).await;
    (bus, backend)
}

/// Record every event the bus emits.
pub fn record(bus: &CommandBus) -> Arc<Mutex<Vec<DashboardEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(None, move |e| sink.lock().push(e.clone()));
    seen
}

pub fn kinds(events: &[DashboardEvent]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

pub fn envelope(command: DashboardCommand) -> CommandEnvelope {
    CommandEnvelope::new(command)
}
