//! `tessera-commands` - the command bus, handlers and event emitter.

pub mod bus;
pub mod dispatch;
pub mod emitter;
pub mod handlers;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

pub use bus::{CommandBus, CommandHandle, CommandResult};
pub use dispatch::{CommandContext, DirectHandler, RoutineHandler};
pub use emitter::{EventCallback, EventEmitter, SubscriptionId};
pub use registry::{default_registry, CommandRegistry, Handler, QueuePolicy};

use tessera_config::DashboardConfig;
use tessera_core::{AnalyticalBackend, DashboardContext, ObjRef};
use tessera_store::{DashboardState, DashboardStore};

/// Build a bus pre-wired with all built-in handlers over a fresh store.
pub fn build_session(
    backend: Arc<dyn AnalyticalBackend>,
    workspace: impl Into<String>,
    dashboard_ref: Option<ObjRef>,
    config: DashboardConfig,
) -> CommandBus {
    let store = DashboardStore::with_state(DashboardState {
        config: Arc::new(config.clone()),
        ..Default::default()
    });
    let ctx = Arc::new(DashboardContext::new(backend, workspace, dashboard_ref, config));
    CommandBus::new(ctx, Arc::new(store), default_registry())
}
