/// Handler traits and the per-command context handed to handlers.
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tessera_config::DashboardConfig;
use tessera_core::{
    AnalyticalBackend, CommandError, CommandKind, DashboardCommand, DashboardContext, DashboardEvent,
    EventKind,
};
use tessera_store::{DashboardState, DashboardStore, StoreAction, StoreError};

use crate::emitter::EventEmitter;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a handler may touch while processing one command.
#[derive(Clone)]
pub struct CommandContext {
    pub kind: CommandKind,
    pub correlation_id: Option<String>,
    pub dashboard: Arc<DashboardContext>,
    pub store: Arc<DashboardStore>,
    emitter: Arc<EventEmitter>,
    emitted: Arc<Mutex<Vec<DashboardEvent>>>,
}

impl CommandContext {
    pub fn new(
        kind: CommandKind,
        correlation_id: Option<String>,
        dashboard: Arc<DashboardContext>,
        store: Arc<DashboardStore>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            kind,
            correlation_id,
            dashboard,
            store,
            emitter,
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn backend(&self) -> &dyn AnalyticalBackend {
        self.dashboard.backend.as_ref()
    }

    pub fn workspace(&self) -> &str {
        &self.dashboard.workspace
    }

    pub fn state(&self) -> DashboardState {
        self.store.state()
    }

    /// Resolved configuration of the session (base config plus overrides).
    pub fn config(&self) -> Arc<DashboardConfig> {
        self.store.select(|s| Arc::clone(&s.config))
    }

    pub fn dispatch(&self, action: impl Into<StoreAction>) -> Result<(), CommandError> {
        self.store.dispatch(action.into()).map_err(rejected)
    }

    /// Build an event correlated with this command.
    pub fn event(&self, kind: EventKind, payload: Value) -> DashboardEvent {
        DashboardEvent::new(
            kind,
            Arc::clone(&self.dashboard),
            self.correlation_id.clone(),
            payload,
        )
    }

    /// Deliver an event to subscribers now and record it as an outcome of
    /// this command.
    pub fn emit(&self, kind: EventKind, payload: Value) {
        let event = self.event(kind, payload);
        self.emitted.lock().push(event.clone());
        self.emitter.emit(&event);
    }

    pub(crate) fn emit_untracked(&self, kind: EventKind, payload: Value) {
        self.emitter.emit(&self.event(kind, payload));
    }

    pub(crate) fn take_events(&self) -> Vec<DashboardEvent> {
        std::mem::take(&mut *self.emitted.lock())
    }

    /// Error for a handler invoked with a command it is not registered for.
    pub fn mismatch(&self, command: &DashboardCommand) -> CommandError {
        CommandError::Internal(format!(
            "handler for {} received {}",
            self.kind,
            command.kind()
        ))
    }
}

/// A reducer refusing an action means the command was invalid for the
/// current state.
pub fn rejected(err: StoreError) -> CommandError {
    CommandError::Validation(err.to_string())
}

// ---------------------------------------------------------------------------
// Handler traits
// ---------------------------------------------------------------------------

/// Runs to completion inside `dispatch`; never suspends.
pub trait DirectHandler: Send + Sync {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError>;
}

/// Runs on the runtime and may suspend at backend calls or store waits.
#[async_trait]
pub trait RoutineHandler: Send + Sync {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError>;
}
