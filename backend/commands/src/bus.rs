//! Command bus.
//!
//! `dispatch` is synchronous up to the first suspension point: the
//! `CommandStarted` event, admission checks and direct handlers all run before
//! it returns. Routines are spawned on the runtime, either freely or on a
//! per-key worker queue that preserves submission order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tessera_config::defaults::{DEFAULT_EVENT_FEED_CAPACITY, DEFAULT_QUEUE_BUFFER};
use tessera_core::{
    CommandEnvelope, CommandError, CommandKind, DashboardCommand, DashboardContext, DashboardEvent,
    EventKind,
};
use tessera_store::slices::lifecycle::LifecycleStatus;
use tessera_store::DashboardStore;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::{CommandContext, RoutineHandler};
use crate::emitter::{EventEmitter, SubscriptionId};
use crate::registry::{CommandRegistry, Handler};

/// Events emitted by a successful command, excluding `CommandStarted`.
pub type CommandResult = Result<Vec<DashboardEvent>, CommandError>;

type QueuedRoutine = BoxFuture<'static, ()>;

/// Panic payload rendered as text; the outer `Err` of a handler outcome.
type Outcome = Result<Result<(), CommandError>, String>;

// ---------------------------------------------------------------------------
// CommandHandle
// ---------------------------------------------------------------------------

/// Awaitable outcome of one dispatched command.
#[derive(Debug)]
pub struct CommandHandle {
    pub kind: CommandKind,
    pub correlation_id: Option<String>,
    rx: oneshot::Receiver<CommandResult>,
}

impl CommandHandle {
    pub async fn wait(self) -> CommandResult {
        // sender dropped without an answer: the routine was torn down
        self.rx.await.unwrap_or(Err(CommandError::Cancelled))
    }

    /// Outcome if the command already finished, without waiting.
    pub fn try_result(&mut self) -> Option<CommandResult> {
        self.rx.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// CommandBus
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CommandBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    dashboard: Arc<DashboardContext>,
    store: Arc<DashboardStore>,
    registry: CommandRegistry,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
    queues: Mutex<HashMap<String, mpsc::Sender<QueuedRoutine>>>,
    queue_buffer: usize,
}

impl CommandBus {
    pub fn new(dashboard: Arc<DashboardContext>, store: Arc<DashboardStore>, registry: CommandRegistry) -> Self {
        let queue_cfg = dashboard.config.commands.clone().unwrap_or_default();
        let feed_capacity = queue_cfg
            .event_feed_capacity
            .unwrap_or(DEFAULT_EVENT_FEED_CAPACITY);
        let queue_buffer = queue_cfg.queue_buffer.unwrap_or(DEFAULT_QUEUE_BUFFER).max(1);

        info!(
            workspace = %dashboard.workspace,
            handlers = registry.len(),
            "command bus ready"
        );

        Self {
            inner: Arc::new(BusInner {
                dashboard,
                store,
                registry,
                emitter: Arc::new(EventEmitter::new(feed_capacity)),
                cancel: CancellationToken::new(),
                queues: Mutex::new(HashMap::new()),
                queue_buffer,
            }),
        }
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.inner.store
    }

    pub fn context(&self) -> &Arc<DashboardContext> {
        &self.inner.dashboard
    }

    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.inner.emitter
    }

    /// Shorthand for `emitter().subscribe(..)`.
    pub fn subscribe(
        &self,
        filter: Option<EventKind>,
        callback: impl Fn(&DashboardEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.emitter.subscribe(filter, callback)
    }

    pub fn events(&self) -> BroadcastStream<DashboardEvent> {
        self.inner.emitter.stream()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Submit a command. Must be called from within a tokio runtime when the
    /// command is handled by a routine.
    pub fn dispatch(&self, envelope: CommandEnvelope) -> CommandHandle {
        let CommandEnvelope {
            correlation_id,
            command,
        } = envelope;
        let kind = command.kind();
        let (tx, rx) = oneshot::channel();
        let handle = CommandHandle {
            kind,
            correlation_id: correlation_id.clone(),
            rx,
        };

        let ctx = CommandContext::new(
            kind,
            correlation_id,
            Arc::clone(&self.inner.dashboard),
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.emitter),
        );
        ctx.emit_untracked(EventKind::CommandStarted, json!({ "command": command }));

        if let Err(err) = self.admit(kind) {
            self.inner.finish(&ctx, Ok(Err(err)), tx);
            return handle;
        }
        let Some(handler) = self.inner.registry.get(kind).cloned() else {
            error!(command = %kind, "no handler registered for command");
            self.inner
                .finish(&ctx, Ok(Err(CommandError::Unhandled(kind.to_string()))), tx);
            return handle;
        };

        match handler {
            Handler::Direct(handler) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&ctx, command)))
                    .map_err(panic_message);
                self.inner.finish(&ctx, outcome, tx);
            }
            Handler::Routine(handler, policy) => {
                let serialize = ctx.config().serialize_widget_commands();
                match policy.queue_key(&command, serialize) {
                    None => {
                        tokio::spawn(run_routine(Arc::clone(&self.inner), ctx, handler, command, tx));
                    }
                    Some(key) => self.enqueue(key, ctx, handler, command, tx),
                }
            }
        }
        handle
    }

    pub async fn dispatch_and_wait(&self, envelope: CommandEnvelope) -> CommandResult {
        self.dispatch(envelope).wait().await
    }

    /// Decode a JSON envelope and dispatch it. Decoding failures are reported
    /// like any other rejection: a `CommandRejected` event plus an `Err`
    /// outcome.
    pub fn dispatch_json(&self, value: &Value) -> Result<CommandHandle, CommandError> {
        match CommandEnvelope::from_json(value) {
            Ok(envelope) => Ok(self.dispatch(envelope)),
            Err(err) => {
                let correlation_id = value
                    .get("correlationId")
                    .and_then(Value::as_str)
                    .map(String::from);
                let type_name = value.get("type").cloned().unwrap_or(Value::Null);
                warn!(command = %type_name, error = %err, "rejecting undecodable command");
                let event = DashboardEvent::new(
                    EventKind::CommandRejected,
                    Arc::clone(&self.inner.dashboard),
                    correlation_id,
                    json!({ "command": type_name, "reason": err.code(), "message": err.to_string() }),
                );
                self.inner.emitter.emit(&event);
                Err(err)
            }
        }
    }

    /// Cancel every in-flight routine and drop the worker queues. Commands
    /// dispatched afterwards are rejected.
    pub fn shutdown(&self) {
        info!(workspace = %self.inner.dashboard.workspace, "shutting down command bus");
        self.inner.cancel.cancel();
        self.inner.queues.lock().clear();
    }

    // ---- internals ----

    fn admit(&self, kind: CommandKind) -> Result<(), CommandError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CommandError::Cancelled);
        }
        let (status, read_only) = self
            .inner
            .store
            .select(|s| (s.lifecycle.status, s.is_read_only()));
        let allowed = match status {
            LifecycleStatus::Error => false,
            LifecycleStatus::Ready | LifecycleStatus::Saving => true,
            LifecycleStatus::Uninitialized | LifecycleStatus::Initializing => !kind.requires_ready(),
        };
        if !allowed {
            return Err(CommandError::InvalidState {
                command: kind.to_string(),
                state: status.to_string(),
            });
        }
        if read_only && kind.edits_document() {
            return Err(CommandError::ReadOnly(kind.to_string()));
        }
        Ok(())
    }

    fn enqueue(
        &self,
        key: String,
        ctx: CommandContext,
        handler: Arc<dyn RoutineHandler>,
        command: DashboardCommand,
        tx: oneshot::Sender<CommandResult>,
    ) {
        let sender = {
            let mut queues = self.inner.queues.lock();
            queues
                .entry(key.clone())
                .or_insert_with(|| spawn_queue(key.clone(), self.inner.queue_buffer))
                .clone()
        };
        match sender.try_reserve() {
            Ok(permit) => {
                debug!(queue = %key, command = %ctx.kind, "command queued");
                permit.send(run_routine(Arc::clone(&self.inner), ctx, handler, command, tx).boxed());
            }
            Err(_) => {
                warn!(queue = %key, command = %ctx.kind, "command queue full");
                self.inner.finish(
                    &ctx,
                    Ok(Err(CommandError::Internal(format!("command queue '{key}' is full")))),
                    tx,
                );
            }
        };
    }
}

impl BusInner {
    /// Resolve the handle and emit the generic outcome event.
    fn finish(&self, ctx: &CommandContext, outcome: Outcome, tx: oneshot::Sender<CommandResult>) {
        let result = match outcome {
            Ok(Ok(())) => {
                debug!(command = %ctx.kind, "command finished");
                Ok(ctx.take_events())
            }
            Ok(Err(err)) => {
                let kind = if is_rejection(&err) {
                    EventKind::CommandRejected
                } else {
                    EventKind::CommandFailed
                };
                warn!(command = %ctx.kind, reason = err.code(), error = %err, "command did not complete");
                ctx.emit_untracked(
                    kind,
                    json!({ "command": ctx.kind, "reason": err.code(), "message": err.to_string() }),
                );
                Err(err)
            }
            Err(panic) => {
                error!(command = %ctx.kind, panic = %panic, "command handler panicked");
                ctx.emit_untracked(
                    EventKind::InternalError,
                    json!({ "command": ctx.kind, "message": panic }),
                );
                Err(CommandError::Internal(panic))
            }
        };
        // caller may have dropped the handle
        let _ = tx.send(result);
    }
}

async fn run_routine(
    inner: Arc<BusInner>,
    ctx: CommandContext,
    handler: Arc<dyn RoutineHandler>,
    command: DashboardCommand,
    tx: oneshot::Sender<CommandResult>,
) {
    let token = inner.cancel.child_token();
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => Ok(Err(CommandError::Cancelled)),
        res = AssertUnwindSafe(handler.run(ctx.clone(), command)).catch_unwind() => res.map_err(panic_message),
    };
    inner.finish(&ctx, outcome, tx);
}

fn spawn_queue(key: String, buffer: usize) -> mpsc::Sender<QueuedRoutine> {
    let (tx, mut rx) = mpsc::channel::<QueuedRoutine>(buffer);
    debug!(queue = %key, "starting command queue");
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            job.await;
        }
        debug!(queue = %key, "command queue closed");
    });
    tx
}

/// Errors caused by the command itself rather than by its execution.
fn is_rejection(err: &CommandError) -> bool {
    matches!(
        err,
        CommandError::Unhandled(_)
            | CommandError::InvalidPayload { .. }
            | CommandError::Validation(_)
            | CommandError::InvalidState { .. }
            | CommandError::ReadOnly(_)
    )
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use crate::testing::null_context;
    use tessera_core::ScreenSize;

    fn bus() -> CommandBus {
        CommandBus::new(null_context(), Arc::new(DashboardStore::new()), default_registry())
    }

    #[tokio::test]
    async fn test_direct_command_resolves_before_dispatch_returns() {
        let bus = bus();
        let mut handle = bus.dispatch(
            CommandEnvelope::new(DashboardCommand::SetScreenSize {
                screen_size: ScreenSize::Md,
            })
            .with_correlation_id("c1"),
        );
        let events = handle.try_result().expect("resolved inline").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ScreenSizeChanged);
        assert_eq!(events[0].correlation_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_commands_before_ready_are_rejected() {
        let bus = bus();
        let err = bus
            .dispatch_and_wait(CommandEnvelope::new(DashboardCommand::RenameDashboard {
                title: "x".into(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidState { ref state, .. } if state == "uninitialized"));
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_cancelled() {
        let bus = bus();
        bus.shutdown();
        let err = bus
            .dispatch_and_wait(CommandEnvelope::new(DashboardCommand::RequestAsyncRender {
                id: "a".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::Cancelled);
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "handler panicked");
    }
}
