//! Async render barrier commands.

use serde_json::json;
use tessera_core::{CommandError, DashboardCommand, EventKind};
use tessera_store::slices::render::{self, RenderAction};
use tracing::debug;

use crate::dispatch::{rejected, CommandContext, DirectHandler};

pub struct RequestAsyncRenderHandler;

impl DirectHandler for RequestAsyncRenderHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let id = match command {
            DashboardCommand::RequestAsyncRender { id } => id,
            other => return Err(ctx.mismatch(&other)),
        };
        if id.is_empty() {
            return Err(CommandError::Validation("render id must not be empty".into()));
        }
        ctx.dispatch(RenderAction::Request(id.clone()))?;
        ctx.emit(EventKind::AsyncRenderRequested, json!({ "id": id }));
        Ok(())
    }
}

/// Resolving an id that is not pending is a no-op. When the last pending id
/// resolves, `AllAsyncRendersResolved` follows `AsyncRenderResolved`.
pub struct ResolveAsyncRenderHandler;

impl DirectHandler for ResolveAsyncRenderHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let id = match command {
            DashboardCommand::ResolveAsyncRender { id } => id,
            other => return Err(ctx.mismatch(&other)),
        };

        let ((was_pending, completions_before), (_, completions_after)) = ctx
            .store
            .dispatch_with_diff(RenderAction::Resolve(id.clone()).into(), |s| {
                (render::is_pending(&s.render, &id), s.render.completions)
            })
            .map_err(rejected)?;

        if !was_pending {
            debug!(id = %id, "resolve for a render that is not pending");
            return Ok(());
        }
        ctx.emit(EventKind::AsyncRenderResolved, json!({ "id": id }));
        if completions_after > completions_before {
            ctx.emit(EventKind::AllAsyncRendersResolved, json!({}));
        }
        Ok(())
    }
}
