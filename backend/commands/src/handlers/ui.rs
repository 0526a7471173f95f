use serde_json::json;
use tessera_core::{CommandError, DashboardCommand, EventKind};
use tessera_store::slices::layout::LayoutAction;
use tessera_store::slices::ui::UiAction;

use crate::dispatch::{CommandContext, DirectHandler};

pub struct SetScreenSizeHandler;

impl DirectHandler for SetScreenSizeHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let screen_size = match command {
            DashboardCommand::SetScreenSize { screen_size } => screen_size,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(LayoutAction::SetScreen(screen_size))?;
        ctx.emit(EventKind::ScreenSizeChanged, json!({ "screenSize": screen_size }));
        Ok(())
    }
}

pub struct SetDateFilterConfigModeHandler;

impl DirectHandler for SetDateFilterConfigModeHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let mode = match command {
            DashboardCommand::SetDashboardDateFilterConfigMode { mode } => mode,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(UiAction::SetDateFilterConfigMode(mode))?;
        ctx.emit(EventKind::DateFilterConfigModeChanged, json!({ "mode": mode }));
        Ok(())
    }
}

/// Relays a caller-defined event through the bus.
pub struct TriggerEventHandler;

impl DirectHandler for TriggerEventHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (name, data) = match command {
            DashboardCommand::TriggerEvent { name, data } => (name, data),
            other => return Err(ctx.mismatch(&other)),
        };
        if name.trim().is_empty() {
            return Err(CommandError::Validation("custom event name must not be empty".into()));
        }
        ctx.dispatch(UiAction::EventTriggered)?;
        ctx.emit(EventKind::CustomEvent, json!({ "name": name, "data": data }));
        Ok(())
    }
}
