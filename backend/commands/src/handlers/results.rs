//! Results reported by widgets: executions, drill targets, analytics.
//!
//! Every upsert replaces the stored value for the widget wholesale. These
//! run on the widget's queue so reports for one widget land in submission
//! order.

use async_trait::async_trait;
use serde_json::json;
use tessera_core::{CommandError, DashboardCommand, EventKind};
use tessera_store::slices::analytics::AnalyticsAction;
use tessera_store::slices::keyed::KeyedAction;
use tessera_store::StoreAction;

use crate::dispatch::{CommandContext, RoutineHandler};

pub struct UpsertExecutionResultHandler;

#[async_trait]
impl RoutineHandler for UpsertExecutionResultHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let result = match command {
            DashboardCommand::UpsertExecutionResult { result } => result,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(StoreAction::ExecutionResults(KeyedAction::Upsert(result.clone())))?;
        ctx.emit(EventKind::ExecutionResultUpserted, json!({ "result": result }));
        Ok(())
    }
}

pub struct AddDrillTargetsHandler;

#[async_trait]
impl RoutineHandler for AddDrillTargetsHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let targets = match command {
            DashboardCommand::AddDrillTargets { targets } => targets,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(StoreAction::DrillTargets(KeyedAction::Upsert(targets.clone())))?;
        ctx.emit(EventKind::DrillTargetsAdded, json!({ "drillTargets": targets }));
        Ok(())
    }
}

pub struct UpsertPredictionHandler;

#[async_trait]
impl RoutineHandler for UpsertPredictionHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let result = match command {
            DashboardCommand::UpsertPredictionResult { result } => result,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(AnalyticsAction::UpsertPrediction(result.clone()))?;
        ctx.emit(EventKind::PredictionResultUpserted, json!({ "result": result }));
        Ok(())
    }
}

pub struct UpsertKeyDriverAnalysisHandler;

#[async_trait]
impl RoutineHandler for UpsertKeyDriverAnalysisHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let result = match command {
            DashboardCommand::UpsertKeyDriverAnalysisResult { result } => result,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(AnalyticsAction::UpsertKeyDriverAnalysis(result.clone()))?;
        ctx.emit(EventKind::KeyDriverAnalysisResultUpserted, json!({ "result": result }));
        Ok(())
    }
}
