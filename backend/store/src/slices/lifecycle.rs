//! Session lifecycle and dashboard-level metadata.

use std::fmt;

use serde::Serialize;
use tessera_core::{DashboardMeta, DateHierarchyTemplate, ObjRef};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Saving,
    Error,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleStatus::Uninitialized => "uninitialized",
            LifecycleStatus::Initializing => "initializing",
            LifecycleStatus::Ready => "ready",
            LifecycleStatus::Saving => "saving",
            LifecycleStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Counts of workspace integrations, loaded once at initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationCounts {
    pub notification_channels: u32,
    pub webhooks: u32,
    pub automations: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleState {
    pub status: LifecycleStatus,
    /// Bumped on every initialization start; results of older runs are dropped.
    pub generation: u64,
    pub dashboard_ref: Option<ObjRef>,
    pub title: String,
    pub description: Option<String>,
    pub accessible_dashboards: Vec<DashboardMeta>,
    pub date_hierarchy_templates: Vec<DateHierarchyTemplate>,
    pub counts: IntegrationCounts,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleAction {
    BeginInitialize,
    Initialized {
        generation: u64,
        dashboard_ref: Option<ObjRef>,
        title: String,
        description: Option<String>,
        accessible_dashboards: Vec<DashboardMeta>,
        date_hierarchy_templates: Vec<DateHierarchyTemplate>,
        counts: IntegrationCounts,
    },
    InitializationFailed {
        generation: u64,
        message: String,
    },
    BeginSave,
    SaveFinished {
        dashboard_ref: Option<ObjRef>,
    },
    SetTitle(String),
}

impl LifecycleAction {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleAction::BeginInitialize => "lifecycle/beginInitialize",
            LifecycleAction::Initialized { .. } => "lifecycle/initialized",
            LifecycleAction::InitializationFailed { .. } => "lifecycle/initializationFailed",
            LifecycleAction::BeginSave => "lifecycle/beginSave",
            LifecycleAction::SaveFinished { .. } => "lifecycle/saveFinished",
            LifecycleAction::SetTitle(_) => "lifecycle/setTitle",
        }
    }
}

fn invalid(from: LifecycleStatus, action: &'static str) -> StoreError {
    StoreError::InvalidTransition {
        from: from.to_string(),
        action,
    }
}

pub fn reduce(state: &mut LifecycleState, action: LifecycleAction) -> Result<(), StoreError> {
    use LifecycleStatus as S;
    match action {
        LifecycleAction::BeginInitialize => match state.status {
            S::Uninitialized | S::Ready | S::Initializing => {
                state.status = S::Initializing;
                state.generation += 1;
                state.error = None;
            }
            other => return Err(invalid(other, "initialize")),
        },
        LifecycleAction::Initialized {
            generation,
            dashboard_ref,
            title,
            description,
            accessible_dashboards,
            date_hierarchy_templates,
            counts,
        } => {
            if generation != state.generation {
                return Ok(());
            }
            if state.status != S::Initializing {
                return Err(invalid(state.status, "finish initialization"));
            }
            state.status = S::Ready;
            state.dashboard_ref = dashboard_ref;
            state.title = title;
            state.description = description;
            state.accessible_dashboards = accessible_dashboards;
            state.date_hierarchy_templates = date_hierarchy_templates;
            state.counts = counts;
        }
        LifecycleAction::InitializationFailed { generation, message } => {
            if generation != state.generation {
                return Ok(());
            }
            state.status = S::Error;
            state.error = Some(message);
        }
        LifecycleAction::BeginSave => {
            if state.status != S::Ready {
                return Err(invalid(state.status, "save"));
            }
            state.status = S::Saving;
        }
        LifecycleAction::SaveFinished { dashboard_ref } => {
            if state.status != S::Saving {
                return Err(invalid(state.status, "finish save"));
            }
            state.status = S::Ready;
            if dashboard_ref.is_some() {
                state.dashboard_ref = dashboard_ref;
            }
        }
        LifecycleAction::SetTitle(title) => state.title = title,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized(generation: u64) -> LifecycleAction {
        LifecycleAction::Initialized {
            generation,
            dashboard_ref: None,
            title: "Untitled".into(),
            description: None,
            accessible_dashboards: vec![],
            date_hierarchy_templates: vec![],
            counts: IntegrationCounts::default(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut state = LifecycleState::default();
        reduce(&mut state, LifecycleAction::BeginInitialize).unwrap();
        assert_eq!(state.status, LifecycleStatus::Initializing);
        reduce(&mut state, initialized(1)).unwrap();
        assert_eq!(state.status, LifecycleStatus::Ready);
        reduce(&mut state, LifecycleAction::BeginSave).unwrap();
        assert_eq!(state.status, LifecycleStatus::Saving);
        reduce(
            &mut state,
            LifecycleAction::SaveFinished {
                dashboard_ref: Some(ObjRef::id("d1")),
            },
        )
        .unwrap();
        assert_eq!(state.status, LifecycleStatus::Ready);
        assert_eq!(state.dashboard_ref, Some(ObjRef::id("d1")));
    }

    #[test]
    fn test_stale_initialization_is_ignored() {
        let mut state = LifecycleState::default();
        reduce(&mut state, LifecycleAction::BeginInitialize).unwrap();
        reduce(&mut state, LifecycleAction::BeginInitialize).unwrap();
        reduce(&mut state, initialized(1)).unwrap();
        assert_eq!(state.status, LifecycleStatus::Initializing);
        reduce(&mut state, initialized(2)).unwrap();
        assert_eq!(state.status, LifecycleStatus::Ready);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut state = LifecycleState::default();
        reduce(&mut state, LifecycleAction::BeginInitialize).unwrap();
        reduce(
            &mut state,
            LifecycleAction::InitializationFailed {
                generation: 1,
                message: "entitlements".into(),
            },
        )
        .unwrap();
        assert_eq!(state.status, LifecycleStatus::Error);
        assert!(reduce(&mut state, LifecycleAction::BeginInitialize).is_err());
        assert!(reduce(&mut state, LifecycleAction::BeginSave).is_err());
    }

    #[test]
    fn test_save_requires_ready() {
        let mut state = LifecycleState::default();
        let err = reduce(&mut state, LifecycleAction::BeginSave).unwrap_err();
        assert_eq!(err.to_string(), "cannot save while uninitialized");
    }
}
