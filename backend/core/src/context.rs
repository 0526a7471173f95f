use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tessera_config::DashboardConfig;

use crate::refs::ObjRef;
use crate::traits::AnalyticalBackend;

/// Read-only session context, built once and shared by every handler and event.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardContext {
    #[serde(skip)]
    pub backend: Arc<dyn AnalyticalBackend>,
    pub workspace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_ref: Option<ObjRef>,
    #[serde(skip)]
    pub config: DashboardConfig,
}

impl DashboardContext {
    pub fn new(
        backend: Arc<dyn AnalyticalBackend>,
        workspace: impl Into<String>,
        dashboard_ref: Option<ObjRef>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            backend,
            workspace: workspace.into(),
            dashboard_ref,
            config,
        }
    }
}

impl fmt::Debug for DashboardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardContext")
            .field("workspace", &self.workspace)
            .field("dashboard_ref", &self.dashboard_ref)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
