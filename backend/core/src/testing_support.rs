use std::sync::Arc;

use async_trait::async_trait;
use tessera_config::DashboardConfig;

use crate::context::DashboardContext;
use crate::error::BackendError;
use crate::refs::ObjRef;
use crate::traits::{AnalyticalBackend, BackendCapabilities};
use crate::types::*;

/// Backend that has nothing.
pub struct NullBackend;

#[async_trait]
impl AnalyticalBackend for NullBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
    async fn get_dashboard(&self, _: &str, dashboard: &ObjRef) -> Result<DashboardDocument, BackendError> {
        Err(BackendError::not_found(dashboard))
    }
    async fn list_accessible_dashboards(&self, _: &str) -> Result<Vec<DashboardMeta>, BackendError> {
        Ok(vec![])
    }
    async fn save_dashboard(&self, _: &str, document: &DashboardDocument) -> Result<DashboardDocument, BackendError> {
        Ok(document.clone())
    }
    async fn get_insights(&self, _: &str, _: &[ObjRef]) -> Result<Vec<Insight>, BackendError> {
        Ok(vec![])
    }
    async fn get_alerts(&self, _: &str, _: Option<&ObjRef>) -> Result<Vec<Alert>, BackendError> {
        Ok(vec![])
    }
    async fn get_filter_views(&self, _: &str, _: Option<&ObjRef>) -> Result<Vec<FilterView>, BackendError> {
        Ok(vec![])
    }
    async fn get_date_hierarchy_templates(&self, _: &str) -> Result<Vec<DateHierarchyTemplate>, BackendError> {
        Ok(vec![])
    }
    async fn get_entitlements(&self) -> Result<Entitlements, BackendError> {
        Ok(Entitlements::default())
    }
    async fn get_permissions(&self, _: &str) -> Result<Permissions, BackendError> {
        Ok(Permissions::default())
    }
    async fn count_notification_channels(&self) -> Result<u32, BackendError> {
        Ok(0)
    }
    async fn count_webhooks(&self) -> Result<u32, BackendError> {
        Ok(0)
    }
    async fn count_automations(&self, _: &str) -> Result<u32, BackendError> {
        Ok(0)
    }
}

pub fn null_context() -> Arc<DashboardContext> {
    Arc::new(DashboardContext::new(
        Arc::new(NullBackend),
        "ws",
        None,
        DashboardConfig::default(),
    ))
}
