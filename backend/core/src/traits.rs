use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::refs::ObjRef;
use crate::types::{
    Alert, DashboardDocument, DashboardMeta, DateHierarchyTemplate, Entitlements, FilterView,
    Insight, Permissions,
};

/// Feature flags describing what a backend can do. Handlers branch on these
/// to skip loads the backend cannot serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCapabilities {
    #[serde(default)]
    pub supports_kpi_widget: bool,
    #[serde(default)]
    pub supports_attribute_hierarchies: bool,
    #[serde(default)]
    pub supports_object_uris: bool,
    #[serde(default)]
    pub supports_automations: bool,
    #[serde(default)]
    pub supports_notification_channels: bool,
    #[serde(default)]
    pub supports_filter_views: bool,
}

impl BackendCapabilities {
    pub fn all() -> Self {
        Self {
            supports_kpi_widget: true,
            supports_attribute_hierarchies: true,
            supports_object_uris: true,
            supports_automations: true,
            supports_notification_channels: true,
            supports_filter_views: true,
        }
    }
}

/// The analytical backend as seen by command handlers.
///
/// Every method is a suspension point; test doubles replace it wholesale.
#[async_trait]
pub trait AnalyticalBackend: Send + Sync {
    fn capabilities(&self) -> BackendCapabilities;

    async fn get_dashboard(&self, workspace: &str, dashboard: &ObjRef)
        -> Result<DashboardDocument, BackendError>;

    async fn list_accessible_dashboards(&self, workspace: &str)
        -> Result<Vec<DashboardMeta>, BackendError>;

    /// Persist the document; returns it as stored (with a ref for new dashboards).
    async fn save_dashboard(&self, workspace: &str, document: &DashboardDocument)
        -> Result<DashboardDocument, BackendError>;

    async fn get_insights(&self, workspace: &str, refs: &[ObjRef])
        -> Result<Vec<Insight>, BackendError>;

    async fn get_alerts(&self, workspace: &str, dashboard: Option<&ObjRef>)
        -> Result<Vec<Alert>, BackendError>;

    async fn get_filter_views(&self, workspace: &str, dashboard: Option<&ObjRef>)
        -> Result<Vec<FilterView>, BackendError>;

    async fn get_date_hierarchy_templates(&self, workspace: &str)
        -> Result<Vec<DateHierarchyTemplate>, BackendError>;

    async fn get_entitlements(&self) -> Result<Entitlements, BackendError>;

    async fn get_permissions(&self, workspace: &str) -> Result<Permissions, BackendError>;

    async fn count_notification_channels(&self) -> Result<u32, BackendError>;

    async fn count_webhooks(&self) -> Result<u32, BackendError>;

    async fn count_automations(&self, workspace: &str) -> Result<u32, BackendError>;
}
