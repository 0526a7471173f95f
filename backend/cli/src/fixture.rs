//! File-backed analytical backend.
//!
//! A fixture is one JSON document holding everything a session would fetch:
//! dashboards, insights, alerts, filter views and the rest. Saves land in
//! memory only.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tessera_core::{
    serialize_obj_ref, AnalyticalBackend, Alert, BackendCapabilities, BackendError, DashboardDocument, DashboardMeta,
    DateHierarchyTemplate, Entitlements, FilterView, Insight, ObjRef, Permissions,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    pub capabilities: BackendCapabilities,
    pub dashboards: Vec<DashboardDocument>,
    pub insights: Vec<Insight>,
    pub alerts: Vec<Alert>,
    pub filter_views: Vec<FilterView>,
    pub date_hierarchy_templates: Vec<DateHierarchyTemplate>,
    pub entitlements: Entitlements,
    pub permissions: Option<Permissions>,
    pub notification_channels: u32,
    pub webhooks: u32,
    pub automations: u32,
}

pub struct FileBackend {
    fixture: Fixture,
    dashboards: Mutex<HashMap<String, DashboardDocument>>,
}

impl FileBackend {
    pub fn new(fixture: Fixture) -> Self {
        let dashboards = fixture
            .dashboards
            .iter()
            .filter_map(|d| d.dashboard_ref.as_ref().map(|r| (serialize_obj_ref(r), d.clone())))
            .collect();
        Self {
            fixture,
            dashboards: Mutex::new(dashboards),
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        let fixture: Fixture =
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse fixture: {}", path.display()))?;
        info!(
            path = %path.display(),
            dashboards = fixture.dashboards.len(),
            insights = fixture.insights.len(),
            "Loaded backend fixture"
        );
        Ok(Self::new(fixture))
    }

    /// Ref of the first dashboard in the fixture.
    pub fn first_dashboard(&self) -> Option<ObjRef> {
        self.fixture.dashboards.iter().find_map(|d| d.dashboard_ref.clone())
    }
}

#[async_trait]
impl AnalyticalBackend for FileBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.fixture.capabilities
    }

    async fn get_dashboard(&self, _workspace: &str, dashboard: &ObjRef) -> Result<DashboardDocument, BackendError> {
        self.dashboards
            .lock()
            .get(&serialize_obj_ref(dashboard))
            .cloned()
            .ok_or_else(|| BackendError::not_found(dashboard))
    }

    async fn list_accessible_dashboards(&self, _workspace: &str) -> Result<Vec<DashboardMeta>, BackendError> {
        Ok(self
            .dashboards
            .lock()
            .values()
            .filter_map(|d| {
                d.dashboard_ref.clone().map(|r| DashboardMeta {
                    dashboard_ref: r,
                    title: d.title.clone(),
                })
            })
            .collect())
    }

    async fn save_dashboard(
        &self,
        _workspace: &str,
        document: &DashboardDocument,
    ) -> Result<DashboardDocument, BackendError> {
        let mut saved = document.clone();
        let r = saved
            .dashboard_ref
            .get_or_insert_with(|| ObjRef::typed(Uuid::new_v4().simple().to_string(), "analyticalDashboard"))
            .clone();
        debug!(dashboard = %serialize_obj_ref(&r), "Saved dashboard in memory");
        self.dashboards.lock().insert(serialize_obj_ref(&r), saved.clone());
        Ok(saved)
    }

    async fn get_insights(&self, _workspace: &str, refs: &[ObjRef]) -> Result<Vec<Insight>, BackendError> {
        Ok(self
            .fixture
            .insights
            .iter()
            .filter(|i| refs.contains(&i.insight_ref))
            .cloned()
            .collect())
    }

    async fn get_alerts(&self, _workspace: &str, _dashboard: Option<&ObjRef>) -> Result<Vec<Alert>, BackendError> {
        Ok(self.fixture.alerts.clone())
    }

    async fn get_filter_views(
        &self,
        _workspace: &str,
        _dashboard: Option<&ObjRef>,
    ) -> Result<Vec<FilterView>, BackendError> {
        Ok(self.fixture.filter_views.clone())
    }

    async fn get_date_hierarchy_templates(&self, _workspace: &str) -> Result<Vec<DateHierarchyTemplate>, BackendError> {
        Ok(self.fixture.date_hierarchy_templates.clone())
    }

    async fn get_entitlements(&self) -> Result<Entitlements, BackendError> {
        Ok(self.fixture.entitlements.clone())
    }

    async fn get_permissions(&self, _workspace: &str) -> Result<Permissions, BackendError> {
        // editable unless the fixture says otherwise
        Ok(self.fixture.permissions.clone().unwrap_or(Permissions {
            can_edit_dashboard: true,
            ..Default::default()
        }))
    }

    async fn count_notification_channels(&self) -> Result<u32, BackendError> {
        Ok(self.fixture.notification_channels)
    }

    async fn count_webhooks(&self) -> Result<u32, BackendError> {
        Ok(self.fixture.webhooks)
    }

    async fn count_automations(&self, _workspace: &str) -> Result<u32, BackendError> {
        Ok(self.fixture.automations)
    }
}
