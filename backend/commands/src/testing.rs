//! In-memory backend and fixtures for tests.
//!
//! `RecordingBackend` counts calls per endpoint, can fail or hold any
//! endpoint, and can script successive filter view responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_config::DashboardConfig;
use tessera_core::*;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Dashboard,
    AccessibleDashboards,
    Save,
    Insights,
    Alerts,
    FilterViews,
    DateHierarchyTemplates,
    Entitlements,
    Permissions,
    NotificationChannels,
    Webhooks,
    Automations,
}

#[derive(Default)]
pub struct RecordingBackend {
    capabilities: BackendCapabilities,
    dashboards: Mutex<HashMap<String, DashboardDocument>>,
    insights: Vec<Insight>,
    alerts: Vec<Alert>,
    filter_views: Vec<FilterView>,
    scripted_views: Mutex<VecDeque<(Option<Arc<Notify>>, Vec<FilterView>)>>,
    failures: HashMap<Endpoint, BackendError>,
    gates: HashMap<Endpoint, Arc<Notify>>,
    calls: Mutex<HashMap<Endpoint, usize>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_dashboard(self, document: DashboardDocument) -> Self {
        if let Some(r) = &document.dashboard_ref {
            self.dashboards.lock().insert(serialize_obj_ref(r), document.clone());
        }
        self
    }

    pub fn with_insights(mut self, insights: Vec<Insight>) -> Self {
        self.insights = insights;
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<Alert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_filter_views(mut self, views: Vec<FilterView>) -> Self {
        self.filter_views = views;
        self
    }

    pub fn failing(mut self, endpoint: Endpoint, err: BackendError) -> Self {
        self.failures.insert(endpoint, err);
        self
    }

    /// Hold `endpoint` until the returned `Notify` is signalled, once per call.
    pub fn gate(&mut self, endpoint: Endpoint) -> Arc<Notify> {
        Arc::clone(self.gates.entry(endpoint).or_default())
    }

    /// Queue the response of the next `get_filter_views` call, optionally
    /// held until `gate` is signalled.
    pub fn push_filter_views(&self, gate: Option<Arc<Notify>>, views: Vec<FilterView>) {
        self.scripted_views.lock().push_back((gate, views));
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().get(&endpoint).copied().unwrap_or(0)
    }

    pub fn saved(&self, dashboard: &ObjRef) -> Option<DashboardDocument> {
        self.dashboards.lock().get(&serialize_obj_ref(dashboard)).cloned()
    }

    /// Yield until `endpoint` has been called at least `n` times.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, n: usize) {
        while self.calls(endpoint) < n {
            tokio::task::yield_now().await;
        }
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), BackendError> {
        *self.calls.lock().entry(endpoint).or_default() += 1;
        if let Some(gate) = self.gates.get(&endpoint) {
            gate.notified().await;
        }
        match self.failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AnalyticalBackend for RecordingBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    async fn get_dashboard(&self, _: &str, dashboard: &ObjRef) -> Result<DashboardDocument, BackendError> {
        self.enter(Endpoint::Dashboard).await?;
        self.dashboards
            .lock()
            .get(&serialize_obj_ref(dashboard))
            .cloned()
            .ok_or_else(|| BackendError::not_found(dashboard))
    }

    async fn list_accessible_dashboards(&self, _: &str) -> Result<Vec<DashboardMeta>, BackendError> {
        self.enter(Endpoint::AccessibleDashboards).await?;
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

    async fn save_dashboard(&self, _: &str, document: &DashboardDocument) -> Result<DashboardDocument, BackendError> {
        self.enter(Endpoint::Save).await?;
        let mut saved = document.clone();
        let r = saved
            .dashboard_ref
            .get_or_insert_with(|| ObjRef::typed(format!("dash-{}", self.calls(Endpoint::Save)), "analyticalDashboard"))
            .clone();
        self.dashboards.lock().insert(serialize_obj_ref(&r), saved.clone());
        Ok(saved)
    }

    async fn get_insights(&self, _: &str, refs: &[ObjRef]) -> Result<Vec<Insight>, BackendError> {
        self.enter(Endpoint::Insights).await?;
        Ok(self
            .insights
            .iter()
            .filter(|i| refs.contains(&i.insight_ref))
            .cloned()
            .collect())
    }

    async fn get_alerts(&self, _: &str, _: Option<&ObjRef>) -> Result<Vec<Alert>, BackendError> {
        self.enter(Endpoint::Alerts).await?;
        Ok(self.alerts.clone())
    }

    async fn get_filter_views(&self, _: &str, _: Option<&ObjRef>) -> Result<Vec<FilterView>, BackendError> {
        let scripted = self.scripted_views.lock().pop_front();
        self.enter(Endpoint::FilterViews).await?;
        match scripted {
            Some((gate, views)) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                Ok(views)
            }
            None => Ok(self.filter_views.clone()),
        }
    }

    async fn get_date_hierarchy_templates(&self, _: &str) -> Result<Vec<DateHierarchyTemplate>, BackendError> {
        self.enter(Endpoint::DateHierarchyTemplates).await?;
        Ok(Vec::new())
    }

    async fn get_entitlements(&self) -> Result<Entitlements, BackendError> {
        self.enter(Endpoint::Entitlements).await?;
        Ok(Entitlements::default())
    }

    async fn get_permissions(&self, _: &str) -> Result<Permissions, BackendError> {
        self.enter(Endpoint::Permissions).await?;
        Ok(Permissions {
            can_edit_dashboard: true,
            ..Default::default()
        })
    }

    async fn count_notification_channels(&self) -> Result<u32, BackendError> {
        self.enter(Endpoint::NotificationChannels).await?;
        Ok(2)
    }

    async fn count_webhooks(&self) -> Result<u32, BackendError> {
        self.enter(Endpoint::Webhooks).await?;
        Ok(1)
    }

    async fn count_automations(&self, _: &str) -> Result<u32, BackendError> {
        self.enter(Endpoint::Automations).await?;
        Ok(3)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn context(
    backend: Arc<RecordingBackend>,
    dashboard_ref: Option<ObjRef>,
    config: DashboardConfig,
) -> Arc<DashboardContext> {
    Arc::new(DashboardContext::new(backend, "ws", dashboard_ref, config))
}

pub fn null_context() -> Arc<DashboardContext> {
    context(Arc::new(RecordingBackend::new()), None, DashboardConfig::default())
}

pub fn insight_widget(widget_id: &str, insight_id: &str) -> Widget {
    Widget::Insight(InsightWidget {
        widget_ref: ObjRef::id(widget_id),
        insight: ObjRef::typed(insight_id, "insight"),
        title: format!("Widget {widget_id}"),
        date_data_set: None,
        ignore_dashboard_filters: Vec::new(),
        properties: None,
    })
}

pub fn insight(insight_id: &str) -> Insight {
    Insight {
        insight_ref: ObjRef::typed(insight_id, "insight"),
        title: format!("Insight {insight_id}"),
        visualization_url: "local:bar".into(),
    }
}

/// One section with two insight widgets, a common date filter and one
/// attribute filter.
pub fn sample_dashboard(id: &str) -> DashboardDocument {
    let section = DashboardLayoutSection::new(
        Some(SectionHeader {
            title: Some("Overview".into()),
            description: None,
        }),
        vec![
            DashboardLayoutItem::new(insight_widget("w1", "i1"), 6),
            DashboardLayoutItem::new(insight_widget("w2", "i2"), 6),
        ],
    );
    let mut common = DashboardDateFilter::all_time(None, None);
    common.granularity = DateFilterGranularity::Month;
    common.from = Some(DateBound::Offset(-11));
    common.to = Some(DateBound::Offset(0));

    DashboardDocument {
        dashboard_ref: Some(ObjRef::typed(id, "analyticalDashboard")),
        title: format!("Dashboard {id}"),
        description: None,
        layout: DashboardLayout {
            sections: vec![section],
            ..Default::default()
        },
        filter_context: vec![
            FilterContextItem::AttributeFilter(DashboardAttributeFilter {
                local_identifier: "f-region".into(),
                display_form: ObjRef::typed("label.region", "displayForm"),
                attribute_elements: AttributeElements::Values(Vec::new()),
                negative_selection: true,
                selection_mode: SelectionMode::Multi,
                title: None,
                filter_elements_by: Vec::new(),
            }),
            FilterContextItem::DateFilter(common),
        ],
        updated: None,
    }
}

pub fn sample_insights() -> Vec<Insight> {
    vec![insight("i1"), insight("i2"), insight("i3")]
}
