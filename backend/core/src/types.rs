use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refs::ObjRef;

// ---------------------------------------------------------------------------
// Screen sizes
// ---------------------------------------------------------------------------

/// Named layout breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenSize {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScreenSize::Xs => "xs",
            ScreenSize::Sm => "sm",
            ScreenSize::Md => "md",
            ScreenSize::Lg => "lg",
            ScreenSize::Xl => "xl",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilterType {
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFilterGranularity {
    #[serde(rename = "GDC.time.date")]
    Date,
    #[serde(rename = "GDC.time.week_us")]
    Week,
    #[serde(rename = "GDC.time.month")]
    Month,
    #[serde(rename = "GDC.time.quarter")]
    Quarter,
    #[serde(rename = "GDC.time.year")]
    Year,
}

/// A date bound: an offset for relative filters, a formatted date for absolute ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateBound {
    Offset(i32),
    Date(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDateFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_identifier: Option<String>,
    /// Absent for the common date filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<ObjRef>,
    #[serde(rename = "type")]
    pub filter_type: DateFilterType,
    pub granularity: DateFilterGranularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateBound>,
}

impl DashboardDateFilter {
    pub fn all_time(data_set: Option<ObjRef>, local_identifier: Option<String>) -> Self {
        Self {
            local_identifier,
            data_set,
            filter_type: DateFilterType::Relative,
            granularity: DateFilterGranularity::Date,
            from: None,
            to: None,
        }
    }

    pub fn is_common(&self) -> bool {
        self.data_set.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeElements {
    Uris(Vec<String>),
    Values(Vec<String>),
}

impl AttributeElements {
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeElements::Uris(v) | AttributeElements::Values(v) => v.is_empty(),
        }
    }

    /// An empty selection of the same flavour.
    pub fn cleared(&self) -> Self {
        match self {
            AttributeElements::Uris(_) => AttributeElements::Uris(Vec::new()),
            AttributeElements::Values(_) => AttributeElements::Values(Vec::new()),
        }
    }
}

impl Default for AttributeElements {
    fn default() -> Self {
        AttributeElements::Uris(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAttributeFilter {
    pub local_identifier: String,
    pub display_form: ObjRef,
    pub attribute_elements: AttributeElements,
    pub negative_selection: bool,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_elements_by: Vec<AttributeFilterParent>,
}

/// Link from a child attribute filter to its parent. The child offers only
/// elements related to the parent's selection over `over.attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilterParent {
    pub filter_local_identifier: String,
    #[serde(default)]
    pub over: ParentOver,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentOver {
    pub attributes: Vec<ObjRef>,
}

/// One entry of a dashboard's filter context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterContextItem {
    DateFilter(DashboardDateFilter),
    AttributeFilter(DashboardAttributeFilter),
}

impl FilterContextItem {
    pub fn as_date_filter(&self) -> Option<&DashboardDateFilter> {
        match self {
            FilterContextItem::DateFilter(f) => Some(f),
            FilterContextItem::AttributeFilter(_) => None,
        }
    }

    pub fn as_attribute_filter(&self) -> Option<&DashboardAttributeFilter> {
        match self {
            FilterContextItem::AttributeFilter(f) => Some(f),
            FilterContextItem::DateFilter(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout (interchange shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutKind {
    #[default]
    IDashboardLayout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    #[default]
    IDashboardLayoutSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    IDashboardLayoutItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayout {
    #[serde(rename = "type")]
    pub kind: LayoutKind,
    pub sections: Vec<DashboardLayoutSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayoutSection {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<SectionHeader>,
    pub items: Vec<DashboardLayoutItem>,
}

impl DashboardLayoutSection {
    pub fn new(header: Option<SectionHeader>, items: Vec<DashboardLayoutItem>) -> Self {
        Self {
            kind: SectionKind::IDashboardLayoutSection,
            header,
            items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSize {
    pub grid_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayoutItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub size: BTreeMap<ScreenSize, GridSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
}

impl DashboardLayoutItem {
    pub fn new(widget: Widget, xl_width: u32) -> Self {
        let mut size = BTreeMap::new();
        size.insert(
            ScreenSize::Xl,
            GridSize {
                grid_width: xl_width,
                grid_height: None,
            },
        );
        Self {
            kind: ItemKind::IDashboardLayoutItem,
            size,
            widget: Some(widget),
        }
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Widget {
    Insight(InsightWidget),
    Kpi(KpiWidget),
    RichText(RichTextWidget),
    VisualizationSwitcher(VisualizationSwitcherWidget),
}

impl Widget {
    pub fn widget_ref(&self) -> &ObjRef {
        match self {
            Widget::Insight(w) => &w.widget_ref,
            Widget::Kpi(w) => &w.widget_ref,
            Widget::RichText(w) => &w.widget_ref,
            Widget::VisualizationSwitcher(w) => &w.widget_ref,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Widget::Insight(w) => &w.title,
            Widget::Kpi(w) => &w.title,
            Widget::RichText(w) => &w.title,
            Widget::VisualizationSwitcher(w) => &w.title,
        }
    }

    pub fn set_title(&mut self, title: String) {
        match self {
            Widget::Insight(w) => w.title = title,
            Widget::Kpi(w) => w.title = title,
            Widget::RichText(w) => w.title = title,
            Widget::VisualizationSwitcher(w) => w.title = title,
        }
    }

    /// Insights this widget needs resolved before it can render.
    pub fn insight_refs(&self) -> Vec<&ObjRef> {
        match self {
            Widget::Insight(w) => vec![&w.insight],
            Widget::VisualizationSwitcher(w) => w.visualizations.iter().map(|v| &v.insight).collect(),
            Widget::Kpi(_) | Widget::RichText(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightWidget {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    pub insight: ObjRef,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_data_set: Option<ObjRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_dashboard_filters: Vec<ObjRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiWidget {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    pub measure: ObjRef,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextWidget {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    #[serde(default)]
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationSwitcherWidget {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    #[serde(default)]
    pub title: String,
    pub visualizations: Vec<InsightWidget>,
}

// ---------------------------------------------------------------------------
// Backend metadata
// ---------------------------------------------------------------------------

/// A persisted dashboard as the backend returns and accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub dashboard_ref: Option<ObjRef>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub layout: DashboardLayout,
    #[serde(default)]
    pub filter_context: Vec<FilterContextItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    #[serde(rename = "ref")]
    pub dashboard_ref: ObjRef,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(rename = "ref")]
    pub insight_ref: ObjRef,
    pub title: String,
    pub visualization_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "ref")]
    pub alert_ref: ObjRef,
    pub widget: ObjRef,
    pub threshold: f64,
    #[serde(default)]
    pub is_triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterView {
    #[serde(rename = "ref")]
    pub view_ref: ObjRef,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    pub filter_context: Vec<FilterContextItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateHierarchyTemplate {
    #[serde(rename = "ref")]
    pub template_ref: ObjRef,
    pub title: String,
    pub granularities: Vec<DateFilterGranularity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements(pub Vec<Entitlement>);

impl Entitlements {
    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub can_edit_dashboard: bool,
    #[serde(default)]
    pub can_share_dashboard: bool,
    #[serde(default)]
    pub can_create_automation: bool,
    #[serde(default)]
    pub can_export: bool,
}

// ---------------------------------------------------------------------------
// Widget-reported results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub widget_ref: ObjRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillTargets {
    pub widget_ref: ObjRef,
    /// Local ids of measures/attributes the widget can drill from.
    pub available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub widget_ref: ObjRef,
    pub horizon: u32,
    pub points: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDriver {
    pub label: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDriverAnalysisResult {
    pub widget_ref: ObjRef,
    pub metric: ObjRef,
    pub drivers: Vec<KeyDriver>,
}
