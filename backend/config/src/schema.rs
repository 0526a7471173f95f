//! Dashboard configuration schema.
//!
//! Every field is optional in the file; `apply_all_defaults` fills the gaps so
//! the resolved config held by a session is explicit.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for one dashboard session.
///
/// The same type doubles as the override set passed with `InitializeDashboard`:
/// only the `Some` fields of an override replace the loaded values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// UI locale, e.g. `en-US`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// When set, every editing command is rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read_only: Option<bool>,

    /// Dashboard is hosted inside another application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_embedded: Option<bool>,

    /// Date filter presentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filter_config: Option<DateFilterConfig>,

    /// Feature flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<FeatureFlags>,

    /// Upper bound of automations a workspace may hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_automations_count: Option<u32>,

    /// Command bus queueing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandQueueConfig>,
}

impl DashboardConfig {
    /// Overlay `overrides` on top of `self`; `Some` fields win.
    pub fn merged_with(&self, overrides: &DashboardConfig) -> DashboardConfig {
        let settings = match (&self.settings, &overrides.settings) {
            (Some(base), Some(over)) => Some(base.merged_with(over)),
            (base, over) => over.clone().or_else(|| base.clone()),
        };
        DashboardConfig {
            locale: overrides.locale.clone().or_else(|| self.locale.clone()),
            is_read_only: overrides.is_read_only.or(self.is_read_only),
            is_embedded: overrides.is_embedded.or(self.is_embedded),
            date_filter_config: overrides
                .date_filter_config
                .clone()
                .or_else(|| self.date_filter_config.clone()),
            settings,
            max_automations_count: overrides.max_automations_count.or(self.max_automations_count),
            commands: overrides.commands.clone().or_else(|| self.commands.clone()),
        }
    }

    pub fn read_only(&self) -> bool {
        self.is_read_only.unwrap_or(false)
    }

    pub fn flags(&self) -> FeatureFlags {
        self.settings.clone().unwrap_or_default()
    }

    pub fn serialize_widget_commands(&self) -> bool {
        self.commands
            .as_ref()
            .and_then(|c| c.serialize_widget_commands)
            .unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// Date filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilterConfigMode {
    #[default]
    Active,
    Readonly,
    Hidden,
}

impl std::fmt::Display for DateFilterConfigMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DateFilterConfigMode::Active => "active",
            DateFilterConfigMode::Readonly => "readonly",
            DateFilterConfigMode::Hidden => "hidden",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DateFilterConfigMode>,
    /// Custom title shown instead of "Date range"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_name: Option<String>,
    /// Local ids of preset options to hide
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hide_options: Vec<String>,
}

// ---------------------------------------------------------------------------
// Feature flags
// ---------------------------------------------------------------------------

/// Feature flags consulted by command handlers to skip loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_alerting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_scheduling: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_filter_views: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_notification_channels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_webhooks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_automations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_date_hierarchies: Option<bool>,
}

impl FeatureFlags {
    fn merged_with(&self, over: &FeatureFlags) -> FeatureFlags {
        FeatureFlags {
            enable_alerting: over.enable_alerting.or(self.enable_alerting),
            enable_scheduling: over.enable_scheduling.or(self.enable_scheduling),
            enable_filter_views: over.enable_filter_views.or(self.enable_filter_views),
            enable_notification_channels: over
                .enable_notification_channels
                .or(self.enable_notification_channels),
            enable_webhooks: over.enable_webhooks.or(self.enable_webhooks),
            enable_automations: over.enable_automations.or(self.enable_automations),
            enable_date_hierarchies: over.enable_date_hierarchies.or(self.enable_date_hierarchies),
        }
    }

    pub fn alerting(&self) -> bool {
        self.enable_alerting.unwrap_or(true)
    }
    pub fn scheduling(&self) -> bool {
        self.enable_scheduling.unwrap_or(true)
    }
    pub fn filter_views(&self) -> bool {
        self.enable_filter_views.unwrap_or(true)
    }
    pub fn notification_channels(&self) -> bool {
        self.enable_notification_channels.unwrap_or(false)
    }
    pub fn webhooks(&self) -> bool {
        self.enable_webhooks.unwrap_or(false)
    }
    pub fn automations(&self) -> bool {
        self.enable_automations.unwrap_or(true)
    }
    pub fn date_hierarchies(&self) -> bool {
        self.enable_date_hierarchies.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Command queue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandQueueConfig {
    /// Run commands targeting the same widget in submission order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialize_widget_commands: Option<bool>,
    /// Buffer of each serialized queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_buffer: Option<usize>,
    /// Capacity of the async event feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_feed_capacity: Option<usize>,
}
