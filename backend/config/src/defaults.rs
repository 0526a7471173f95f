//! Config defaults: fills every unset field of a loaded config.

use crate::schema::{
    CommandQueueConfig, DashboardConfig, DateFilterConfig, DateFilterConfigMode, FeatureFlags,
};

/// Locale used when none is configured.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Default automations ceiling per workspace.
pub const DEFAULT_MAX_AUTOMATIONS: u32 = 10;

/// Default buffer of a serialized command queue.
pub const DEFAULT_QUEUE_BUFFER: usize = 64;

/// Default capacity of the async event feed.
pub const DEFAULT_EVENT_FEED_CAPACITY: usize = 256;

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: DashboardConfig) -> DashboardConfig {
    let config = apply_general_defaults(config);
    let config = apply_date_filter_defaults(config);
    let config = apply_flag_defaults(config);
    apply_queue_defaults(config)
}

fn apply_general_defaults(mut config: DashboardConfig) -> DashboardConfig {
    config.locale.get_or_insert_with(|| DEFAULT_LOCALE.to_string());
    config.is_read_only.get_or_insert(false);
    config.is_embedded.get_or_insert(false);
    config.max_automations_count.get_or_insert(DEFAULT_MAX_AUTOMATIONS);
    config
}

fn apply_date_filter_defaults(mut config: DashboardConfig) -> DashboardConfig {
    let date_filter = config.date_filter_config.get_or_insert_with(DateFilterConfig::default);
    date_filter.mode.get_or_insert(DateFilterConfigMode::Active);
    config
}

/// Materialize every flag so the resolved config is explicit about each load it gates.
fn apply_flag_defaults(mut config: DashboardConfig) -> DashboardConfig {
    let flags = config.settings.get_or_insert_with(FeatureFlags::default);
    let resolved = flags.clone();
    flags.enable_alerting = Some(resolved.alerting());
    flags.enable_scheduling = Some(resolved.scheduling());
    flags.enable_filter_views = Some(resolved.filter_views());
    flags.enable_notification_channels = Some(resolved.notification_channels());
    flags.enable_webhooks = Some(resolved.webhooks());
    flags.enable_automations = Some(resolved.automations());
    flags.enable_date_hierarchies = Some(resolved.date_hierarchies());
    config
}

fn apply_queue_defaults(mut config: DashboardConfig) -> DashboardConfig {
    let commands = config.commands.get_or_insert_with(CommandQueueConfig::default);
    commands.serialize_widget_commands.get_or_insert(true);
    commands.queue_buffer.get_or_insert(DEFAULT_QUEUE_BUFFER);
    commands.event_feed_capacity.get_or_insert(DEFAULT_EVENT_FEED_CAPACITY);
    config
}
