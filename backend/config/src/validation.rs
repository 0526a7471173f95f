//! Config validation: collects every problem in one pass.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::{DashboardConfig, DateFilterConfigMode};

static LOCALE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[A-Z]{2})?$").expect("locale pattern is a valid regex"));

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &DashboardConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_locale(config, &mut report);
    validate_date_filter(config, &mut report);
    validate_automations(config, &mut report);
    validate_queue(config, &mut report);
    report
}

fn validate_locale(config: &DashboardConfig, report: &mut ValidationReport) {
    let Some(locale) = &config.locale else { return };
    if !LOCALE_PATTERN.is_match(locale) {
        report.warn("locale", format!("'{locale}' is not a language-REGION tag; formatting may fall back to en-US"));
    }
}

fn validate_date_filter(config: &DashboardConfig, report: &mut ValidationReport) {
    let Some(date_filter) = &config.date_filter_config else { return };
    if let Some(name) = &date_filter.filter_name {
        if name.trim().is_empty() {
            report.error("dateFilterConfig.filterName", "Filter name cannot be blank");
        }
    }
    if date_filter.mode == Some(DateFilterConfigMode::Hidden) && !date_filter.hide_options.is_empty() {
        report.warn(
            "dateFilterConfig.hideOptions",
            "Options are hidden on a date filter that is itself hidden",
        );
    }
}

fn validate_automations(config: &DashboardConfig, report: &mut ValidationReport) {
    let automations_on = config.flags().automations();
    if automations_on && config.max_automations_count == Some(0) {
        report.warn(
            "maxAutomationsCount",
            "Automations are enabled but the ceiling is 0; users cannot create any",
        );
    }
}

fn validate_queue(config: &DashboardConfig, report: &mut ValidationReport) {
    let Some(commands) = &config.commands else { return };
    if commands.queue_buffer == Some(0) {
        report.error("commands.queueBuffer", "Queue buffer must be at least 1");
    }
    if commands.event_feed_capacity == Some(0) {
        report.error("commands.eventFeedCapacity", "Event feed capacity must be at least 1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CommandQueueConfig, DateFilterConfig, FeatureFlags};

    #[test]
    fn test_default_config_is_valid() {
        let report = validate(&crate::apply_all_defaults(DashboardConfig::default()));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_blank_filter_name_is_error() {
        let config = DashboardConfig {
            date_filter_config: Some(DateFilterConfig {
                filter_name: Some("  ".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "dateFilterConfig.filterName");
    }

    #[test]
    fn test_zero_queue_buffer_is_error() {
        let config = DashboardConfig {
            commands: Some(CommandQueueConfig {
                queue_buffer: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!validate(&config).is_valid());
    }

    #[test]
    fn test_odd_locale_and_zero_automations_warn() {
        let config = DashboardConfig {
            locale: Some("english".into()),
            max_automations_count: Some(0),
            settings: Some(FeatureFlags {
                enable_automations: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }
}
