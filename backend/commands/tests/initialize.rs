mod common;

use std::sync::Arc;

use tessera_commands::testing::{sample_dashboard, sample_insights, Endpoint, RecordingBackend};
use tessera_config::{DashboardConfig, FeatureFlags};
use tessera_core::{
    Alert, BackendCapabilities, BackendError, CommandError, DashboardCommand, EventKind, ObjRef,
};
use tessera_store::slices::lifecycle::LifecycleStatus;

use common::*;

fn alert() -> Alert {
    Alert {
        alert_ref: ObjRef::id("a1"),
        widget: ObjRef::id("w1"),
        threshold: 10.0,
        is_triggered: false,
    }
}

#[tokio::test]
async fn test_without_kpi_support_alerts_are_skipped() {
    let backend = Arc::new(
        RecordingBackend::new()
            .with_capabilities(BackendCapabilities {
                supports_kpi_widget: false,
                ..BackendCapabilities::all()
            })
            .with_alerts(vec![alert()]),
    );
    let bus = bus_with(Arc::clone(&backend), None, DashboardConfig::default());
    let events = record(&bus);

    initialize(&bus).await;

    let state = bus.store().state();
    assert_eq!(state.lifecycle.status, LifecycleStatus::Ready);
    assert!(state.alerts.is_loaded());
    assert!(state.alerts().is_empty());
    assert_eq!(backend.calls(Endpoint::Alerts), 0);
    assert_eq!(backend.calls(Endpoint::Dashboard), 0);
    assert!(kinds(&events.lock()).contains(&EventKind::DashboardInitialized));
}

#[tokio::test]
async fn test_loads_document_and_optional_data() {
    let backend = Arc::new(
        RecordingBackend::new()
            .with_capabilities(BackendCapabilities::all())
            .with_dashboard(sample_dashboard("d1"))
            .with_insights(sample_insights())
            .with_alerts(vec![alert()]),
    );
    let bus = bus_with(Arc::clone(&backend), Some(dashboard_ref("d1")), DashboardConfig::default());
    initialize(&bus).await;

    let state = bus.store().state();
    assert_eq!(state.lifecycle.title, "Dashboard d1");
    assert_eq!(state.layout.layout.sections.len(), 1);
    assert_eq!(state.insights.by_ref.len(), 2);
    assert_eq!(state.alerts().len(), 1);
    // common date filter is moved to the front
    assert!(state.filter_context.filters[0]
        .as_date_filter()
        .is_some_and(|d| d.is_common()));

    // automations are on by default; channels, webhooks and hierarchies are not
    assert_eq!(state.lifecycle.counts.automations, 3);
    assert_eq!(state.lifecycle.counts.notification_channels, 0);
    assert_eq!(backend.calls(Endpoint::NotificationChannels), 0);
    assert_eq!(backend.calls(Endpoint::Webhooks), 0);
    assert_eq!(backend.calls(Endpoint::DateHierarchyTemplates), 0);
    assert_eq!(backend.calls(Endpoint::FilterViews), 1);
    assert_eq!(backend.calls(Endpoint::Insights), 1);
}

#[tokio::test]
async fn test_feature_flags_enable_integration_counts() {
    let backend = Arc::new(RecordingBackend::new().with_capabilities(BackendCapabilities::all()));
    let config = DashboardConfig {
        settings: Some(FeatureFlags {
            enable_notification_channels: Some(true),
            enable_webhooks: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    let bus = bus_with(Arc::clone(&backend), None, config);
    initialize(&bus).await;

    let counts = bus.store().select(|s| s.lifecycle.counts);
    assert_eq!(counts.notification_channels, 2);
    assert_eq!(counts.webhooks, 1);
}

#[tokio::test]
async fn test_mandatory_failure_moves_to_error() {
    let backend = Arc::new(
        sample_backend().failing(Endpoint::Permissions, BackendError::new("denied").with_status(403)),
    );
    let bus = bus_with(backend, Some(dashboard_ref("d1")), DashboardConfig::default());
    let events = record(&bus);

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::InitializeDashboard {
            dashboard_ref: None,
            config: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Backend(ref e) if e.status == Some(403)));

    let state = bus.store().state();
    assert_eq!(state.lifecycle.status, LifecycleStatus::Error);
    assert!(kinds(&events.lock()).contains(&EventKind::DashboardInitializationFailed));

    // error is terminal
    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::SetScreenSize {
            screen_size: tessera_core::ScreenSize::Xs,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidState { ref state, .. } if state == "error"));
}

#[tokio::test]
async fn test_missing_dashboard_is_fatal() {
    let bus = bus_with(Arc::new(sample_backend()), Some(dashboard_ref("nope")), DashboardConfig::default());
    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::InitializeDashboard {
            dashboard_ref: None,
            config: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Backend(ref e) if e.is_not_found()));
}

#[tokio::test]
async fn test_soft_failure_defaults_to_empty() {
    let backend = Arc::new(
        sample_backend()
            .with_capabilities(BackendCapabilities::all())
            .with_alerts(vec![alert()])
            .failing(Endpoint::Alerts, BackendError::new("boom").with_status(500))
            .failing(Endpoint::AccessibleDashboards, BackendError::new("boom")),
    );
    let bus = bus_with(Arc::clone(&backend), Some(dashboard_ref("d1")), DashboardConfig::default());
    initialize(&bus).await;

    let state = bus.store().state();
    assert_eq!(state.lifecycle.status, LifecycleStatus::Ready);
    assert!(state.alerts().is_empty());
    assert!(state.lifecycle.accessible_dashboards.is_empty());
    assert_eq!(backend.calls(Endpoint::Alerts), 1);
}

#[tokio::test]
async fn test_command_overrides_ref_and_config() {
    let backend = Arc::new(
        RecordingBackend::new()
            .with_dashboard(sample_dashboard("d2"))
            .with_insights(sample_insights()),
    );
    let bus = bus_with(backend, None, DashboardConfig::default());
    bus.dispatch_and_wait(envelope(DashboardCommand::InitializeDashboard {
        dashboard_ref: Some(dashboard_ref("d2")),
        config: Some(DashboardConfig {
            is_read_only: Some(true),
            ..Default::default()
        }),
    }))
    .await
    .unwrap();

    let state = bus.store().state();
    assert_eq!(state.lifecycle.dashboard_ref, Some(dashboard_ref("d2")));
    assert!(state.is_read_only());
}

#[tokio::test]
async fn test_superseded_initialization_commits_nothing() {
    let mut backend = sample_backend();
    let gate = backend.gate(Endpoint::Dashboard);
    let backend = Arc::new(backend);
    let bus = bus_with(Arc::clone(&backend), Some(dashboard_ref("d1")), DashboardConfig::default());

    let init = || {
        envelope(DashboardCommand::InitializeDashboard {
            dashboard_ref: None,
            config: None,
        })
    };
    let first = bus.dispatch(init());
    backend.wait_for_calls(Endpoint::Dashboard, 1).await;
    let second = bus.dispatch(init());
    backend.wait_for_calls(Endpoint::Dashboard, 2).await;

    gate.notify_one();
    gate.notify_one();

    assert_eq!(first.wait().await.unwrap_err(), CommandError::Cancelled);
    second.wait().await.unwrap();
    let lifecycle = bus.store().select(|s| Arc::clone(&s.lifecycle));
    assert_eq!(lifecycle.status, LifecycleStatus::Ready);
    assert_eq!(lifecycle.generation, 2);
}
