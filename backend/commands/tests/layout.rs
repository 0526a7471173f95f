mod common;

use tessera_commands::testing::insight_widget;
use tessera_core::{
    CommandError, DashboardCommand, DashboardLayout, DashboardLayoutItem, DrillTargets, EventKind,
    ExecutionResult, ItemDefinition, ObjRef, SectionHeader,
};
use tessera_store::slices::layout::LayoutAction;
use tessera_store::slices::{keyed, layout};
use tessera_store::DashboardStore;

use common::*;

fn item(widget: &str, insight: &str) -> ItemDefinition {
    ItemDefinition::Item(DashboardLayoutItem::new(insight_widget(widget, insight), 4))
}

#[tokio::test]
async fn test_add_section_loads_missing_insights() {
    let (bus, backend) = ready_bus().await;
    let before = backend.calls(tessera_commands::testing::Endpoint::Insights);

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::AddLayoutSection {
            index: -1,
            initial_header: Some(SectionHeader {
                title: Some("More".into()),
                description: None,
            }),
            initial_items: vec![item("w3", "i3")],
        }))
        .await
        .unwrap();

    assert_eq!(kinds(&events), vec![EventKind::LayoutSectionAdded]);
    assert_eq!(backend.calls(tessera_commands::testing::Endpoint::Insights), before + 1);
    let state = bus.store().state();
    assert_eq!(state.layout.layout.sections.len(), 2);
    assert!(bus.store().selectors().missing_insights(&state).is_empty());
}

#[tokio::test]
async fn test_unknown_insight_rejects_section() {
    let (bus, _) = ready_bus().await;
    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::AddLayoutSection {
            index: -1,
            initial_header: None,
            initial_items: vec![item("w9", "i-missing")],
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    assert_eq!(bus.store().select(|s| s.layout.layout.sections.len()), 1);
}

#[tokio::test]
async fn test_stash_round_trip_and_undo() {
    let (bus, _) = ready_bus().await;

    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveSectionItem {
        section_index: 0,
        item_index: 0,
        stash_identifier: Some("s1".into()),
        eager: false,
    }))
    .await
    .unwrap();
    assert_eq!(bus.store().select(|s| s.layout.layout.sections[0].items.len()), 1);

    bus.dispatch_and_wait(envelope(DashboardCommand::AddSectionItems {
        section_index: 0,
        item_index: -1,
        items: vec![ItemDefinition::Stashed("s1".into())],
    }))
    .await
    .unwrap();
    let state = bus.store().state();
    assert_eq!(state.layout.layout.sections[0].items.len(), 2);
    assert!(layout::stashed_items(&state.layout, "s1").is_none());

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::UndoLayoutChanges {}))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::LayoutChanged]);
    assert_eq!(bus.store().select(|s| s.layout.layout.sections[0].items.len()), 1);
}

#[tokio::test]
async fn test_eager_removal_drops_empty_section() {
    let (bus, _) = ready_bus().await;
    for _ in 0..2 {
        bus.dispatch_and_wait(envelope(DashboardCommand::RemoveSectionItem {
            section_index: 0,
            item_index: 0,
            stash_identifier: None,
            eager: true,
        }))
        .await
        .unwrap();
    }
    assert!(bus.store().select(|s| s.layout.layout.sections.is_empty()));
}

#[tokio::test]
async fn test_widget_header_change() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeWidgetHeader {
        widget_ref: ObjRef::id("w2"),
        title: "Revenue".into(),
    }))
    .await
    .unwrap();
    let title = bus.store().select(|s| {
        layout::find_widget(&s.layout, &ObjRef::id("w2")).map(|w| w.title().to_string())
    });
    assert_eq!(title.as_deref(), Some("Revenue"));

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::ChangeWidgetHeader {
            widget_ref: ObjRef::id("ghost"),
            title: "x".into(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
}

#[tokio::test]
async fn test_layout_survives_serialization_into_fresh_store() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::MoveLayoutSection {
        section_index: 0,
        to_index: 0,
    }))
    .await
    .unwrap();
    let original = bus.store().select(|s| s.layout.layout.clone());

    let json = serde_json::to_string(&original).unwrap();
    let decoded: DashboardLayout = serde_json::from_str(&json).unwrap();
    let fresh = DashboardStore::new();
    fresh.dispatch(LayoutAction::SetLayout(decoded).into()).unwrap();

    assert_eq!(fresh.select(|s| s.layout.layout.clone()), original);
}

fn widget_ids(bus: &tessera_commands::CommandBus, section: usize) -> Vec<String> {
    bus.store().select(|s| {
        s.layout.layout.sections[section]
            .items
            .iter()
            .filter_map(|i| i.widget.as_ref())
            .map(|w| w.widget_ref().to_string())
            .collect()
    })
}

async fn report_results(bus: &tessera_commands::CommandBus, widget: &str) {
    bus.dispatch_and_wait(envelope(DashboardCommand::UpsertExecutionResult {
        result: ExecutionResult {
            widget_ref: ObjRef::id(widget),
            execution_id: None,
            is_loading: false,
            row_count: Some(3),
            error: None,
        },
    }))
    .await
    .unwrap();
    bus.dispatch_and_wait(envelope(DashboardCommand::AddDrillTargets {
        targets: DrillTargets {
            widget_ref: ObjRef::id(widget),
            available: vec!["drillDown".into()],
        },
    }))
    .await
    .unwrap();
}

fn has_results(bus: &tessera_commands::CommandBus, widget: &str) -> bool {
    bus.store().select(|s| {
        keyed::get(&s.execution_results, &ObjRef::id(widget)).is_some()
            || keyed::get(&s.drill_targets, &ObjRef::id(widget)).is_some()
    })
}

#[tokio::test]
async fn test_removed_widget_results_are_dropped() {
    let (bus, _) = ready_bus().await;
    report_results(&bus, "w1").await;
    report_results(&bus, "w2").await;

    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveSectionItem {
        section_index: 0,
        item_index: 0,
        stash_identifier: None,
        eager: false,
    }))
    .await
    .unwrap();
    assert!(!has_results(&bus, "w1"));
    assert!(has_results(&bus, "w2"));

    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveLayoutSection {
        index: 0,
        stash_identifier: None,
    }))
    .await
    .unwrap();
    assert!(!has_results(&bus, "w2"));
}

#[tokio::test]
async fn test_stashed_widget_keeps_results() {
    let (bus, _) = ready_bus().await;
    report_results(&bus, "w1").await;

    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveLayoutSection {
        index: 0,
        stash_identifier: Some("s1".into()),
    }))
    .await
    .unwrap();
    assert!(has_results(&bus, "w1"));
}

#[tokio::test]
async fn test_change_section_header_merges() {
    let (bus, _) = ready_bus().await;
    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::ChangeLayoutSectionHeader {
            index: 0,
            header: SectionHeader {
                title: None,
                description: Some("Key numbers".into()),
            },
            merge: true,
        }))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::LayoutSectionHeaderChanged]);
    let header = bus.store().select(|s| s.layout.layout.sections[0].header.clone()).unwrap();
    assert_eq!(header.title.as_deref(), Some("Overview"));
    assert_eq!(header.description.as_deref(), Some("Key numbers"));
}

#[tokio::test]
async fn test_move_item_between_sections_and_undo() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::AddLayoutSection {
        index: -1,
        initial_header: None,
        initial_items: vec![],
    }))
    .await
    .unwrap();

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::MoveSectionItem {
            section_index: 0,
            item_index: 0,
            to_section_index: 1,
            to_item_index: -1,
        }))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::LayoutSectionItemMoved]);
    assert_eq!(widget_ids(&bus, 0), vec!["w2"]);
    assert_eq!(widget_ids(&bus, 1), vec!["w1"]);

    bus.dispatch_and_wait(envelope(DashboardCommand::UndoLayoutChanges {}))
        .await
        .unwrap();
    assert_eq!(widget_ids(&bus, 0), vec!["w1", "w2"]);

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::MoveSectionItem {
            section_index: 0,
            item_index: 0,
            to_section_index: 7,
            to_item_index: 0,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    assert_eq!(widget_ids(&bus, 0), vec!["w1", "w2"]);
}

#[tokio::test]
async fn test_replace_item_swaps_widget_and_drops_old_results() {
    let (bus, _) = ready_bus().await;
    report_results(&bus, "w1").await;

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::ReplaceSectionItem {
            section_index: 0,
            item_index: 0,
            item: item("w3", "i1"),
            stash_identifier: None,
        }))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::LayoutSectionItemReplaced]);
    assert_eq!(widget_ids(&bus, 0), vec!["w3", "w2"]);
    assert!(!has_results(&bus, "w1"));
}

#[tokio::test]
async fn test_replace_item_into_stash() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::ReplaceSectionItem {
        section_index: 0,
        item_index: -1,
        item: item("w3", "i1"),
        stash_identifier: Some("old".into()),
    }))
    .await
    .unwrap();
    let state = bus.store().state();
    let stashed = layout::stashed_items(&state.layout, "old").unwrap();
    assert_eq!(stashed[0].widget.as_ref().map(|w| w.widget_ref().clone()), Some(ObjRef::id("w2")));

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::ReplaceSectionItem {
            section_index: 0,
            item_index: 5,
            item: item("w4", "i1"),
            stash_identifier: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
}
