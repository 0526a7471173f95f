mod common;

use proptest::prelude::*;
use tessera_core::{
    AttributeElements, AttributeSelectionType, CommandError, DashboardCommand, DateBound,
    AttributeFilterParent, DateFilterGranularity, DateFilterSelection, DateFilterType, EventKind,
    FilterSelection, ObjRef, SelectionMode,
};
use tessera_store::slices::filter_context;

use common::*;

fn data_set(id: &str) -> ObjRef {
    ObjRef::typed(id, "dataSet")
}

fn add_attribute_filter(display_form: &str, mode: SelectionMode) -> DashboardCommand {
    DashboardCommand::AddAttributeFilter {
        display_form: ObjRef::typed(display_form, "displayForm"),
        index: -1,
        initial_selection: None,
        initial_is_negative_selection: false,
        selection_mode: mode,
        title: None,
    }
}

#[tokio::test]
async fn test_add_and_change_date_filter() {
    let (bus, _) = ready_bus().await;

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::AddDateFilter {
            data_set: data_set("dt.created"),
            index: 0,
        }))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::DateFilterAdded]);

    let last_quarter = DateFilterSelection {
        filter_type: DateFilterType::Relative,
        granularity: DateFilterGranularity::Quarter,
        from: Some(DateBound::Offset(-1)),
        to: Some(DateBound::Offset(-1)),
    };
    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeDateFilterSelection {
        data_set: Some(data_set("dt.created")),
        selection: last_quarter,
    }))
    .await
    .unwrap();

    let filter = bus
        .store()
        .select(|s| filter_context::find_date_filter(&s.filter_context, &data_set("dt.created")).cloned())
        .unwrap();
    assert_eq!(filter.granularity, DateFilterGranularity::Quarter);
}

#[tokio::test]
async fn test_all_time_on_common_filter_removes_it() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeDateFilterSelection {
        data_set: None,
        selection: DateFilterSelection::all_time(),
    }))
    .await
    .unwrap();
    assert!(bus
        .store()
        .select(|s| filter_context::common_date_filter(&s.filter_context).is_none()));
}

#[tokio::test]
async fn test_duplicate_date_filter_is_rejected_without_mutation() {
    let (bus, _) = ready_bus().await;
    let add = || {
        envelope(DashboardCommand::AddDateFilter {
            data_set: data_set("dt.closed"),
            index: -1,
        })
    };
    bus.dispatch_and_wait(add()).await.unwrap();
    let before = bus.store().state();

    let err = bus.dispatch_and_wait(add()).await.unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    assert_eq!(*bus.store().state().filter_context, *before.filter_context);
}

#[tokio::test]
async fn test_attribute_filter_selection_and_move() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(add_attribute_filter("label.product", SelectionMode::Single)))
        .await
        .unwrap();
    let product = bus.store().select(|s| {
        filter_context::attribute_filters(&s.filter_context)
            .into_iter()
            .find(|f| f.display_form == ObjRef::typed("label.product", "displayForm"))
            .unwrap()
    });
    assert!(product.negative_selection);

    let two = AttributeElements::Values(vec!["a".into(), "b".into()]);
    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::ChangeAttributeFilterSelection {
            filter_local_id: product.local_identifier.clone(),
            elements: two,
            selection_type: AttributeSelectionType::In,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));

    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeAttributeFilterSelection {
        filter_local_id: product.local_identifier.clone(),
        elements: AttributeElements::Values(vec!["a".into()]),
        selection_type: AttributeSelectionType::In,
    }))
    .await
    .unwrap();

    bus.dispatch_and_wait(envelope(DashboardCommand::MoveAttributeFilter {
        filter_local_id: product.local_identifier.clone(),
        index: 0,
    }))
    .await
    .unwrap();

    let attrs = bus
        .store()
        .select(|s| filter_context::attribute_filters(&s.filter_context));
    assert_eq!(attrs[0].local_identifier, product.local_identifier);
    assert!(!attrs[0].negative_selection);
}

#[tokio::test]
async fn test_reset_restores_loaded_filters() {
    let (bus, _) = ready_bus().await;
    let original = bus.store().select(|s| s.filter_context.filters.clone());
    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveAttributeFilters {
        filter_local_ids: vec!["f-region".into()],
    }))
    .await
    .unwrap();
    bus.dispatch_and_wait(envelope(DashboardCommand::ResetDashboard {}))
        .await
        .unwrap();
    assert_eq!(bus.store().select(|s| s.filter_context.filters.clone()), original);
}

fn region() -> ObjRef {
    ObjRef::typed("label.region", "displayForm")
}

fn region_filter(bus: &tessera_commands::CommandBus) -> tessera_core::DashboardAttributeFilter {
    bus.store()
        .select(|s| filter_context::find_attribute_filter(&s.filter_context, "f-region").cloned())
        .unwrap()
}

#[tokio::test]
async fn test_filter_context_selection_applies_in_one_step() {
    let (bus, _) = ready_bus().await;
    let versions_before = bus.store().version();
    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::ChangeFilterContextSelection {
            filters: vec![
                FilterSelection::AttributeFilter {
                    display_form: region(),
                    elements: AttributeElements::Values(vec!["East".into()]),
                    selection_type: AttributeSelectionType::In,
                },
                FilterSelection::AttributeFilter {
                    display_form: region(),
                    elements: AttributeElements::Values(vec!["West".into()]),
                    selection_type: AttributeSelectionType::In,
                },
                FilterSelection::AttributeFilter {
                    display_form: ObjRef::typed("label.unknown", "displayForm"),
                    elements: AttributeElements::Values(vec!["x".into()]),
                    selection_type: AttributeSelectionType::In,
                },
                FilterSelection::DateFilter {
                    data_set: None,
                    selection: DateFilterSelection::all_time(),
                },
            ],
            reset_others: false,
        }))
        .await
        .unwrap();

    assert_eq!(kinds(&events), vec![EventKind::FilterContextChanged]);
    assert_eq!(bus.store().version(), versions_before + 1);
    let filter = region_filter(&bus);
    assert_eq!(filter.attribute_elements, AttributeElements::Values(vec!["East".into()]));
    assert!(!filter.negative_selection);
    assert!(bus
        .store()
        .select(|s| filter_context::common_date_filter(&s.filter_context).is_none()));
}

#[tokio::test]
async fn test_filter_context_selection_resets_others() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeAttributeFilterSelection {
        filter_local_id: "f-region".into(),
        elements: AttributeElements::Values(vec!["East".into()]),
        selection_type: AttributeSelectionType::In,
    }))
    .await
    .unwrap();

    bus.dispatch_and_wait(envelope(DashboardCommand::ChangeFilterContextSelection {
        filters: vec![],
        reset_others: true,
    }))
    .await
    .unwrap();

    let filter = region_filter(&bus);
    assert!(filter.attribute_elements.is_empty());
    assert!(filter.negative_selection);
    assert!(bus
        .store()
        .select(|s| filter_context::common_date_filter(&s.filter_context).is_none()));
}

#[tokio::test]
async fn test_filter_context_selection_is_all_or_nothing() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(add_attribute_filter("label.product", SelectionMode::Single)))
        .await
        .unwrap();
    let before = bus.store().select(|s| s.filter_context.filters.clone());

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::ChangeFilterContextSelection {
            filters: vec![
                FilterSelection::AttributeFilter {
                    display_form: region(),
                    elements: AttributeElements::Values(vec!["East".into()]),
                    selection_type: AttributeSelectionType::In,
                },
                FilterSelection::AttributeFilter {
                    display_form: ObjRef::typed("label.product", "displayForm"),
                    elements: AttributeElements::Values(vec!["a".into(), "b".into()]),
                    selection_type: AttributeSelectionType::In,
                },
            ],
            reset_others: false,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    assert_eq!(bus.store().select(|s| s.filter_context.filters.clone()), before);
}

#[tokio::test]
async fn test_attribute_filter_parent_links() {
    let (bus, _) = ready_bus().await;
    bus.dispatch_and_wait(envelope(add_attribute_filter("label.city", SelectionMode::Multi)))
        .await
        .unwrap();
    let city = bus.store().select(|s| {
        filter_context::attribute_filters(&s.filter_context)
            .into_iter()
            .find(|f| f.display_form == ObjRef::typed("label.city", "displayForm"))
            .unwrap()
    });
    let parent = AttributeFilterParent {
        filter_local_identifier: "f-region".into(),
        over: Default::default(),
    };

    let events = bus
        .dispatch_and_wait(envelope(DashboardCommand::SetAttributeFilterParent {
            filter_local_id: city.local_identifier.clone(),
            parent_filters: vec![parent.clone()],
        }))
        .await
        .unwrap();
    assert_eq!(kinds(&events), vec![EventKind::AttributeFilterParentChanged]);

    let err = bus
        .dispatch_and_wait(envelope(DashboardCommand::SetAttributeFilterParent {
            filter_local_id: "f-region".into(),
            parent_filters: vec![AttributeFilterParent {
                filter_local_identifier: city.local_identifier.clone(),
                over: Default::default(),
            }],
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));

    bus.dispatch_and_wait(envelope(DashboardCommand::RemoveAttributeFilters {
        filter_local_ids: vec!["f-region".into()],
    }))
    .await
    .unwrap();
    let city = bus
        .store()
        .select(|s| filter_context::find_attribute_filter(&s.filter_context, &city.local_identifier).cloned())
        .unwrap();
    assert!(city.filter_elements_by.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_date_filters_stay_unique_per_data_set(ids in proptest::collection::vec(0u8..4, 1..12)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let (bus, _) = ready_bus().await;
            for id in &ids {
                let _ = bus
                    .dispatch_and_wait(envelope(DashboardCommand::AddDateFilter {
                        data_set: data_set(&format!("dt.{id}")),
                        index: -1,
                    }))
                    .await;
            }
            let filters = bus.store().select(|s| filter_context::date_filters(&s.filter_context));
            let mut seen: Vec<&ObjRef> = filters.iter().filter_map(|f| f.data_set.as_ref()).collect();
            let total = seen.len();
            seen.sort_by_key(|r| r.to_string());
            seen.dedup();
            prop_assert_eq!(seen.len(), total);
            prop_assert!(filters.iter().filter(|f| f.is_common()).count() <= 1);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
