//! Filter context commands.

use std::collections::HashSet;

use serde_json::json;
use tessera_core::{
    AttributeElements, AttributeSelectionType, CommandError, DashboardAttributeFilter, DashboardCommand,
    DashboardDateFilter, DateFilterSelection, EventKind, FilterSelection, ObjRef, SelectionMode,
};
use tessera_store::slices::filter_context::{self, FilterContextAction, FilterContextState};
use tessera_store::StoreAction;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::{CommandContext, DirectHandler};

fn new_local_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn element_count(elements: &AttributeElements) -> usize {
    match elements {
        AttributeElements::Uris(v) | AttributeElements::Values(v) => v.len(),
    }
}

fn check_single_selection(mode: SelectionMode, elements: &AttributeElements) -> Result<(), CommandError> {
    if mode == SelectionMode::Single && element_count(elements) > 1 {
        return Err(CommandError::Validation(
            "single-selection filter accepts at most one element".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Date filters
// ---------------------------------------------------------------------------

pub struct ChangeDateFilterSelectionHandler;

impl DirectHandler for ChangeDateFilterSelectionHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (data_set, selection) = match command {
            DashboardCommand::ChangeDateFilterSelection { data_set, selection } => (data_set, selection),
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(FilterContextAction::UpsertDateFilter {
            data_set: data_set.clone(),
            selection,
        })?;

        let filter = ctx.store.select(|s| match &data_set {
            Some(ds) => filter_context::find_date_filter(&s.filter_context, ds).cloned(),
            None => filter_context::common_date_filter(&s.filter_context).cloned(),
        });
        ctx.emit(
            EventKind::DateFilterSelectionChanged,
            json!({ "dataSet": data_set, "filter": filter }),
        );
        Ok(())
    }
}

pub struct AddDateFilterHandler;

impl DirectHandler for AddDateFilterHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (data_set, index) = match command {
            DashboardCommand::AddDateFilter { data_set, index } => (data_set, index),
            other => return Err(ctx.mismatch(&other)),
        };
        let state = ctx.state();
        let existing = ctx.store.selectors().date_filters(&state);
        if !filter_context::can_filter_be_added(&data_set, &existing) {
            return Err(CommandError::Validation(format!(
                "a date filter for {data_set} already exists"
            )));
        }

        let filter = DashboardDateFilter::all_time(Some(data_set.clone()), Some(new_local_id()));
        ctx.dispatch(FilterContextAction::AddDateFilter {
            filter: filter.clone(),
            index,
        })?;
        ctx.emit(EventKind::DateFilterAdded, json!({ "filter": filter, "index": index }));
        Ok(())
    }
}

pub struct RemoveDateFilterHandler;

impl DirectHandler for RemoveDateFilterHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let data_set = match command {
            DashboardCommand::RemoveDateFilter { data_set } => data_set,
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(FilterContextAction::RemoveDateFilter {
            data_set: data_set.clone(),
        })?;
        ctx.emit(EventKind::DateFilterRemoved, json!({ "dataSet": data_set }));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attribute filters
// ---------------------------------------------------------------------------

pub struct AddAttributeFilterHandler;

impl DirectHandler for AddAttributeFilterHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (display_form, index, initial_selection, initial_is_negative_selection, selection_mode, title) =
            match command {
                DashboardCommand::AddAttributeFilter {
                    display_form,
                    index,
                    initial_selection,
                    initial_is_negative_selection,
                    selection_mode,
                    title,
                } => (
                    display_form,
                    index,
                    initial_selection,
                    initial_is_negative_selection,
                    selection_mode,
                    title,
                ),
                other => return Err(ctx.mismatch(&other)),
            };

        // no initial selection means "all": an empty negative selection
        let (attribute_elements, negative_selection) = match initial_selection {
            Some(elements) => (elements, initial_is_negative_selection),
            None => (AttributeElements::default(), true),
        };
        check_single_selection(selection_mode, &attribute_elements)?;

        let filter = DashboardAttributeFilter {
            local_identifier: new_local_id(),
            display_form,
            attribute_elements,
            negative_selection,
            selection_mode,
            title,
            filter_elements_by: Vec::new(),
        };
        ctx.dispatch(FilterContextAction::AddAttributeFilter {
            filter: filter.clone(),
            index,
        })?;
        ctx.emit(EventKind::AttributeFilterAdded, json!({ "filter": filter, "index": index }));
        Ok(())
    }
}

pub struct RemoveAttributeFiltersHandler;

impl DirectHandler for RemoveAttributeFiltersHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let local_ids = match command {
            DashboardCommand::RemoveAttributeFilters { filter_local_ids } => filter_local_ids,
            other => return Err(ctx.mismatch(&other)),
        };
        if local_ids.is_empty() {
            return Err(CommandError::Validation("no filters to remove".into()));
        }

        let removed: Vec<DashboardAttributeFilter> = ctx.store.select(|s| {
            local_ids
                .iter()
                .filter_map(|id| filter_context::find_attribute_filter(&s.filter_context, id).cloned())
                .collect()
        });
        ctx.dispatch(FilterContextAction::RemoveAttributeFilters(local_ids))?;
        ctx.emit(EventKind::AttributeFiltersRemoved, json!({ "removedFilters": removed }));
        Ok(())
    }
}

pub struct MoveAttributeFilterHandler;

impl DirectHandler for MoveAttributeFilterHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (local_id, index) = match command {
            DashboardCommand::MoveAttributeFilter { filter_local_id, index } => (filter_local_id, index),
            other => return Err(ctx.mismatch(&other)),
        };
        let from = ctx.store.select(|s| {
            filter_context::attribute_filters(&s.filter_context)
                .iter()
                .position(|f| f.local_identifier == local_id)
        });
        ctx.dispatch(FilterContextAction::MoveAttributeFilter {
            local_id: local_id.clone(),
            index,
        })?;
        ctx.emit(
            EventKind::AttributeFilterMoved,
            json!({ "filterLocalId": local_id, "fromIndex": from, "toIndex": index }),
        );
        Ok(())
    }
}

pub struct ChangeAttributeSelectionHandler;

impl DirectHandler for ChangeAttributeSelectionHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (local_id, elements, selection_type) = match command {
            DashboardCommand::ChangeAttributeFilterSelection {
                filter_local_id,
                elements,
                selection_type,
            } => (filter_local_id, elements, selection_type),
            other => return Err(ctx.mismatch(&other)),
        };

        let mode = ctx
            .store
            .select(|s| filter_context::find_attribute_filter(&s.filter_context, &local_id).map(|f| f.selection_mode))
            .ok_or_else(|| CommandError::Validation(format!("attribute filter {local_id} not found")))?;
        check_single_selection(mode, &elements)?;

        ctx.dispatch(FilterContextAction::ChangeAttributeSelection {
            local_id: local_id.clone(),
            elements,
            negative_selection: selection_type == AttributeSelectionType::NotIn,
        })?;
        let filter = ctx
            .store
            .select(|s| filter_context::find_attribute_filter(&s.filter_context, &local_id).cloned());
        ctx.emit(EventKind::AttributeFilterSelectionChanged, json!({ "filter": filter }));
        Ok(())
    }
}

pub struct SetAttributeFilterParentHandler;

impl DirectHandler for SetAttributeFilterParentHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (local_id, parents) = match command {
            DashboardCommand::SetAttributeFilterParent {
                filter_local_id,
                parent_filters,
            } => (filter_local_id, parent_filters),
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(FilterContextAction::SetAttributeFilterParents {
            local_id: local_id.clone(),
            parents,
        })?;
        let filter = ctx
            .store
            .select(|s| filter_context::find_attribute_filter(&s.filter_context, &local_id).cloned());
        ctx.emit(EventKind::AttributeFilterParentChanged, json!({ "filter": filter }));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Whole filter context
// ---------------------------------------------------------------------------

/// Turn a bulk selection into filter context actions. Attribute filters are
/// matched by display form, date filters by data set. The first selection
/// for a target wins; selections matching no filter are skipped.
fn plan_selection(
    state: &FilterContextState,
    selections: Vec<FilterSelection>,
    reset_others: bool,
) -> Result<Vec<StoreAction>, CommandError> {
    let mut actions = Vec::new();
    let mut touched_attributes = HashSet::new();
    let mut touched_dates: HashSet<Option<ObjRef>> = HashSet::new();

    for selection in selections {
        match selection {
            FilterSelection::AttributeFilter {
                display_form,
                elements,
                selection_type,
            } => {
                let Some(filter) = filter_context::attribute_filters(state)
                    .into_iter()
                    .find(|f| f.display_form == display_form)
                else {
                    debug!(display_form = %display_form, "no attribute filter for selection; skipping");
                    continue;
                };
                if !touched_attributes.insert(filter.local_identifier.clone()) {
                    warn!(display_form = %display_form, "attribute filter selected twice; keeping the first");
                    continue;
                }
                check_single_selection(filter.selection_mode, &elements)?;
                actions.push(
                    FilterContextAction::ChangeAttributeSelection {
                        local_id: filter.local_identifier,
                        elements,
                        negative_selection: selection_type == AttributeSelectionType::NotIn,
                    }
                    .into(),
                );
            }
            FilterSelection::DateFilter { data_set, selection } => {
                if let Some(ds) = &data_set {
                    if filter_context::find_date_filter(state, ds).is_none() {
                        debug!(data_set = %ds, "no date filter for selection; skipping");
                        continue;
                    }
                }
                if !touched_dates.insert(data_set.clone()) {
                    warn!(data_set = ?data_set, "date filter selected twice; keeping the first");
                    continue;
                }
                actions.push(FilterContextAction::UpsertDateFilter { data_set, selection }.into());
            }
        }
    }

    if reset_others {
        for filter in filter_context::attribute_filters(state) {
            if touched_attributes.contains(&filter.local_identifier) {
                continue;
            }
            actions.push(
                FilterContextAction::ChangeAttributeSelection {
                    elements: filter.attribute_elements.cleared(),
                    local_id: filter.local_identifier,
                    negative_selection: true,
                }
                .into(),
            );
        }
        for filter in filter_context::date_filters(state) {
            if touched_dates.contains(&filter.data_set) {
                continue;
            }
            actions.push(
                FilterContextAction::UpsertDateFilter {
                    data_set: filter.data_set,
                    selection: DateFilterSelection::all_time(),
                }
                .into(),
            );
        }
    }
    Ok(actions)
}

pub struct ChangeFilterContextSelectionHandler;

impl DirectHandler for ChangeFilterContextSelectionHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (selections, reset_others) = match command {
            DashboardCommand::ChangeFilterContextSelection { filters, reset_others } => (filters, reset_others),
            other => return Err(ctx.mismatch(&other)),
        };

        let actions = ctx
            .store
            .select(|s| plan_selection(&s.filter_context, selections, reset_others))?;
        if !actions.is_empty() {
            ctx.dispatch(StoreAction::Batch(actions))?;
        }
        let filters = ctx.store.select(|s| s.filter_context.filters.clone());
        ctx.emit(EventKind::FilterContextChanged, json!({ "filterContext": { "filters": filters } }));
        Ok(())
    }
}
