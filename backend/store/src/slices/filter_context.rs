//! Filter context: the ordered list of active dashboard filters.
//!
//! Layout of `filters`: the common date filter (if any) comes first, then
//! dataset date filters and attribute filters in user order. Positional
//! indexes in actions do not count the common date filter.

use std::collections::HashSet;

use serde::Serialize;
use tessera_core::{
    AttributeElements, AttributeFilterParent, DashboardAttributeFilter, DashboardDateFilter,
    DateFilterSelection, FilterContextItem, ObjRef,
};

use tracing::warn;

use crate::error::StoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContextState {
    pub filters: Vec<FilterContextItem>,
    /// Filters as last loaded or saved; `ResetToOriginal` restores them.
    pub original_filters: Vec<FilterContextItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterContextAction {
    SetFilters(Vec<FilterContextItem>),
    UpsertDateFilter {
        data_set: Option<ObjRef>,
        selection: DateFilterSelection,
    },
    AddDateFilter {
        filter: DashboardDateFilter,
        index: i32,
    },
    RemoveDateFilter {
        data_set: ObjRef,
    },
    AddAttributeFilter {
        filter: DashboardAttributeFilter,
        index: i32,
    },
    RemoveAttributeFilters(Vec<String>),
    MoveAttributeFilter {
        local_id: String,
        index: i32,
    },
    ChangeAttributeSelection {
        local_id: String,
        elements: AttributeElements,
        negative_selection: bool,
    },
    SetAttributeFilterParents {
        local_id: String,
        parents: Vec<AttributeFilterParent>,
    },
    /// Record `filters` as the saved baseline without touching the live ones.
    SetOriginal(Vec<FilterContextItem>),
    ResetToOriginal,
}

impl FilterContextAction {
    pub fn name(&self) -> &'static str {
        match self {
            FilterContextAction::SetFilters(_) => "filterContext/set",
            FilterContextAction::UpsertDateFilter { .. } => "filterContext/upsertDateFilter",
            FilterContextAction::AddDateFilter { .. } => "filterContext/addDateFilter",
            FilterContextAction::RemoveDateFilter { .. } => "filterContext/removeDateFilter",
            FilterContextAction::AddAttributeFilter { .. } => "filterContext/addAttributeFilter",
            FilterContextAction::RemoveAttributeFilters(_) => "filterContext/removeAttributeFilters",
            FilterContextAction::MoveAttributeFilter { .. } => "filterContext/moveAttributeFilter",
            FilterContextAction::ChangeAttributeSelection { .. } => "filterContext/changeAttributeSelection",
            FilterContextAction::SetAttributeFilterParents { .. } => "filterContext/setAttributeFilterParents",
            FilterContextAction::SetOriginal(_) => "filterContext/setOriginal",
            FilterContextAction::ResetToOriginal => "filterContext/resetToOriginal",
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// True iff no filter in `filters` targets `data_set`.
pub fn can_filter_be_added(data_set: &ObjRef, filters: &[DashboardDateFilter]) -> bool {
    !filters
        .iter()
        .any(|f| f.data_set.as_ref() == Some(data_set))
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

pub fn reduce(state: &mut FilterContextState, action: FilterContextAction) -> Result<(), StoreError> {
    match action {
        FilterContextAction::SetFilters(filters) => {
            state.filters = normalize(filters);
            state.original_filters = state.filters.clone();
        }
        FilterContextAction::UpsertDateFilter { data_set, selection } => {
            upsert_date_filter(state, data_set, selection)?;
        }
        FilterContextAction::AddDateFilter { filter, index } => {
            let Some(data_set) = filter.data_set.clone() else {
                return Err(StoreError::DuplicateFilter("common date filter".into()));
            };
            if !can_filter_be_added(&data_set, &date_filters(state)) {
                return Err(StoreError::DuplicateFilter(data_set.to_string()));
            }
            let at = insert_position(state, index)?;
            state.filters.insert(at, FilterContextItem::DateFilter(filter));
        }
        FilterContextAction::RemoveDateFilter { data_set } => {
            let before = state.filters.len();
            state
                .filters
                .retain(|f| f.as_date_filter().map_or(true, |d| d.data_set.as_ref() != Some(&data_set)));
            if state.filters.len() == before {
                return Err(StoreError::FilterNotFound(data_set.to_string()));
            }
        }
        FilterContextAction::AddAttributeFilter { filter, index } => {
            if attribute_filters(state)
                .iter()
                .any(|f| f.display_form == filter.display_form || f.local_identifier == filter.local_identifier)
            {
                return Err(StoreError::DuplicateFilter(filter.display_form.to_string()));
            }
            let at = insert_position(state, index)?;
            state.filters.insert(at, FilterContextItem::AttributeFilter(filter));
        }
        FilterContextAction::RemoveAttributeFilters(local_ids) => {
            for id in &local_ids {
                if attribute_filter_position(state, id).is_none() {
                    return Err(StoreError::FilterNotFound(id.clone()));
                }
            }
            state.filters.retain(|f| {
                f.as_attribute_filter()
                    .map_or(true, |a| !local_ids.contains(&a.local_identifier))
            });
            // children of a removed filter lose that parent
            for item in &mut state.filters {
                if let FilterContextItem::AttributeFilter(a) = item {
                    a.filter_elements_by
                        .retain(|p| !local_ids.contains(&p.filter_local_identifier));
                }
            }
        }
        FilterContextAction::MoveAttributeFilter { local_id, index } => {
            let from = attribute_filter_position(state, &local_id)
                .ok_or_else(|| StoreError::FilterNotFound(local_id.clone()))?;
            let item = state.filters.remove(from);
            let at = match insert_position(state, index) {
                Ok(at) => at,
                Err(e) => {
                    state.filters.insert(from, item);
                    return Err(e);
                }
            };
            state.filters.insert(at, item);
        }
        FilterContextAction::ChangeAttributeSelection {
            local_id,
            elements,
            negative_selection,
        } => {
            let pos = attribute_filter_position(state, &local_id)
                .ok_or_else(|| StoreError::FilterNotFound(local_id.clone()))?;
            if let FilterContextItem::AttributeFilter(f) = &mut state.filters[pos] {
                f.attribute_elements = elements;
                f.negative_selection = negative_selection;
            }
        }
        FilterContextAction::SetAttributeFilterParents { local_id, parents } => {
            validate_parents(state, &local_id, &parents)?;
            let pos = attribute_filter_position(state, &local_id)
                .ok_or_else(|| StoreError::FilterNotFound(local_id.clone()))?;
            if let FilterContextItem::AttributeFilter(f) = &mut state.filters[pos] {
                f.filter_elements_by = parents;
            }
        }
        FilterContextAction::SetOriginal(filters) => {
            state.original_filters = normalize(filters);
        }
        FilterContextAction::ResetToOriginal => {
            state.filters = state.original_filters.clone();
        }
    }
    Ok(())
}

fn upsert_date_filter(
    state: &mut FilterContextState,
    data_set: Option<ObjRef>,
    selection: DateFilterSelection,
) -> Result<(), StoreError> {
    let existing = state.filters.iter().position(|f| {
        f.as_date_filter()
            .is_some_and(|d| d.data_set == data_set)
    });

    match (data_set, existing) {
        // all time on the common filter means "no common filter"
        (None, Some(pos)) if selection.is_all_time() => {
            state.filters.remove(pos);
        }
        (None, None) if selection.is_all_time() => {}
        (data_set, Some(pos)) => {
            if let FilterContextItem::DateFilter(f) = &mut state.filters[pos] {
                apply_selection(f, selection);
                f.data_set = data_set;
            }
        }
        (None, None) => {
            let mut filter = DashboardDateFilter::all_time(None, None);
            apply_selection(&mut filter, selection);
            state.filters.insert(0, FilterContextItem::DateFilter(filter));
        }
        (Some(data_set), None) => return Err(StoreError::FilterNotFound(data_set.to_string())),
    }
    Ok(())
}

/// Parents must be other existing attribute filters, and the new links must
/// not close a cycle.
fn validate_parents(
    state: &FilterContextState,
    child: &str,
    parents: &[AttributeFilterParent],
) -> Result<(), StoreError> {
    if attribute_filter_position(state, child).is_none() {
        return Err(StoreError::FilterNotFound(child.to_string()));
    }
    for parent in parents {
        let id = parent.filter_local_identifier.as_str();
        if id == child {
            return Err(StoreError::InvalidParent(format!("{child} cannot be its own parent")));
        }
        if attribute_filter_position(state, id).is_none() {
            return Err(StoreError::FilterNotFound(id.to_string()));
        }
        if is_ancestor(state, child, id) {
            return Err(StoreError::InvalidParent(format!("{id} already depends on {child}")));
        }
    }
    Ok(())
}

/// True iff `ancestor` is reachable from `of` through parent links.
fn is_ancestor(state: &FilterContextState, ancestor: &str, of: &str) -> bool {
    let mut pending = vec![of];
    let mut visited = HashSet::new();
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(filter) = find_attribute_filter(state, id) else {
            continue;
        };
        for parent in &filter.filter_elements_by {
            if parent.filter_local_identifier == ancestor {
                return true;
            }
            pending.push(parent.filter_local_identifier.as_str());
        }
    }
    false
}

fn apply_selection(filter: &mut DashboardDateFilter, selection: DateFilterSelection) {
    filter.filter_type = selection.filter_type;
    filter.granularity = selection.granularity;
    filter.from = selection.from;
    filter.to = selection.to;
}

/// Move the common date filter to the front and keep everything else in
/// order. Of several filters for the same data set, display form or local id
/// only the first survives.
fn normalize(filters: Vec<FilterContextItem>) -> Vec<FilterContextItem> {
    let mut common: Option<FilterContextItem> = None;
    let mut rest = Vec::with_capacity(filters.len());
    let mut data_sets = HashSet::new();
    let mut display_forms = HashSet::new();
    let mut local_ids = HashSet::new();

    for item in filters {
        let kept = match &item {
            FilterContextItem::DateFilter(d) => match &d.data_set {
                None => common.is_none(),
                Some(data_set) => data_sets.insert(data_set.clone()),
            },
            FilterContextItem::AttributeFilter(a) => {
                let fresh = !display_forms.contains(&a.display_form) && !local_ids.contains(&a.local_identifier);
                if fresh {
                    display_forms.insert(a.display_form.clone());
                    local_ids.insert(a.local_identifier.clone());
                }
                fresh
            }
        };
        if !kept {
            warn!(filter = ?item, "dropping duplicate filter from loaded filter context");
            continue;
        }
        if item.as_date_filter().is_some_and(DashboardDateFilter::is_common) {
            common = Some(item);
        } else {
            rest.push(item);
        }
    }
    common.into_iter().chain(rest).collect()
}

fn has_common_date_filter(state: &FilterContextState) -> bool {
    state
        .filters
        .first()
        .and_then(FilterContextItem::as_date_filter)
        .is_some_and(DashboardDateFilter::is_common)
}

/// Translate a user index (`-1` = end) into a position in `filters`.
fn insert_position(state: &FilterContextState, index: i32) -> Result<usize, StoreError> {
    let offset = usize::from(has_common_date_filter(state));
    let len = state.filters.len() - offset;
    match index {
        -1 => Ok(state.filters.len()),
        i if i >= 0 && (i as usize) <= len => Ok(i as usize + offset),
        i => Err(StoreError::IndexOutOfRange {
            what: "filter",
            index: i,
            len,
        }),
    }
}

fn attribute_filter_position(state: &FilterContextState, local_id: &str) -> Option<usize> {
    state.filters.iter().position(|f| {
        f.as_attribute_filter()
            .is_some_and(|a| a.local_identifier == local_id)
    })
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

pub fn date_filters(state: &FilterContextState) -> Vec<DashboardDateFilter> {
    state
        .filters
        .iter()
        .filter_map(FilterContextItem::as_date_filter)
        .cloned()
        .collect()
}

pub fn attribute_filters(state: &FilterContextState) -> Vec<DashboardAttributeFilter> {
    state
        .filters
        .iter()
        .filter_map(FilterContextItem::as_attribute_filter)
        .cloned()
        .collect()
}

pub fn common_date_filter(state: &FilterContextState) -> Option<&DashboardDateFilter> {
    state
        .filters
        .iter()
        .filter_map(FilterContextItem::as_date_filter)
        .find(|d| d.is_common())
}

pub fn find_attribute_filter<'a>(
    state: &'a FilterContextState,
    local_id: &str,
) -> Option<&'a DashboardAttributeFilter> {
    attribute_filter_position(state, local_id).and_then(|pos| state.filters[pos].as_attribute_filter())
}

pub fn find_date_filter<'a>(state: &'a FilterContextState, data_set: &ObjRef) -> Option<&'a DashboardDateFilter> {
    state
        .filters
        .iter()
        .filter_map(FilterContextItem::as_date_filter)
        .find(|d| d.data_set.as_ref() == Some(data_set))
}
