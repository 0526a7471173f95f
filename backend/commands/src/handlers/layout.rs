//! Layout editing commands.

use async_trait::async_trait;
use serde_json::json;
use tessera_core::{
    CommandError, DashboardCommand, DashboardLayoutItem, DashboardLayoutSection, EventKind, ItemDefinition,
};
use tessera_store::slices::analytics::AnalyticsAction;
use tessera_store::slices::keyed::KeyedAction;
use tessera_store::slices::layout::{self, LayoutAction, LayoutState};
use tessera_store::StoreAction;

use crate::dispatch::{CommandContext, DirectHandler, RoutineHandler};
use crate::handlers::ensure_insights;

/// Expand item definitions against the stash. Returns the items and the
/// stash ids they consumed.
fn resolve_items(
    state: &LayoutState,
    definitions: Vec<ItemDefinition>,
) -> Result<(Vec<DashboardLayoutItem>, Vec<String>), CommandError> {
    let mut items = Vec::new();
    let mut consumed = Vec::new();
    for definition in definitions {
        match definition {
            ItemDefinition::Item(item) => items.push(item),
            ItemDefinition::Stashed(id) => {
                let stashed = layout::stashed_items(state, &id)
                    .ok_or_else(|| CommandError::Validation(format!("stash '{id}' does not exist")))?;
                items.extend(stashed.iter().cloned());
                if !consumed.contains(&id) {
                    consumed.push(id);
                }
            }
        }
    }
    Ok((items, consumed))
}

/// Apply a removal together with dropping the stored results of the widgets
/// it takes off the dashboard. Stashed items keep their results.
fn remove_with_results(
    ctx: &CommandContext,
    action: LayoutAction,
    removed: &[DashboardLayoutItem],
    stashed: bool,
) -> Result<(), CommandError> {
    if stashed || removed.is_empty() {
        return ctx.dispatch(action);
    }
    let mut batch = vec![StoreAction::from(action)];
    for widget in removed.iter().filter_map(|i| i.widget.as_ref()) {
        let widget_ref = widget.widget_ref();
        batch.push(StoreAction::ExecutionResults(KeyedAction::Remove(widget_ref.clone())));
        batch.push(StoreAction::DrillTargets(KeyedAction::Remove(widget_ref.clone())));
        batch.push(AnalyticsAction::ClearWidget(widget_ref.clone()).into());
    }
    ctx.dispatch(StoreAction::Batch(batch))
}

/// `-1` resolves to the last position.
fn resolve_existing(index: i32, len: usize) -> Option<usize> {
    match index {
        -1 => len.checked_sub(1),
        i if i >= 0 && (i as usize) < len => Some(i as usize),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Routines
// ---------------------------------------------------------------------------

pub struct AddSectionHandler;

#[async_trait]
impl RoutineHandler for AddSectionHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (index, header, definitions) = match command {
            DashboardCommand::AddLayoutSection {
                index,
                initial_header,
                initial_items,
            } => (index, initial_header, initial_items),
            other => return Err(ctx.mismatch(&other)),
        };

        let (items, consumed_stashes) = ctx.store.select(|s| resolve_items(&s.layout, definitions))?;
        ensure_insights(&ctx, &items).await?;

        let section = DashboardLayoutSection::new(header, items);
        ctx.dispatch(LayoutAction::AddSection {
            index,
            section: section.clone(),
            consumed_stashes,
        })?;
        ctx.emit(EventKind::LayoutSectionAdded, json!({ "section": section, "index": index }));
        Ok(())
    }
}

pub struct AddItemsHandler;

#[async_trait]
impl RoutineHandler for AddItemsHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (section_index, item_index, definitions) = match command {
            DashboardCommand::AddSectionItems {
                section_index,
                item_index,
                items,
            } => (section_index, item_index, items),
            other => return Err(ctx.mismatch(&other)),
        };
        if definitions.is_empty() {
            return Err(CommandError::Validation("no items to add".into()));
        }

        let (items, consumed_stashes) = ctx.store.select(|s| {
            if section_index >= s.layout.layout.sections.len() {
                return Err(CommandError::Validation(format!("section {section_index} does not exist")));
            }
            resolve_items(&s.layout, definitions)
        })?;
        ensure_insights(&ctx, &items).await?;

        ctx.dispatch(LayoutAction::AddItems {
            section: section_index,
            index: item_index,
            items: items.clone(),
            consumed_stashes,
        })?;
        ctx.emit(
            EventKind::LayoutSectionItemsAdded,
            json!({ "sectionIndex": section_index, "startIndex": item_index, "itemsAdded": items }),
        );
        Ok(())
    }
}

pub struct ReplaceItemHandler;

#[async_trait]
impl RoutineHandler for ReplaceItemHandler {
    async fn run(&self, ctx: CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (section, index, definition, stash_id) = match command {
            DashboardCommand::ReplaceSectionItem {
                section_index,
                item_index,
                item,
                stash_identifier,
            } => (section_index, item_index, item, stash_identifier),
            other => return Err(ctx.mismatch(&other)),
        };

        let (items, consumed_stashes) = ctx.store.select(|s| resolve_items(&s.layout, vec![definition]))?;
        ensure_insights(&ctx, &items).await?;

        let (at, previous) = ctx
            .store
            .select(|s| {
                let existing = &s.layout.layout.sections.get(section)?.items;
                resolve_existing(index, existing.len()).map(|i| (i, existing[i].clone()))
            })
            .ok_or_else(|| CommandError::Validation(format!("item {index} in section {section} does not exist")))?;

        // a replacement carrying the same widget keeps its results
        let kept = previous.widget.as_ref().is_some_and(|old| {
            items
                .iter()
                .filter_map(|i| i.widget.as_ref())
                .any(|w| w.widget_ref() == old.widget_ref())
        });
        remove_with_results(
            &ctx,
            LayoutAction::ReplaceItem {
                section,
                index,
                items: items.clone(),
                stash_id: stash_id.clone(),
                consumed_stashes,
            },
            std::slice::from_ref(&previous),
            stash_id.is_some() || kept,
        )?;
        ctx.emit(
            EventKind::LayoutSectionItemReplaced,
            json!({
                "sectionIndex": section,
                "itemIndex": at,
                "items": items,
                "previousItem": previous,
                "stashIdentifier": stash_id,
            }),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Direct edits
// ---------------------------------------------------------------------------

pub struct MoveSectionHandler;

impl DirectHandler for MoveSectionHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (from, to) = match command {
            DashboardCommand::MoveLayoutSection { section_index, to_index } => (section_index, to_index),
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(LayoutAction::MoveSection { from, to })?;
        ctx.emit(EventKind::LayoutSectionMoved, json!({ "fromIndex": from, "toIndex": to }));
        Ok(())
    }
}

pub struct RemoveSectionHandler;

impl DirectHandler for RemoveSectionHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (index, stash_id) = match command {
            DashboardCommand::RemoveLayoutSection {
                index,
                stash_identifier,
            } => (index, stash_identifier),
            other => return Err(ctx.mismatch(&other)),
        };

        let removed = ctx.store.select(|s| {
            let sections = &s.layout.layout.sections;
            resolve_existing(index, sections.len()).map(|i| (i, sections[i].clone()))
        });
        let removed_items = removed.as_ref().map(|(_, s)| s.items.clone()).unwrap_or_default();
        remove_with_results(
            ctx,
            LayoutAction::RemoveSection {
                index,
                stash_id: stash_id.clone(),
            },
            &removed_items,
            stash_id.is_some(),
        )?;

        let (at, section) = removed.unzip();
        ctx.emit(
            EventKind::LayoutSectionRemoved,
            json!({ "index": at, "section": section, "stashIdentifier": stash_id }),
        );
        Ok(())
    }
}

pub struct RemoveItemHandler;

impl DirectHandler for RemoveItemHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (section, index, stash_id, eager) = match command {
            DashboardCommand::RemoveSectionItem {
                section_index,
                item_index,
                stash_identifier,
                eager,
            } => (section_index, item_index, stash_identifier, eager),
            other => return Err(ctx.mismatch(&other)),
        };

        let removed = ctx.store.select(|s| {
            let items = &s.layout.layout.sections.get(section)?.items;
            resolve_existing(index, items.len()).map(|i| (i, items[i].clone(), items.len() == 1))
        });
        let removed_items: Vec<DashboardLayoutItem> = removed.iter().map(|(_, item, _)| item.clone()).collect();
        remove_with_results(
            ctx,
            LayoutAction::RemoveItem {
                section,
                index,
                stash_id: stash_id.clone(),
                eager,
            },
            &removed_items,
            stash_id.is_some(),
        )?;

        let (item_index, item, was_last) = match removed {
            Some((i, item, last)) => (Some(i), Some(item), last),
            None => (None, None, false),
        };
        ctx.emit(
            EventKind::LayoutSectionItemRemoved,
            json!({
                "sectionIndex": section,
                "itemIndex": item_index,
                "item": item,
                "stashIdentifier": stash_id,
                "sectionRemoved": eager && was_last,
            }),
        );
        Ok(())
    }
}

pub struct ChangeSectionHeaderHandler;

impl DirectHandler for ChangeSectionHeaderHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (index, header, merge) = match command {
            DashboardCommand::ChangeLayoutSectionHeader { index, header, merge } => (index, header, merge),
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(LayoutAction::ChangeSectionHeader { index, header, merge })?;
        let header = ctx
            .store
            .select(|s| s.layout.layout.sections.get(index).and_then(|sec| sec.header.clone()));
        ctx.emit(
            EventKind::LayoutSectionHeaderChanged,
            json!({ "sectionIndex": index, "newHeader": header }),
        );
        Ok(())
    }
}

pub struct MoveItemHandler;

impl DirectHandler for MoveItemHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (section, index, to_section, to_index) = match command {
            DashboardCommand::MoveSectionItem {
                section_index,
                item_index,
                to_section_index,
                to_item_index,
            } => (section_index, item_index, to_section_index, to_item_index),
            other => return Err(ctx.mismatch(&other)),
        };

        let item = ctx.store.select(|s| {
            let items = &s.layout.layout.sections.get(section)?.items;
            resolve_existing(index, items.len()).map(|i| items[i].clone())
        });
        ctx.dispatch(LayoutAction::MoveItem {
            section,
            index,
            to_section,
            to_index,
        })?;
        ctx.emit(
            EventKind::LayoutSectionItemMoved,
            json!({
                "item": item,
                "fromSectionIndex": section,
                "toSectionIndex": to_section,
                "fromIndex": index,
                "toIndex": to_index,
            }),
        );
        Ok(())
    }
}

pub struct UndoHandler;

impl DirectHandler for UndoHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        if !matches!(command, DashboardCommand::UndoLayoutChanges {}) {
            return Err(ctx.mismatch(&command));
        }
        let undone = ctx.store.select(|s| s.layout.undo.last().map(|e| e.action));
        ctx.dispatch(LayoutAction::Undo)?;
        let layout = ctx.store.select(|s| s.layout.layout.clone());
        ctx.emit(EventKind::LayoutChanged, json!({ "layout": layout, "undone": undone }));
        Ok(())
    }
}

pub struct ChangeWidgetHeaderHandler;

impl DirectHandler for ChangeWidgetHeaderHandler {
    fn handle(&self, ctx: &CommandContext, command: DashboardCommand) -> Result<(), CommandError> {
        let (widget_ref, title) = match command {
            DashboardCommand::ChangeWidgetHeader { widget_ref, title } => (widget_ref, title),
            other => return Err(ctx.mismatch(&other)),
        };
        ctx.dispatch(LayoutAction::ChangeWidgetHeader {
            widget_ref: widget_ref.clone(),
            title: title.clone(),
        })?;
        ctx.emit(EventKind::WidgetHeaderChanged, json!({ "ref": widget_ref, "header": { "title": title } }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_resolve_items_expands_stash() {
        let item = DashboardLayoutItem::default();
        let mut state = LayoutState::default();
        state.stash = HashMap::from([("s1".to_string(), vec![item.clone(), item.clone()])]);

        let (items, consumed) = resolve_items(
            &state,
            vec![ItemDefinition::Stashed("s1".into()), ItemDefinition::Item(item)],
        )
        .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(consumed, vec!["s1".to_string()]);
    }

    #[test]
    fn test_resolve_items_unknown_stash() {
        let err = resolve_items(&LayoutState::default(), vec![ItemDefinition::Stashed("nope".into())]).unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    #[test]
    fn test_resolve_existing() {
        assert_eq!(resolve_existing(-1, 3), Some(2));
        assert_eq!(resolve_existing(-1, 0), None);
        assert_eq!(resolve_existing(1, 3), Some(1));
        assert_eq!(resolve_existing(3, 3), None);
        assert_eq!(resolve_existing(-2, 3), None);
    }
}
