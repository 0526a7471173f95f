//! Layout slice: sections, items and widgets, plus the stash of removed
//! items and a snapshot undo stack.

use std::collections::HashMap;

use serde::Serialize;
use tessera_core::{
    DashboardLayout, DashboardLayoutItem, DashboardLayoutSection, ObjRef, ScreenSize, SectionHeader, Widget,
};

use crate::error::StoreError;

const MAX_UNDO: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub layout: DashboardLayout,
    /// Layout as last loaded or saved.
    #[serde(skip)]
    pub original: DashboardLayout,
    pub stash: HashMap<String, Vec<DashboardLayoutItem>>,
    #[serde(skip)]
    pub undo: Vec<UndoEntry>,
    pub screen: Option<ScreenSize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub action: &'static str,
    pub layout: DashboardLayout,
    pub stash: HashMap<String, Vec<DashboardLayoutItem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutAction {
    SetLayout(DashboardLayout),
    AddSection {
        index: i32,
        section: DashboardLayoutSection,
        consumed_stashes: Vec<String>,
    },
    MoveSection {
        from: usize,
        to: i32,
    },
    RemoveSection {
        index: i32,
        stash_id: Option<String>,
    },
    ChangeSectionHeader {
        index: usize,
        header: SectionHeader,
        merge: bool,
    },
    AddItems {
        section: usize,
        index: i32,
        items: Vec<DashboardLayoutItem>,
        consumed_stashes: Vec<String>,
    },
    RemoveItem {
        section: usize,
        index: i32,
        stash_id: Option<String>,
        eager: bool,
    },
    MoveItem {
        section: usize,
        index: i32,
        to_section: usize,
        to_index: i32,
    },
    /// Swap one item for `items`; the old item goes to `stash_id` if given.
    ReplaceItem {
        section: usize,
        index: i32,
        items: Vec<DashboardLayoutItem>,
        stash_id: Option<String>,
        consumed_stashes: Vec<String>,
    },
    ChangeWidgetHeader {
        widget_ref: ObjRef,
        title: String,
    },
    Undo,
    SetScreen(ScreenSize),
    /// Record `layout` as the saved baseline without touching the live layout.
    SetOriginal(DashboardLayout),
    ResetToOriginal,
}

impl LayoutAction {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutAction::SetLayout(_) => "layout/set",
            LayoutAction::AddSection { .. } => "layout/addSection",
            LayoutAction::MoveSection { .. } => "layout/moveSection",
            LayoutAction::RemoveSection { .. } => "layout/removeSection",
            LayoutAction::ChangeSectionHeader { .. } => "layout/changeSectionHeader",
            LayoutAction::AddItems { .. } => "layout/addItems",
            LayoutAction::RemoveItem { .. } => "layout/removeItem",
            LayoutAction::MoveItem { .. } => "layout/moveItem",
            LayoutAction::ReplaceItem { .. } => "layout/replaceItem",
            LayoutAction::ChangeWidgetHeader { .. } => "layout/changeWidgetHeader",
            LayoutAction::Undo => "layout/undo",
            LayoutAction::SetScreen(_) => "layout/setScreen",
            LayoutAction::SetOriginal(_) => "layout/setOriginal",
            LayoutAction::ResetToOriginal => "layout/resetToOriginal",
        }
    }

    fn is_undoable(&self) -> bool {
        !matches!(
            self,
            LayoutAction::SetLayout(_)
                | LayoutAction::Undo
                | LayoutAction::SetScreen(_)
                | LayoutAction::SetOriginal(_)
                | LayoutAction::ResetToOriginal
        )
    }
}

// ---------------------------------------------------------------------------
// Index helpers
// ---------------------------------------------------------------------------

/// Position for an insert; `-1` means "at the end".
fn insert_index(what: &'static str, index: i32, len: usize) -> Result<usize, StoreError> {
    match index {
        -1 => Ok(len),
        i if i >= 0 && (i as usize) <= len => Ok(i as usize),
        i => Err(StoreError::IndexOutOfRange { what, index: i, len }),
    }
}

/// Position of an existing element; `-1` means "the last one".
fn existing_index(what: &'static str, index: i32, len: usize) -> Result<usize, StoreError> {
    match index {
        -1 if len > 0 => Ok(len - 1),
        i if i >= 0 && (i as usize) < len => Ok(i as usize),
        i => Err(StoreError::IndexOutOfRange { what, index: i, len }),
    }
}

fn section_mut(
    sections: &mut [DashboardLayoutSection],
    index: usize,
) -> Result<&mut DashboardLayoutSection, StoreError> {
    let len = sections.len();
    sections.get_mut(index).ok_or(StoreError::IndexOutOfRange {
        what: "section",
        index: index as i32,
        len,
    })
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

pub fn reduce(state: &mut LayoutState, action: LayoutAction) -> Result<(), StoreError> {
    let entry = action.is_undoable().then(|| UndoEntry {
        action: action.name(),
        layout: state.layout.clone(),
        stash: state.stash.clone(),
    });

    apply(state, action)?;

    if let Some(entry) = entry {
        state.undo.push(entry);
        if state.undo.len() > MAX_UNDO {
            state.undo.remove(0);
        }
    }
    Ok(())
}

fn apply(state: &mut LayoutState, action: LayoutAction) -> Result<(), StoreError> {
    let sections = &mut state.layout.sections;
    match action {
        LayoutAction::SetLayout(layout) => {
            state.original = layout.clone();
            state.layout = layout;
            state.stash.clear();
            state.undo.clear();
        }
        LayoutAction::AddSection {
            index,
            section,
            consumed_stashes,
        } => {
            let at = insert_index("section", index, sections.len())?;
            sections.insert(at, section);
            for id in consumed_stashes {
                state.stash.remove(&id);
            }
        }
        LayoutAction::MoveSection { from, to } => {
            let len = sections.len();
            let from = existing_index("section", from as i32, len)?;
            let to = existing_index("section", to, len)?;
            let section = sections.remove(from);
            sections.insert(to, section);
        }
        LayoutAction::RemoveSection { index, stash_id } => {
            let at = existing_index("section", index, sections.len())?;
            let removed = sections.remove(at);
            if let Some(id) = stash_id {
                state.stash.insert(id, removed.items);
            }
        }
        LayoutAction::ChangeSectionHeader { index, header, merge } => {
            let target = section_mut(sections, index)?;
            let header = match (merge, target.header.take()) {
                (true, Some(old)) => SectionHeader {
                    title: header.title.or(old.title),
                    description: header.description.or(old.description),
                },
                _ => header,
            };
            target.header = Some(header);
        }
        LayoutAction::AddItems {
            section,
            index,
            items,
            consumed_stashes,
        } => {
            let target = section_mut(sections, section)?;
            let at = insert_index("item", index, target.items.len())?;
            target.items.splice(at..at, items);
            for id in consumed_stashes {
                state.stash.remove(&id);
            }
        }
        LayoutAction::RemoveItem {
            section,
            index,
            stash_id,
            eager,
        } => {
            let target = section_mut(sections, section)?;
            let at = existing_index("item", index, target.items.len())?;
            let removed = target.items.remove(at);
            if eager && target.items.is_empty() {
                sections.remove(section);
            }
            if let Some(id) = stash_id {
                state.stash.entry(id).or_default().push(removed);
            }
        }
        LayoutAction::MoveItem {
            section,
            index,
            to_section,
            to_index,
        } => {
            section_mut(sections, to_section)?;
            let source = section_mut(sections, section)?;
            let from = existing_index("item", index, source.items.len())?;
            // validate the target before anything moves
            let target_len = sections[to_section].items.len() - usize::from(section == to_section);
            let to = insert_index("item", to_index, target_len)?;
            let item = sections[section].items.remove(from);
            sections[to_section].items.insert(to, item);
        }
        LayoutAction::ReplaceItem {
            section,
            index,
            items,
            stash_id,
            consumed_stashes,
        } => {
            let target = section_mut(sections, section)?;
            let at = existing_index("item", index, target.items.len())?;
            let removed = target.items.remove(at);
            target.items.splice(at..at, items);
            for id in consumed_stashes {
                state.stash.remove(&id);
            }
            if let Some(id) = stash_id {
                state.stash.entry(id).or_default().push(removed);
            }
        }
        LayoutAction::ChangeWidgetHeader { widget_ref, title } => {
            let widget = sections
                .iter_mut()
                .flat_map(|s| s.items.iter_mut())
                .filter_map(|i| i.widget.as_mut())
                .find(|w| w.widget_ref() == &widget_ref)
                .ok_or_else(|| StoreError::WidgetNotFound(widget_ref.to_string()))?;
            widget.set_title(title);
        }
        LayoutAction::Undo => {
            let entry = state.undo.pop().ok_or(StoreError::NothingToUndo)?;
            state.layout = entry.layout;
            state.stash = entry.stash;
        }
        LayoutAction::SetScreen(screen) => state.screen = Some(screen),
        LayoutAction::SetOriginal(layout) => state.original = layout,
        LayoutAction::ResetToOriginal => {
            state.layout = state.original.clone();
            state.stash.clear();
            state.undo.clear();
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

pub fn widgets(state: &LayoutState) -> Vec<Widget> {
    state
        .layout
        .sections
        .iter()
        .flat_map(|s| s.items.iter())
        .filter_map(|i| i.widget.clone())
        .collect()
}

pub fn find_widget<'a>(state: &'a LayoutState, widget_ref: &ObjRef) -> Option<&'a Widget> {
    state
        .layout
        .sections
        .iter()
        .flat_map(|s| s.items.iter())
        .filter_map(|i| i.widget.as_ref())
        .find(|w| w.widget_ref() == widget_ref)
}

/// Distinct insight refs used by the layout, in layout order.
pub fn insight_refs(state: &LayoutState) -> Vec<ObjRef> {
    let mut out: Vec<ObjRef> = Vec::new();
    for widget in state
        .layout
        .sections
        .iter()
        .flat_map(|s| s.items.iter())
        .filter_map(|i| i.widget.as_ref())
    {
        for r in widget.insight_refs() {
            if !out.contains(r) {
                out.push(r.clone());
            }
        }
    }
    out
}

pub fn stashed_items<'a>(state: &'a LayoutState, stash_id: &str) -> Option<&'a [DashboardLayoutItem]> {
    state.stash.get(stash_id).map(Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_core::{RichTextWidget, SectionHeader};

    fn text_item(id: &str) -> DashboardLayoutItem {
        DashboardLayoutItem::new(
            Widget::RichText(RichTextWidget {
                widget_ref: ObjRef::id(id),
                title: id.to_uppercase(),
                content: String::new(),
            }),
            6,
        )
    }

    fn section(title: &str, items: Vec<DashboardLayoutItem>) -> DashboardLayoutSection {
        DashboardLayoutSection::new(
            Some(SectionHeader {
                title: Some(title.into()),
                description: None,
            }),
            items,
        )
    }

    fn titles(state: &LayoutState) -> Vec<String> {
        state
            .layout
            .sections
            .iter()
            .map(|s| s.header.as_ref().and_then(|h| h.title.clone()).unwrap_or_default())
            .collect()
    }

    fn with_sections(sections: Vec<DashboardLayoutSection>) -> LayoutState {
        let mut state = LayoutState::default();
        reduce(
            &mut state,
            LayoutAction::SetLayout(DashboardLayout {
                sections,
                ..Default::default()
            }),
        )
        .unwrap();
        state
    }

    #[test]
    fn test_add_and_move_sections() {
        let mut state = with_sections(vec![section("a", vec![]), section("b", vec![])]);
        reduce(
            &mut state,
            LayoutAction::AddSection {
                index: -1,
                section: section("c", vec![]),
                consumed_stashes: vec![],
            },
        )
        .unwrap();
        reduce(&mut state, LayoutAction::MoveSection { from: 2, to: 0 }).unwrap();
        assert_eq!(titles(&state), vec!["c", "a", "b"]);
        reduce(&mut state, LayoutAction::MoveSection { from: 0, to: -1 }).unwrap();
        assert_eq!(titles(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_item_stashes_and_eagerly_drops_section() {
        let mut state = with_sections(vec![section("a", vec![text_item("w1")]), section("b", vec![])]);
        reduce(
            &mut state,
            LayoutAction::RemoveItem {
                section: 0,
                index: 0,
                stash_id: Some("s1".into()),
                eager: true,
            },
        )
        .unwrap();
        assert_eq!(titles(&state), vec!["b"]);
        assert_eq!(stashed_items(&state, "s1").unwrap().len(), 1);

        let items = stashed_items(&state, "s1").unwrap().to_vec();
        reduce(
            &mut state,
            LayoutAction::AddItems {
                section: 0,
                index: -1,
                items,
                consumed_stashes: vec!["s1".into()],
            },
        )
        .unwrap();
        assert!(state.stash.is_empty());
        assert!(find_widget(&state, &ObjRef::id("w1")).is_some());
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut state = with_sections(vec![section("a", vec![])]);
        let err = reduce(
            &mut state,
            LayoutAction::RemoveItem {
                section: 0,
                index: 0,
                stash_id: None,
                eager: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfRange { what: "item", .. }));
        assert!(state.undo.is_empty());
    }

    #[test]
    fn test_undo_restores_previous_layout() {
        let mut state = with_sections(vec![section("a", vec![text_item("w1")])]);
        let original = state.layout.clone();
        reduce(
            &mut state,
            LayoutAction::ChangeWidgetHeader {
                widget_ref: ObjRef::id("w1"),
                title: "Renamed".into(),
            },
        )
        .unwrap();
        assert_eq!(find_widget(&state, &ObjRef::id("w1")).unwrap().title(), "Renamed");
        reduce(&mut state, LayoutAction::Undo).unwrap();
        assert_eq!(state.layout, original);
        assert_eq!(reduce(&mut state, LayoutAction::Undo), Err(StoreError::NothingToUndo));
    }

    #[test]
    fn test_reset_to_original() {
        let mut state = with_sections(vec![section("a", vec![])]);
        reduce(&mut state, LayoutAction::RemoveSection { index: 0, stash_id: None }).unwrap();
        assert!(state.layout.sections.is_empty());
        reduce(&mut state, LayoutAction::ResetToOriginal).unwrap();
        assert_eq!(titles(&state), vec!["a"]);
        assert!(state.undo.is_empty());
    }

    #[test]
    fn test_set_original_leaves_live_layout_alone() {
        let mut state = with_sections(vec![section("a", vec![]), section("b", vec![])]);
        let saved = state.layout.clone();
        reduce(&mut state, LayoutAction::RemoveSection { index: 0, stash_id: None }).unwrap();
        reduce(&mut state, LayoutAction::SetOriginal(saved.clone())).unwrap();
        assert_eq!(titles(&state), vec!["b"]);
        assert_eq!(state.undo.len(), 1);

        reduce(&mut state, LayoutAction::ResetToOriginal).unwrap();
        assert_eq!(state.layout, saved);
    }

    fn item_ids(state: &LayoutState, section: usize) -> Vec<String> {
        state.layout.sections[section]
            .items
            .iter()
            .filter_map(|i| i.widget.as_ref())
            .map(|w| w.widget_ref().to_string())
            .collect()
    }

    #[test]
    fn test_change_section_header_merges_or_replaces() {
        let mut state = with_sections(vec![DashboardLayoutSection::new(
            Some(SectionHeader {
                title: Some("Sales".into()),
                description: Some("All regions".into()),
            }),
            vec![],
        )]);
        reduce(
            &mut state,
            LayoutAction::ChangeSectionHeader {
                index: 0,
                header: SectionHeader {
                    title: Some("Revenue".into()),
                    description: None,
                },
                merge: true,
            },
        )
        .unwrap();
        assert_eq!(
            state.layout.sections[0].header,
            Some(SectionHeader {
                title: Some("Revenue".into()),
                description: Some("All regions".into()),
            })
        );

        reduce(
            &mut state,
            LayoutAction::ChangeSectionHeader {
                index: 0,
                header: SectionHeader {
                    title: Some("Costs".into()),
                    description: None,
                },
                merge: false,
            },
        )
        .unwrap();
        assert_eq!(state.layout.sections[0].header.as_ref().unwrap().description, None);
        assert_eq!(state.undo.len(), 2);

        let err = reduce(
            &mut state,
            LayoutAction::ChangeSectionHeader {
                index: 3,
                header: SectionHeader::default(),
                merge: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfRange { what: "section", .. }));
    }

    #[test]
    fn test_move_item_within_and_across_sections() {
        let mut state = with_sections(vec![
            section("a", vec![text_item("w1"), text_item("w2"), text_item("w3")]),
            section("b", vec![text_item("w4")]),
        ]);
        reduce(
            &mut state,
            LayoutAction::MoveItem {
                section: 0,
                index: 0,
                to_section: 0,
                to_index: -1,
            },
        )
        .unwrap();
        assert_eq!(item_ids(&state, 0), vec!["w2", "w3", "w1"]);

        reduce(
            &mut state,
            LayoutAction::MoveItem {
                section: 0,
                index: -1,
                to_section: 1,
                to_index: 0,
            },
        )
        .unwrap();
        assert_eq!(item_ids(&state, 0), vec!["w2", "w3"]);
        assert_eq!(item_ids(&state, 1), vec!["w1", "w4"]);

        let before = state.clone();
        let err = reduce(
            &mut state,
            LayoutAction::MoveItem {
                section: 0,
                index: 0,
                to_section: 1,
                to_index: 5,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfRange { what: "item", .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_replace_item_stashes_the_old_one() {
        let mut state = with_sections(vec![section("a", vec![text_item("w1"), text_item("w2")])]);
        state.stash.insert("old".into(), vec![text_item("w9")]);
        reduce(
            &mut state,
            LayoutAction::ReplaceItem {
                section: 0,
                index: 0,
                items: vec![text_item("w3")],
                stash_id: Some("s1".into()),
                consumed_stashes: vec!["old".into()],
            },
        )
        .unwrap();
        assert_eq!(item_ids(&state, 0), vec!["w3", "w2"]);
        assert!(stashed_items(&state, "old").is_none());
        let stashed = stashed_items(&state, "s1").unwrap();
        assert_eq!(stashed[0].widget.as_ref().unwrap().widget_ref(), &ObjRef::id("w1"));

        reduce(&mut state, LayoutAction::Undo).unwrap();
        assert_eq!(item_ids(&state, 0), vec!["w1", "w2"]);
        assert!(stashed_items(&state, "old").is_some());
    }

    #[test]
    fn test_screen_is_not_undoable() {
        let mut state = LayoutState::default();
        reduce(&mut state, LayoutAction::SetScreen(ScreenSize::Lg)).unwrap();
        assert_eq!(state.screen, Some(ScreenSize::Lg));
        assert!(state.undo.is_empty());
    }

    #[test]
    fn test_layout_round_trips_through_fresh_state() {
        let state = with_sections(vec![section("a", vec![text_item("w1"), text_item("w2")])]);
        let json = serde_json::to_value(&state.layout).unwrap();
        let loaded: DashboardLayout = serde_json::from_value(json).unwrap();
        let fresh = with_sections(loaded.sections.clone());
        assert_eq!(fresh.layout, state.layout);
    }
}
