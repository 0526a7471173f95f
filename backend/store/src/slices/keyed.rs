//! Slices keyed by serialized object ref with upsert semantics.

use std::collections::BTreeMap;

use serde::Serialize;
use tessera_core::{serialize_obj_ref, DrillTargets, ExecutionResult, ObjRef};

/// Entity stored in a [`KeyedSlice`].
pub trait Keyed {
    fn key_ref(&self) -> &ObjRef;

    fn key(&self) -> String {
        serialize_obj_ref(self.key_ref())
    }
}

impl Keyed for ExecutionResult {
    fn key_ref(&self) -> &ObjRef {
        &self.widget_ref
    }
}

impl Keyed for DrillTargets {
    fn key_ref(&self) -> &ObjRef {
        &self.widget_ref
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KeyedSlice<T> {
    pub entries: BTreeMap<String, T>,
}

impl<T> Default for KeyedSlice<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyedAction<T> {
    /// Replace whatever is stored under the entity's key.
    Upsert(T),
    Remove(ObjRef),
    Clear,
}

pub fn reduce<T: Keyed>(state: &mut KeyedSlice<T>, action: KeyedAction<T>) {
    match action {
        KeyedAction::Upsert(entity) => {
            state.entries.insert(entity.key(), entity);
        }
        KeyedAction::Remove(r) => {
            state.entries.remove(&serialize_obj_ref(&r));
        }
        KeyedAction::Clear => state.entries.clear(),
    }
}

pub fn get<'a, T>(state: &'a KeyedSlice<T>, r: &ObjRef) -> Option<&'a T> {
    state.entries.get(&serialize_obj_ref(r))
}
