//! Single-value caches: entitlements, permissions, backend capabilities, alerts.

use serde::Serialize;

/// A value loaded once and read afterwards. `None` until the first load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CachedValue<T> {
    pub value: Option<T>,
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> CachedValue<T> {
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction<T> {
    Set(T),
    Clear,
}

pub fn reduce<T>(state: &mut CachedValue<T>, action: CacheAction<T>) {
    match action {
        CacheAction::Set(value) => state.value = Some(value),
        CacheAction::Clear => state.value = None,
    }
}
