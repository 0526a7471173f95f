//! The dashboard store: the one shared mutable resource of a session.

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::selectors::DashboardSelectors;
use crate::state::{self, DashboardState, StoreAction};

pub struct DashboardStore {
    state: RwLock<DashboardState>,
    version: watch::Sender<u64>,
    selectors: DashboardSelectors,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::with_state(DashboardState::default())
    }

    pub fn with_state(state: DashboardState) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(state),
            version,
            selectors: DashboardSelectors::default(),
        }
    }

    /// Cheap snapshot: a bag of `Arc`s.
    pub fn state(&self) -> DashboardState {
        self.state.read().clone()
    }

    pub fn select<T>(&self, f: impl FnOnce(&DashboardState) -> T) -> T {
        f(&self.state.read())
    }

    pub fn selectors(&self) -> &DashboardSelectors {
        &self.selectors
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn dispatch(&self, action: StoreAction) -> Result<(), StoreError> {
        self.dispatch_and_select(action, |_| ())
    }

    /// Apply `action` and read the resulting state under the same lock.
    pub fn dispatch_and_select<T>(
        &self,
        action: StoreAction,
        f: impl FnOnce(&DashboardState) -> T,
    ) -> Result<T, StoreError> {
        let name = action.name();
        let mut guard = self.state.write();
        let mut next = guard.clone();
        if let Err(e) = state::reduce(&mut next, action) {
            warn!(action = name, error = %e, "store action rejected");
            return Err(e);
        }
        *guard = next;
        let out = f(&guard);
        drop(guard);

        self.version.send_modify(|v| *v += 1);
        debug!(action = name, version = self.version(), "store updated");
        Ok(out)
    }

    /// Apply `action` and evaluate `f` on the state right before and right
    /// after it, under the same lock.
    pub fn dispatch_with_diff<T>(
        &self,
        action: StoreAction,
        f: impl Fn(&DashboardState) -> T,
    ) -> Result<(T, T), StoreError> {
        let name = action.name();
        let mut guard = self.state.write();
        let before = f(&guard);
        let mut next = guard.clone();
        if let Err(e) = state::reduce(&mut next, action) {
            warn!(action = name, error = %e, "store action rejected");
            return Err(e);
        }
        *guard = next;
        let after = f(&guard);
        drop(guard);

        self.version.send_modify(|v| *v += 1);
        debug!(action = name, version = self.version(), "store updated");
        Ok((before, after))
    }

    /// Apply `action` only if `guard` holds on the current state. Returns
    /// whether it was applied.
    pub fn dispatch_if(
        &self,
        guard: impl FnOnce(&DashboardState) -> bool,
        action: StoreAction,
    ) -> Result<bool, StoreError> {
        let name = action.name();
        let mut current = self.state.write();
        if !guard(&current) {
            debug!(action = name, "store action skipped by guard");
            return Ok(false);
        }
        let mut next = current.clone();
        state::reduce(&mut next, action)?;
        *current = next;
        drop(current);

        self.version.send_modify(|v| *v += 1);
        Ok(true)
    }

    /// Resolve once `predicate` holds, re-checking after every dispatch.
    pub async fn wait_for(&self, predicate: impl Fn(&DashboardState) -> bool) -> DashboardState {
        let mut rx = self.version.subscribe();
        loop {
            let snapshot = self.state();
            if predicate(&snapshot) {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slices::render::{self, RenderAction};
    use crate::slices::ui::UiAction;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_failed_batch_leaves_state_untouched() {
        let store = DashboardStore::new();
        let before = store.state();
        let result = store.dispatch(StoreAction::Batch(vec![
            RenderAction::Request("a".into()).into(),
            crate::slices::layout::LayoutAction::Undo.into(),
        ]));
        assert_eq!(result, Err(StoreError::NothingToUndo));
        assert!(Arc::ptr_eq(&before.render, &store.state().render));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_memoized_selector_survives_unrelated_dispatch() {
        let store = DashboardStore::new();
        let first = store.selectors().widgets(&store.state());
        store.dispatch(UiAction::EventTriggered.into()).unwrap();
        let second = store.selectors().widgets(&store.state());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dispatch_with_diff() {
        let store = DashboardStore::new();
        store.dispatch(RenderAction::Request("a".into()).into()).unwrap();
        let (before, after) = store
            .dispatch_with_diff(RenderAction::Resolve("a".into()).into(), |s| s.render.completions)
            .unwrap();
        assert_eq!((before, after), (0, 1));
    }

    #[test]
    fn test_dispatch_if() {
        let store = DashboardStore::new();
        let applied = store
            .dispatch_if(|s| s.render.completions == 7, RenderAction::Request("a".into()).into())
            .unwrap();
        assert!(!applied);
        assert!(store.select(|s| s.render.pending.is_empty()));
    }

    #[tokio::test]
    async fn test_wait_for_wakes_on_dispatch() {
        let store = Arc::new(DashboardStore::new());
        store.dispatch(RenderAction::Request("a".into()).into()).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait_for(|s| render::is_all_resolved(&s.render)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.dispatch(RenderAction::Resolve("a".into()).into()).unwrap();

        let state = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.render.completions, 1);
    }
}
