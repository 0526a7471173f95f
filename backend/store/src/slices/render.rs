//! Async render barrier.
//!
//! Widgets register render units with `Request` and report them done with
//! `Resolve`. The barrier is closed while any unit is pending and counts how
//! many times it has closed-then-opened.

use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub pending: BTreeSet<String>,
    pub resolved: BTreeSet<String>,
    /// Incremented each time the last pending unit resolves.
    pub completions: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderAction {
    Request(String),
    Resolve(String),
    Reset,
}

pub fn reduce(state: &mut RenderState, action: RenderAction) {
    match action {
        RenderAction::Request(id) => {
            state.resolved.remove(&id);
            state.pending.insert(id);
        }
        RenderAction::Resolve(id) => {
            if state.pending.remove(&id) {
                state.resolved.insert(id);
                if state.pending.is_empty() {
                    state.completions += 1;
                }
            }
        }
        RenderAction::Reset => *state = RenderState::default(),
    }
}

/// Barrier is open: something was rendered and nothing is pending.
pub fn is_all_resolved(state: &RenderState) -> bool {
    state.pending.is_empty() && state.completions > 0
}

pub fn is_pending(state: &RenderState, id: &str) -> bool {
    state.pending.contains(id)
}
