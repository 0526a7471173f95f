use std::collections::HashMap;

use serde::Serialize;
use tessera_core::{serialize_obj_ref, Insight, ObjRef};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightsState {
    pub by_ref: HashMap<String, Insight>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsightsAction {
    Upsert(Vec<Insight>),
    Clear,
}

pub fn reduce(state: &mut InsightsState, action: InsightsAction) {
    match action {
        InsightsAction::Upsert(insights) => {
            for insight in insights {
                state
                    .by_ref
                    .insert(serialize_obj_ref(&insight.insight_ref), insight);
            }
        }
        InsightsAction::Clear => state.by_ref.clear(),
    }
}

pub fn get<'a>(state: &'a InsightsState, r: &ObjRef) -> Option<&'a Insight> {
    state.by_ref.get(&serialize_obj_ref(r))
}

/// Refs from `refs` that are not loaded yet, first occurrence only.
pub fn missing(state: &InsightsState, refs: &[ObjRef]) -> Vec<ObjRef> {
    let mut out: Vec<ObjRef> = Vec::new();
    for r in refs {
        if get(state, r).is_none() && !out.contains(r) {
            out.push(r.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing() {
        let mut state = InsightsState::default();
        reduce(
            &mut state,
            InsightsAction::Upsert(vec![Insight {
                insight_ref: ObjRef::id("a"),
                title: "A".into(),
                visualization_url: "local:bar".into(),
            }]),
        );
        let refs = vec![ObjRef::id("a"), ObjRef::id("b"), ObjRef::id("b")];
        assert_eq!(missing(&state, &refs), vec![ObjRef::id("b")]);
    }
}
