//! Credit propagation.
//!
//! A changed node is written back into its parent, the parent's credit is
//! recomputed, and so on up to the node without a parent. Each step builds a
//! new parent value from the new child; the input tree is never modified.

use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::state::{ActivityState, SelectState, SequenceState};
use crate::util::trunc_for_log;

/// Replace the node with `changed.id()` inside `root` and recompute every
/// ancestor's credit. Returns the new root.
#[instrument(level = "debug", skip_all, fields(root = %root.id(), changed = %changed.id()))]
pub fn propagate_state_change_to_root(root: &ActivityState, changed: ActivityState) -> Result<ActivityState> {
    let states = root.gather_states();
    if !states.contains_key(changed.id()) {
        return Err(EngineError::ActivityNotFound(changed.id().to_string()));
    }

    let mut current = changed;
    while let Some(parent_id) = current.parent_id() {
        let parent = states
            .get(parent_id)
            .ok_or_else(|| EngineError::ActivityNotFound(parent_id.to_string()))?;
        current = replace_child(parent, current)?;
        debug!(target: "credit", id = %current.id(), credit = current.credit_achieved(), "Recomputed credit");
    }

    if current.id() != root.id() {
        return Err(EngineError::ChildNotFound { parent: root.id().to_string(), child: current.id().to_string() });
    }
    Ok(current)
}

/// Record a document's reported state and credit, keeping the best credit of
/// the current attempt, and propagate to the root.
#[instrument(level = "info", skip(root, doenet_state), fields(root = %root.id()))]
pub fn update_single_doc_state(
    root: &ActivityState,
    id: &str,
    doenet_state: serde_json::Value,
    credit_achieved: f64,
) -> Result<ActivityState> {
    if !(0.0..=1.0).contains(&credit_achieved) {
        return Err(EngineError::InvalidCredit(credit_achieved));
    }
    let node = root.find(id).ok_or_else(|| EngineError::ActivityNotFound(id.to_string()))?;
    let ActivityState::SingleDoc(doc) = node else {
        return Err(EngineError::WrongStateType { id: id.to_string(), expected: "singleDoc", actual: node.kind_name() });
    };

    let mut doc = doc.clone();
    debug!(
        target: "credit",
        %id,
        reported = credit_achieved,
        previous = doc.credit_achieved,
        state = %trunc_for_log(&doenet_state.to_string(), 120),
        "Document reported"
    );
    doc.credit_achieved = doc.credit_achieved.max(credit_achieved);
    doc.doenet_state = Some(doenet_state);
    propagate_state_change_to_root(root, ActivityState::SingleDoc(doc))
}

/// Equal-weight mean over the current picks.
pub fn select_credit(state: &SelectState) -> f64 {
    if state.selected_children.is_empty() {
        return 0.0;
    }
    let sum: f64 = state.selected_children.iter().map(ActivityState::credit_achieved).sum();
    sum / state.selected_children.len() as f64
}

/// Weighted mean over scored (non-description) children in source order.
pub fn sequence_credit(state: &SequenceState) -> f64 {
    let mut total_weight = 0.0;
    let mut weighted = 0.0;
    for (idx, child) in state.latest_child_states.iter().enumerate() {
        if child.is_description() {
            continue;
        }
        let weight = state.source.weight(idx);
        total_weight += weight;
        weighted += weight * child.credit_achieved();
    }
    if total_weight > 0.0 { weighted / total_weight } else { 0.0 }
}

fn replace_child(parent: &ActivityState, child: ActivityState) -> Result<ActivityState> {
    let missing = || EngineError::ChildNotFound { parent: parent.id().to_string(), child: child.id().to_string() };
    match parent {
        ActivityState::SingleDoc(_) => Err(missing()),
        ActivityState::Select(s) => {
            let pos = s.all_children.iter().position(|c| c.id() == child.id()).ok_or_else(missing)?;
            let mut s = s.clone();
            if let Some(sel) = s.selected_children.iter().position(|c| c.id() == child.id()) {
                s.selected_children[sel] = child.clone();
            }
            s.all_children[pos] = child;
            s.credit_achieved = s.credit_achieved.max(select_credit(&s));
            Ok(ActivityState::Select(s))
        }
        ActivityState::Sequence(s) => {
            let pos = s.latest_child_states.iter().position(|c| c.id() == child.id()).ok_or_else(missing)?;
            let mut s = s.clone();
            if let Some(attempt) = s.attempts.last_mut() {
                if let Some(shown) = attempt.activities.iter().position(|c| c.id() == child.id()) {
                    attempt.activities[shown] = child.clone();
                }
            }
            s.latest_child_states[pos] = child;
            let computed = sequence_credit(&s);
            if let Some(attempt) = s.attempts.last_mut() {
                attempt.credit_achieved = attempt.credit_achieved.max(computed);
            }
            s.credit_achieved = s.credit_achieved.max(computed);
            Ok(ActivityState::Sequence(s))
        }
    }
}
