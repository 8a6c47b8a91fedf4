//! Persistence form of an activity state.
//!
//! Saved states carry every attempt, credit and child, but no `source`: the
//! source tree is large and is re-attached from the activity definition when
//! the state is loaded again.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{EngineError, Result};
use crate::source::ActivitySource;
use crate::state::{
    ActivityState, SelectState, SequenceAttemptState, SequenceState, SingleDocState, VariantSlice,
};
use crate::util::base_id;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActivityStateNoSource {
    SingleDoc(SingleDocStateNoSource),
    Select(SelectStateNoSource),
    Sequence(SequenceStateNoSource),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleDocStateNoSource {
    pub id: String,
    pub parent_id: Option<String>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    pub current_variant: u32,
    pub previous_variants: Vec<u32>,
    pub doenet_state: Option<serde_json::Value>,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub initial_question_counter: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectStateNoSource {
    pub id: String,
    pub parent_id: Option<String>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub all_children: Vec<ActivityStateNoSource>,
    pub selected_children: Vec<ActivityStateNoSource>,
    pub previous_selections: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStateNoSource {
    pub id: String,
    pub parent_id: Option<String>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub latest_child_states: Vec<ActivityStateNoSource>,
    pub attempts: Vec<SequenceAttemptStateNoSource>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAttemptStateNoSource {
    pub activities: Vec<ActivityStateNoSource>,
    pub credit_achieved: f64,
}

impl ActivityStateNoSource {
    pub fn id(&self) -> &str {
        match self {
            ActivityStateNoSource::SingleDoc(s) => &s.id,
            ActivityStateNoSource::Select(s) => &s.id,
            ActivityStateNoSource::Sequence(s) => &s.id,
        }
    }
}

/// Strip every `source` from the tree.
pub fn prune_activity_state_for_save(state: &ActivityState) -> ActivityStateNoSource {
    match state {
        ActivityState::SingleDoc(s) => ActivityStateNoSource::SingleDoc(SingleDocStateNoSource {
            id: s.id.clone(),
            parent_id: s.parent_id.clone(),
            initial_variant: s.initial_variant,
            credit_achieved: s.credit_achieved,
            attempt_number: s.attempt_number,
            current_variant: s.current_variant,
            previous_variants: s.previous_variants.clone(),
            doenet_state: s.doenet_state.clone(),
            restrict_to_variant_slice: s.restrict_to_variant_slice,
            initial_question_counter: s.initial_question_counter,
        }),
        ActivityState::Select(s) => ActivityStateNoSource::Select(SelectStateNoSource {
            id: s.id.clone(),
            parent_id: s.parent_id.clone(),
            initial_variant: s.initial_variant,
            credit_achieved: s.credit_achieved,
            attempt_number: s.attempt_number,
            restrict_to_variant_slice: s.restrict_to_variant_slice,
            all_children: prune_all(&s.all_children),
            selected_children: prune_all(&s.selected_children),
            previous_selections: s.previous_selections.clone(),
        }),
        ActivityState::Sequence(s) => ActivityStateNoSource::Sequence(SequenceStateNoSource {
            id: s.id.clone(),
            parent_id: s.parent_id.clone(),
            initial_variant: s.initial_variant,
            credit_achieved: s.credit_achieved,
            attempt_number: s.attempt_number,
            restrict_to_variant_slice: s.restrict_to_variant_slice,
            latest_child_states: prune_all(&s.latest_child_states),
            attempts: s
                .attempts
                .iter()
                .map(|a| SequenceAttemptStateNoSource {
                    activities: prune_all(&a.activities),
                    credit_achieved: a.credit_achieved,
                })
                .collect(),
        }),
    }
}

fn prune_all(states: &[ActivityState]) -> Vec<ActivityStateNoSource> {
    states.iter().map(prune_activity_state_for_save).collect()
}

/// Re-attach sources to a saved tree, matching children to source items by
/// their id with any `|N` suffix removed.
pub fn add_source_to_activity_state(state: &ActivityStateNoSource, source: &ActivitySource) -> Result<ActivityState> {
    let mismatch = || EngineError::SourceMismatch { source_id: source.id().to_string(), state_id: state.id().to_string() };
    if base_id(state.id()) != source.id() {
        return Err(mismatch());
    }

    match (state, source) {
        (ActivityStateNoSource::SingleDoc(s), ActivitySource::SingleDoc(src)) => {
            Ok(ActivityState::SingleDoc(SingleDocState {
                id: s.id.clone(),
                parent_id: s.parent_id.clone(),
                source: src.clone(),
                initial_variant: s.initial_variant,
                credit_achieved: s.credit_achieved,
                attempt_number: s.attempt_number,
                current_variant: s.current_variant,
                previous_variants: s.previous_variants.clone(),
                doenet_state: s.doenet_state.clone(),
                restrict_to_variant_slice: s.restrict_to_variant_slice,
                initial_question_counter: s.initial_question_counter,
            }))
        }
        (ActivityStateNoSource::Select(s), ActivitySource::Select(src)) => Ok(ActivityState::Select(SelectState {
            id: s.id.clone(),
            parent_id: s.parent_id.clone(),
            source: src.clone(),
            initial_variant: s.initial_variant,
            credit_achieved: s.credit_achieved,
            attempt_number: s.attempt_number,
            restrict_to_variant_slice: s.restrict_to_variant_slice,
            all_children: attach_by_id(&s.all_children, &src.items)?,
            selected_children: attach_by_id(&s.selected_children, &src.items)?,
            previous_selections: s.previous_selections.clone(),
        })),
        (ActivityStateNoSource::Sequence(s), ActivitySource::Sequence(src)) => {
            if s.latest_child_states.len() != src.items.len() {
                return Err(mismatch());
            }
            let latest_child_states = s
                .latest_child_states
                .iter()
                .zip(&src.items)
                .map(|(child, item)| add_source_to_activity_state(child, item))
                .collect::<Result<Vec<_>>>()?;
            let attempts = s
                .attempts
                .iter()
                .map(|a| {
                    Ok(SequenceAttemptState {
                        activities: attach_by_id(&a.activities, &src.items)?,
                        credit_achieved: a.credit_achieved,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ActivityState::Sequence(SequenceState {
                id: s.id.clone(),
                parent_id: s.parent_id.clone(),
                source: src.clone(),
                initial_variant: s.initial_variant,
                credit_achieved: s.credit_achieved,
                attempt_number: s.attempt_number,
                restrict_to_variant_slice: s.restrict_to_variant_slice,
                latest_child_states,
                attempts,
            }))
        }
        _ => Err(mismatch()),
    }
}

fn attach_by_id(states: &[ActivityStateNoSource], items: &[ActivitySource]) -> Result<Vec<ActivityState>> {
    states
        .iter()
        .map(|child| {
            let item = items.iter().find(|item| item.id() == base_id(child.id())).ok_or_else(|| {
                EngineError::SourceMismatch { source_id: base_id(child.id()).to_string(), state_id: child.id().to_string() }
            })?;
            add_source_to_activity_state(child, item)
        })
        .collect()
}

/// Persisted JSON blob for `state`.
#[instrument(level = "debug", skip_all, fields(root = %state.id()))]
pub fn save_state_json(state: &ActivityState) -> Result<String> {
    Ok(serde_json::to_string(&prune_activity_state_for_save(state))?)
}

/// Rehydrate a blob written by [`save_state_json`].
#[instrument(level = "debug", skip_all, fields(root = %source.id()))]
pub fn load_state_json(json: &str, source: &ActivitySource) -> Result<ActivityState> {
    let pruned: ActivityStateNoSource = serde_json::from_str(json)?;
    add_source_to_activity_state(&pruned, source)
}
