//! The action protocol as a pure reducer.
//!
//! Each action maps `(old state, action, tables)` to a new state plus the
//! events a transport adapter should deliver. Nothing here performs I/O; a
//! failed action leaves the caller's state untouched.

use tracing::{info, instrument};

use crate::attempt::generate_new_activity_attempt;
use crate::error::{EngineError, Result};
use crate::propagate::{propagate_state_change_to_root, update_single_doc_state};
use crate::report::{extract_activity_item_credit, ItemCredit};
use crate::select::generate_new_single_doc_attempt_for_multi_select;
use crate::serialize::{prune_activity_state_for_save, ActivityStateNoSource};
use crate::source::{validate_source, ActivitySource};
use crate::state::{initialize_activity_state, ActivityState, NumVariantsTable};

/// `parent_attempt` used when generating an attempt for the root.
pub const ROOT_PARENT_ATTEMPT: u32 = 1;

#[derive(Clone, Debug)]
pub enum ActivityAction {
  Initialize { source: ActivitySource, variant_index: u64 },
  Set { state: ActivityState },
  /// New attempt for the whole tree (`id: None`) or for one subtree.
  GenerateNewActivityAttempt { id: Option<String> },
  /// Item-level retry of one document.
  GenerateSingleDocSubActivityAttempt { doc_id: String },
  UpdateSingleState { id: String, doenet_state: serde_json::Value, credit_achieved: f64 },
}

/// Tables the reducer reads but never changes.
#[derive(Clone, Copy, Debug)]
pub struct ReduceContext<'a> {
  pub num_variants: &'a NumVariantsTable,
  pub initial_question_counter: u32,
}

/// Outputs for the boundary adapter.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
  NewAttempt {
    id: String,
    #[serde(rename = "attemptNumber")]
    attempt_number: u32,
  },
  ScoreAndState {
    score: f64,
    state: ActivityStateNoSource,
    #[serde(rename = "itemScores")]
    item_scores: Vec<ItemCredit>,
  },
}

#[derive(Clone, Debug)]
pub struct Reduced {
  pub state: ActivityState,
  pub events: Vec<EngineEvent>,
}

#[instrument(level = "info", skip_all, fields(root = ?state.map(|s| s.id())))]
pub fn activity_state_reducer(
  state: Option<&ActivityState>,
  action: ActivityAction,
  ctx: ReduceContext<'_>,
) -> Result<Reduced> {
  match action {
    ActivityAction::Initialize { source, variant_index } => {
      validate_source(&source)?;
      let state = initialize_activity_state(&source, variant_index, ctx.num_variants)?;
      info!(target: "activity_engine", root = %state.id(), variant_index, "Initialized activity");
      Ok(Reduced { state, events: Vec::new() })
    }

    ActivityAction::Set { state } => Ok(Reduced { state, events: Vec::new() }),

    ActivityAction::GenerateNewActivityAttempt { id } => {
      let root = state.ok_or(EngineError::Uninitialized)?;
      let new_root = match id.as_deref() {
        None => {
          generate_new_activity_attempt(root, ctx.num_variants, ctx.initial_question_counter, ROOT_PARENT_ATTEMPT, true)?
            .state
        }
        Some(id) => {
          let node = root.find(id).ok_or_else(|| EngineError::ActivityNotFound(id.to_string()))?;
          regenerate_subtree(root, node, ctx)?
        }
      };
      let target = id.as_deref().unwrap_or(new_root.id());
      let attempt_number = new_root.find(target).map(ActivityState::attempt_number).unwrap_or_default();
      info!(target: "activity_engine", id = %target, attempt_number, "Generated new attempt");
      let events = vec![
        EngineEvent::NewAttempt { id: target.to_string(), attempt_number },
        score_and_state(&new_root),
      ];
      Ok(Reduced { state: new_root, events })
    }

    ActivityAction::GenerateSingleDocSubActivityAttempt { doc_id } => {
      let root = state.ok_or(EngineError::Uninitialized)?;
      let new_root = generate_single_doc_sub_activity_attempt(root, &doc_id, ctx)?;
      let events = vec![score_and_state(&new_root)];
      Ok(Reduced { state: new_root, events })
    }

    ActivityAction::UpdateSingleState { id, doenet_state, credit_achieved } => {
      let root = state.ok_or(EngineError::Uninitialized)?;
      let new_root = update_single_doc_state(root, &id, doenet_state, credit_achieved)?;
      let events = vec![score_and_state(&new_root)];
      Ok(Reduced { state: new_root, events })
    }
  }
}

/// Retry one document without disturbing the rest of the activity.
///
/// - parent is a select showing several picks: redraw just that pick
/// - parent is a select showing one pick: new attempt for the select
/// - otherwise: new attempt for the document alone
#[instrument(level = "info", skip(root, ctx), fields(root = %root.id()))]
pub fn generate_single_doc_sub_activity_attempt(
  root: &ActivityState,
  doc_id: &str,
  ctx: ReduceContext<'_>,
) -> Result<ActivityState> {
  let node = root.find(doc_id).ok_or_else(|| EngineError::ActivityNotFound(doc_id.to_string()))?;
  if !matches!(node, ActivityState::SingleDoc(_)) {
    return Err(EngineError::WrongStateType { id: doc_id.to_string(), expected: "singleDoc", actual: node.kind_name() });
  }
  let parent = match node.parent_id() {
    Some(pid) => Some(root.find(pid).ok_or_else(|| EngineError::ActivityNotFound(pid.to_string()))?),
    None => None,
  };

  match parent {
    Some(ActivityState::Select(select)) if select.source.num_to_select > 1 => {
      let new_select = generate_new_single_doc_attempt_for_multi_select(select, doc_id, ctx.num_variants)?;
      propagate_state_change_to_root(root, ActivityState::Select(new_select))
    }
    Some(select) if matches!(select, ActivityState::Select(_)) => regenerate_subtree(root, select, ctx),
    _ => regenerate_subtree(root, node, ctx),
  }
}

/// New attempt for `node` alone, numbered from where its questions started,
/// then propagated to the root.
fn regenerate_subtree(root: &ActivityState, node: &ActivityState, ctx: ReduceContext<'_>) -> Result<ActivityState> {
  let parent_attempt = match node.parent_id() {
    Some(pid) => root
      .find(pid)
      .ok_or_else(|| EngineError::ActivityNotFound(pid.to_string()))?
      .attempt_number(),
    None => ROOT_PARENT_ATTEMPT,
  };
  let question_counter = node
    .first_question_counter()
    .filter(|&c| c > 0)
    .unwrap_or(ctx.initial_question_counter);
  let reset_credit = node.parent_id().is_none();
  let out = generate_new_activity_attempt(node, ctx.num_variants, question_counter, parent_attempt, reset_credit)?;
  propagate_state_change_to_root(root, out.state)
}

fn score_and_state(state: &ActivityState) -> EngineEvent {
  EngineEvent::ScoreAndState {
    score: state.credit_achieved(),
    state: prune_activity_state_for_save(state),
    item_scores: extract_activity_item_credit(state),
  }
}
