//! New attempts for a sequence.
//!
//! Descriptions are anchors: when shuffling, each run of items between anchors
//! is shuffled on its own and anchors keep their positions.

use tracing::{debug, instrument};

use crate::attempt::{generate_new_activity_attempt, NewAttempt};
use crate::error::Result;
use crate::rng::{shuffle_key, SeededRng};
use crate::state::{NumVariantsTable, SequenceAttemptState, SequenceState};

#[instrument(level = "debug", skip(state, num_variants), fields(id = %state.id, attempt = state.attempt_number))]
pub fn generate_new_sequence_attempt(
  state: &SequenceState,
  num_variants: &NumVariantsTable,
  initial_question_counter: u32,
  parent_attempt: u32,
  reset_credit: bool,
) -> Result<NewAttempt<SequenceState>> {
  let order = if state.source.shuffle {
    shuffled_order(state)
  } else {
    (0..state.latest_child_states.len()).collect()
  };

  // Children are attempted in display order so question numbers run top to bottom.
  let attempt_number = state.attempt_number + 1;
  let mut new_state = state.clone();
  let mut activities = Vec::with_capacity(order.len());
  let mut question_counter = initial_question_counter;
  for &idx in &order {
    let out = generate_new_activity_attempt(
      &state.latest_child_states[idx],
      num_variants,
      question_counter,
      attempt_number,
      reset_credit,
    )?;
    question_counter = out.final_question_counter;
    new_state.latest_child_states[idx] = out.state.clone();
    activities.push(out.state);
  }

  new_state.attempts.push(SequenceAttemptState { activities, credit_achieved: 0.0 });
  new_state.attempt_number = attempt_number;
  if reset_credit {
    new_state.credit_achieved = 0.0;
  }

  debug!(target: "attempt", id = %state.id, ?order, parent_attempt, "New sequence attempt");

  Ok(NewAttempt { state: new_state, final_question_counter: question_counter })
}

/// Source indices in display order for the next attempt.
fn shuffled_order(state: &SequenceState) -> Vec<usize> {
  let mut rng = SeededRng::from_key(&shuffle_key(state.initial_variant, &state.id, state.attempt_number));
  let children = &state.latest_child_states;
  let mut order: Vec<usize> = (0..children.len()).collect();

  let mut run_start = 0;
  for pos in 0..=children.len() {
    let is_anchor = pos == children.len() || children[pos].is_description();
    if is_anchor {
      fisher_yates(&mut rng, &mut order[run_start..pos]);
      run_start = pos + 1;
    }
  }
  order
}

fn fisher_yates(rng: &mut SeededRng, items: &mut [usize]) {
  for i in (1..items.len()).rev() {
    let j = rng.below(i + 1);
    items.swap(i, j);
  }
}
