//! Attempt generation entry point shared by the three node kinds.

use tracing::instrument;

use crate::error::Result;
use crate::select::generate_new_select_attempt;
use crate::sequence::generate_new_sequence_attempt;
use crate::single_doc::generate_new_single_doc_attempt;
use crate::state::{ActivityState, NumVariantsTable};

/// A freshly generated attempt plus the question counter to hand to the next
/// activity shown after it.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAttempt<S> {
  pub state: S,
  pub final_question_counter: u32,
}

impl<S> NewAttempt<S> {
  pub fn map<T>(self, f: impl FnOnce(S) -> T) -> NewAttempt<T> {
    NewAttempt { state: f(self.state), final_question_counter: self.final_question_counter }
  }
}

/// Generate a new attempt for `state` and, recursively, for everything it shows.
///
/// `reset_credit` controls whether sequences drop their accumulated credit;
/// documents and selects always start a new attempt at 0.
#[instrument(level = "debug", skip(state, num_variants), fields(id = %state.id(), kind = state.kind_name()))]
pub fn generate_new_activity_attempt(
  state: &ActivityState,
  num_variants: &NumVariantsTable,
  initial_question_counter: u32,
  parent_attempt: u32,
  reset_credit: bool,
) -> Result<NewAttempt<ActivityState>> {
  Ok(match state {
    ActivityState::SingleDoc(s) => {
      generate_new_single_doc_attempt(s, num_variants, initial_question_counter, parent_attempt)?
        .map(ActivityState::SingleDoc)
    }
    ActivityState::Select(s) => {
      generate_new_select_attempt(s, num_variants, initial_question_counter, parent_attempt, reset_credit)?
        .map(ActivityState::Select)
    }
    ActivityState::Sequence(s) => {
      generate_new_sequence_attempt(s, num_variants, initial_question_counter, parent_attempt, reset_credit)?
        .map(ActivityState::Sequence)
    }
  })
}

/// Shift a draw over a dense range past every excluded value.
///
/// `excluded` must be sorted ascending; each excluded value at or below the
/// running draw pushes it up by one.
pub(crate) fn skip_excluded<T>(mut draw: T, excluded: &[T]) -> T
where
  T: Copy + PartialOrd + std::ops::AddAssign + From<u8>,
{
  for &e in excluded {
    if e <= draw {
      draw += T::from(1);
    }
  }
  draw
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn skip_excluded_lands_on_free_slots() {
    // 1..=5 with 2 and 3 excluded: draws 1, 2, 3 map to 1, 4, 5.
    let excluded = [2u32, 3];
    assert_eq!(skip_excluded(1u32, &excluded), 1);
    assert_eq!(skip_excluded(2u32, &excluded), 4);
    assert_eq!(skip_excluded(3u32, &excluded), 5);
  }

  #[test]
  fn skip_excluded_zero_based() {
    let excluded = [0usize, 1, 4];
    assert_eq!(skip_excluded(0usize, &excluded), 2);
    assert_eq!(skip_excluded(1usize, &excluded), 3);
    assert_eq!(skip_excluded(2usize, &excluded), 5);
  }
}
