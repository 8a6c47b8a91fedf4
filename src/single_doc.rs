//! New attempts for a single document.
//!
//! Variants are drawn without replacement in cycles: the last
//! `previous_variants.len() % num_variants` variants are excluded from each
//! draw, so every variant is shown once before any repeats.

use tracing::{debug, instrument};

use crate::attempt::{skip_excluded, NewAttempt};
use crate::error::{EngineError, Result};
use crate::rng::{attempt_key, SeededRng};
use crate::state::{NumVariantsTable, SingleDocState};
use crate::variants::{num_document_variants, num_variants_in_slice, slice_to_variant, variant_to_slice_draw};

#[instrument(level = "debug", skip(state, num_variants), fields(id = %state.id, attempt = state.attempt_number))]
pub fn generate_new_single_doc_attempt(
  state: &SingleDocState,
  num_variants: &NumVariantsTable,
  initial_question_counter: u32,
  parent_attempt: u32,
) -> Result<NewAttempt<SingleDocState>> {
  let total = num_document_variants(&state.source, num_variants);
  let slice = state.restrict_to_variant_slice;
  let n = match slice {
    Some(s) => match num_variants_in_slice(total, s) {
      0 => return Err(EngineError::EmptyVariantSlice { id: state.id.clone(), idx: s.idx, num_slices: s.num_slices }),
      n => n,
    },
    None => total,
  };

  // Previous variants expressed as 1-based draws within this node's range.
  let previous_draws: Vec<u32> = state
    .previous_variants
    .iter()
    .filter_map(|&v| match slice {
      Some(s) => variant_to_slice_draw(v, s),
      None => Some(v),
    })
    .filter(|&d| d >= 1 && d <= n)
    .collect();

  let num_to_exclude = previous_draws.len() % n as usize;
  let mut excluded: Vec<u32> = previous_draws[previous_draws.len() - num_to_exclude..].to_vec();
  excluded.sort_unstable();
  excluded.dedup();
  if excluded.len() != num_to_exclude {
    return Err(EngineError::ExclusionWindowMismatch {
      id: state.id.clone(),
      expected: n as usize - num_to_exclude,
      found: n as usize - excluded.len(),
    });
  }

  let key = attempt_key(state.initial_variant, &state.id, state.attempt_number, parent_attempt);
  let mut rng = SeededRng::from_key(&key);
  let raw = rng.below(n as usize - num_to_exclude) as u32 + 1;
  let draw = skip_excluded(raw, &excluded);
  let variant = match slice {
    Some(s) => slice_to_variant(draw, s),
    None => draw,
  };

  let mut new_state = state.clone();
  new_state.current_variant = variant;
  new_state.previous_variants.push(variant);
  new_state.attempt_number += 1;
  new_state.credit_achieved = 0.0;
  new_state.doenet_state = None;
  new_state.initial_question_counter = initial_question_counter;

  debug!(target: "attempt", id = %state.id, variant, num_variants = n, excluded = num_to_exclude, "New document attempt");

  Ok(NewAttempt {
    state: new_state,
    final_question_counter: initial_question_counter + state.source.num_questions(),
  })
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;
  use std::sync::Arc;

  use super::*;
  use crate::source::SingleDocSource;
  use crate::state::{initialize_single_doc_state, InitOptions, VariantSlice};

  fn doc_source(id: &str, questions: u32) -> Arc<SingleDocSource> {
    Arc::new(SingleDocSource::new(id).with_questions(questions))
  }

  fn table(id: &str, n: u32) -> NumVariantsTable {
    let mut t = NumVariantsTable::new();
    t.insert(id.into(), n);
    t
  }

  #[test]
  fn every_variant_once_per_cycle() {
    let mut state = initialize_single_doc_state(&doc_source("d", 1), 42, InitOptions::default());
    let t = table("d", 6);
    for _cycle in 0..3 {
      let mut seen = BTreeSet::new();
      for _ in 0..6 {
        state = generate_new_single_doc_attempt(&state, &t, 1, 1).unwrap().state;
        assert!(seen.insert(state.current_variant));
      }
      assert_eq!(seen, (1..=6).collect());
    }
    assert_eq!(state.previous_variants.len(), 18);
    assert_eq!(state.attempt_number, 18);
  }

  #[test]
  fn sliced_draws_stay_in_slice() {
    let opts = InitOptions {
      parent_id: Some("sel"),
      restrict_to_variant_slice: Some(VariantSlice { idx: 2, num_slices: 3 }),
      id_suffix: "|2",
    };
    let mut state = initialize_single_doc_state(&doc_source("d", 0), 9, opts);
    assert_eq!(state.id, "d|2");
    let t = table("d", 8); // slice 2 of 3 holds 2, 5, 8
    let mut seen = BTreeSet::new();
    for _ in 0..3 {
      state = generate_new_single_doc_attempt(&state, &t, 1, 1).unwrap().state;
      seen.insert(state.current_variant);
    }
    assert_eq!(seen, [2, 5, 8].into_iter().collect());
  }

  #[test]
  fn question_counter_advances_by_declared_questions() {
    let state = initialize_single_doc_state(&doc_source("d", 3), 1, InitOptions::default());
    let out = generate_new_single_doc_attempt(&state, &table("d", 2), 4, 1).unwrap();
    assert_eq!(out.state.initial_question_counter, 4);
    assert_eq!(out.final_question_counter, 7);
  }

  #[test]
  fn new_attempt_clears_credit_and_document_state() {
    let mut state = initialize_single_doc_state(&doc_source("d", 1), 1, InitOptions::default());
    state.credit_achieved = 0.8;
    state.doenet_state = Some(serde_json::json!({"answer": 3}));
    let next = generate_new_single_doc_attempt(&state, &table("d", 2), 1, 1).unwrap().state;
    assert_eq!(next.credit_achieved, 0.0);
    assert!(next.doenet_state.is_none());
  }

  #[test]
  fn repeated_window_entries_are_an_invariant_violation() {
    let mut state = initialize_single_doc_state(&doc_source("d", 1), 1, InitOptions::default());
    state.previous_variants = vec![2, 2];
    let err = generate_new_single_doc_attempt(&state, &table("d", 3), 1, 1).unwrap_err();
    assert!(matches!(err, EngineError::ExclusionWindowMismatch { .. }));
  }
}
