mod common;

use activity_engine::reducer::ActivityAction;
use activity_engine::seeds::{demo_activity, demo_num_variants};
use activity_engine::serialize::{
  add_source_to_activity_state, load_state_json, prune_activity_state_for_save, save_state_json,
};
use activity_engine::{ActivityState, EngineError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use common::*;

/// Demo activity after a few attempts, reports and one item retry.
fn played_demo(variant_index: u64, attempts: usize) -> ActivityState {
  let src = demo_activity();
  let t = demo_num_variants();
  let mut state = started(&src, variant_index, &t);
  for _ in 1..attempts {
    state = reduce(&state, ActivityAction::GenerateNewActivityAttempt { id: None }, &t);
  }
  let picks = selected_ids(&state, "fraction_practice");
  state = report(&state, &picks[0], 0.7, &t);
  state = report(&state, "number_line", 1.0, &t);
  reduce(&state, ActivityAction::GenerateSingleDocSubActivityAttempt { doc_id: picks[1].clone() }, &t)
}

#[test]
fn pruned_state_carries_no_document_source() {
  let state = played_demo(1, 2);
  let json = serde_json::to_value(prune_activity_state_for_save(&state)).unwrap();
  let text = json.to_string();
  assert!(!text.contains("doenetML"));
  assert!(!text.contains("baseComponentCounts"));
  assert_eq!(json["type"], "sequence");
  assert_eq!(json["id"], "demo");
}

#[test]
fn prune_then_attach_restores_the_state() {
  let state = played_demo(7, 3);
  let pruned = prune_activity_state_for_save(&state);
  let restored = add_source_to_activity_state(&pruned, &demo_activity()).unwrap();
  assert_eq!(restored, state);
}

#[test]
fn json_blob_round_trips() {
  let state = played_demo(12, 2);
  let blob = save_state_json(&state).unwrap();
  let restored = load_state_json(&blob, &demo_activity()).unwrap();
  assert_eq!(restored, state);
}

#[test]
fn restored_state_keeps_generating_the_same_attempts() {
  let t = demo_num_variants();
  let state = played_demo(5, 2);
  let restored = load_state_json(&save_state_json(&state).unwrap(), &demo_activity()).unwrap();

  let next = reduce(&state, ActivityAction::GenerateNewActivityAttempt { id: None }, &t);
  let next_restored = reduce(&restored, ActivityAction::GenerateNewActivityAttempt { id: None }, &t);
  assert_eq!(next, next_restored);
}

#[test]
fn attaching_the_wrong_source_fails() {
  let state = played_demo(1, 1);
  let pruned = prune_activity_state_for_save(&state);
  let other = sequence("demo", vec![doc("elsewhere")]);
  let err = add_source_to_activity_state(&pruned, &other).unwrap_err();
  assert!(matches!(err, EngineError::SourceMismatch { .. }));
}

#[test]
fn malformed_blob_is_an_io_error() {
  let err = load_state_json("{\"type\":\"sequence\"", &demo_activity()).unwrap_err();
  assert_eq!(err.kind(), activity_engine::ErrorKind::Io);
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(32))]

  #[test]
  fn any_played_state_round_trips(variant_index in 1u64..1_000_000, attempts in 1usize..5) {
    let state = played_demo(variant_index, attempts);
    let restored = load_state_json(&save_state_json(&state).unwrap(), &demo_activity()).unwrap();
    prop_assert_eq!(restored, state);
  }
}
