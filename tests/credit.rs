mod common;

use activity_engine::reducer::{activity_state_reducer, ActivityAction, EngineEvent};
use activity_engine::report::{extract_activity_item_credit, item_sequence};
use activity_engine::{EngineError, ErrorKind};
use pretty_assertions::assert_eq;

use common::*;

#[test]
fn document_keeps_its_best_credit_within_an_attempt() {
  let src = sequence("root", vec![doc("d")]);
  let t = table(&[("d", 3)]);
  let mut state = started(&src, 1, &t);

  let mut seen = Vec::new();
  for credit in [0.2, 0.1, 0.3] {
    state = report(&state, "d", credit, &t);
    seen.push(doc_state(&state, "d").credit_achieved);
  }
  assert_eq!(seen, vec![0.2, 0.2, 0.3]);
  assert_eq!(state.credit_achieved(), 0.3);

  state = reduce(&state, ActivityAction::GenerateNewActivityAttempt { id: None }, &t);
  assert_eq!(doc_state(&state, "d").credit_achieved, 0.0);
  assert_eq!(state.credit_achieved(), 0.0);
}

#[test]
fn reported_state_is_stored_on_the_document() {
  let src = doc("d");
  let t = table(&[]);
  let state = started(&src, 1, &t);
  let payload = serde_json::json!({ "answers": [1, 2], "done": true });
  let action = ActivityAction::UpdateSingleState { id: "d".into(), doenet_state: payload.clone(), credit_achieved: 0.4 };
  let state = reduce(&state, action, &t);
  assert_eq!(doc_state(&state, "d").doenet_state, Some(payload));
  assert_eq!(state.credit_achieved(), 0.4);
}

#[test]
fn sequence_credit_is_weighted_and_skips_descriptions() {
  let src = weighted_sequence("root", vec![description("intro"), doc("a"), doc("b")], vec![0.0, 3.0, 1.0]);
  let t = table(&[]);
  let mut state = started(&src, 1, &t);

  state = report(&state, "a", 1.0, &t);
  assert_eq!(state.credit_achieved(), 0.75);
  state = report(&state, "b", 1.0, &t);
  assert_eq!(state.credit_achieved(), 1.0);
}

#[test]
fn missing_weights_count_as_one() {
  let src = sequence("root", vec![description("intro"), doc("a"), doc("b")]);
  let t = table(&[]);
  let state = report(&started(&src, 1, &t), "a", 1.0, &t);
  assert_eq!(state.credit_achieved(), 0.5);
}

#[test]
fn select_credit_is_the_mean_of_its_picks() {
  let src = sequence("root", vec![select("sel", vec![doc("a"), doc("b"), doc("c"), doc("d")], 2), doc("e")]);
  let t = table(&[]);
  let mut state = started(&src, 9, &t);
  let picks = selected_ids(&state, "sel");

  state = report(&state, &picks[0], 0.5, &t);
  assert_eq!(state.find("sel").unwrap().credit_achieved(), 0.25);
  // Sequence: mean of select (0.25) and e (0).
  assert_eq!(state.credit_achieved(), 0.125);

  state = report(&state, "e", 1.0, &t);
  assert_eq!(state.credit_achieved(), 0.625);
}

#[test]
fn item_credit_lists_scored_documents_as_shown() {
  let src = sequence("root", vec![description("intro"), doc("a"), select("sel", vec![doc("b"), doc("c")], 1)]);
  let t = table(&[("a", 2)]);
  let mut state = started(&src, 3, &t);
  state = report(&state, "a", 0.6, &t);
  let picked = selected_ids(&state, "sel")[0].clone();

  let items = extract_activity_item_credit(&state);
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].id, "a");
  assert_eq!(items[0].score, 0.6);
  assert_eq!(items[0].shuffled_order, 1);
  assert!(items[0].variant.is_some());
  assert_eq!(items[1].doc_id, picked);
  assert_eq!(items[1].shuffled_order, 2);

  assert_eq!(item_sequence(&state), vec!["intro".to_string(), "a".to_string(), picked]);
}

#[test]
fn update_emits_score_and_state() {
  let src = sequence("root", vec![doc("a"), doc("b")]);
  let t = table(&[]);
  let state = started(&src, 1, &t);
  let action = ActivityAction::UpdateSingleState { id: "b".into(), doenet_state: serde_json::Value::Null, credit_achieved: 1.0 };
  let reduced = activity_state_reducer(Some(&state), action, ctx(&t)).unwrap();

  assert_eq!(reduced.events.len(), 1);
  match &reduced.events[0] {
    EngineEvent::ScoreAndState { score, state, item_scores } => {
      assert_eq!(*score, 0.5);
      assert_eq!(state.id(), "root");
      assert_eq!(item_scores.iter().map(|i| i.score).collect::<Vec<_>>(), vec![0.0, 1.0]);
    }
    other => panic!("unexpected event {other:?}"),
  }
}

#[test]
fn credit_outside_unit_interval_is_rejected() {
  let src = doc("d");
  let t = table(&[]);
  let state = started(&src, 1, &t);
  for bad in [1.5, -0.1, f64::NAN] {
    let action = ActivityAction::UpdateSingleState { id: "d".into(), doenet_state: serde_json::Value::Null, credit_achieved: bad };
    let err = activity_state_reducer(Some(&state), action, ctx(&t)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidCredit(_)));
  }
}

#[test]
fn updating_a_container_is_a_configuration_error() {
  let src = sequence("root", vec![select("sel", vec![doc("a"), doc("b")], 1)]);
  let t = table(&[]);
  let state = started(&src, 1, &t);
  let action = ActivityAction::UpdateSingleState { id: "sel".into(), doenet_state: serde_json::Value::Null, credit_achieved: 0.5 };
  let err = activity_state_reducer(Some(&state), action, ctx(&t)).unwrap_err();
  assert!(matches!(err, EngineError::WrongStateType { expected: "singleDoc", actual: "select", .. }));
  assert_eq!(err.kind(), ErrorKind::Configuration);
}
