#![allow(dead_code)]

use activity_engine::reducer::{activity_state_reducer, ActivityAction, ReduceContext};
use activity_engine::source::{ActivitySource, SelectSource, SequenceSource, SingleDocSource};
use activity_engine::state::SingleDocState;
use activity_engine::{ActivityState, NumVariantsTable};

pub fn doc(id: &str) -> ActivitySource {
  SingleDocSource::new(id).with_questions(1).into()
}

pub fn doc_with_questions(id: &str, questions: u32) -> ActivitySource {
  SingleDocSource::new(id).with_questions(questions).into()
}

pub fn description(id: &str) -> ActivitySource {
  SingleDocSource::description(id).into()
}

pub fn select(id: &str, items: Vec<ActivitySource>, num_to_select: usize) -> ActivitySource {
  SelectSource::new(id, items, num_to_select).into()
}

pub fn select_by_variant(id: &str, items: Vec<ActivitySource>, num_to_select: usize) -> ActivitySource {
  SelectSource { select_by_variant: true, ..SelectSource::new(id, items, num_to_select) }.into()
}

pub fn sequence(id: &str, items: Vec<ActivitySource>) -> ActivitySource {
  SequenceSource::new(id, items).into()
}

pub fn shuffled_sequence(id: &str, items: Vec<ActivitySource>) -> ActivitySource {
  SequenceSource { shuffle: true, ..SequenceSource::new(id, items) }.into()
}

pub fn weighted_sequence(id: &str, items: Vec<ActivitySource>, weights: Vec<f64>) -> ActivitySource {
  SequenceSource { weights: Some(weights), ..SequenceSource::new(id, items) }.into()
}

pub fn table(entries: &[(&str, u32)]) -> NumVariantsTable {
  entries.iter().map(|(id, n)| (id.to_string(), *n)).collect()
}

pub fn ctx(num_variants: &NumVariantsTable) -> ReduceContext<'_> {
  ReduceContext { num_variants, initial_question_counter: 1 }
}

/// Initialize `source` and generate its first attempt through the reducer.
pub fn started(source: &ActivitySource, variant_index: u64, num_variants: &NumVariantsTable) -> ActivityState {
  let init = ActivityAction::Initialize { source: source.clone(), variant_index };
  let state = activity_state_reducer(None, init, ctx(num_variants)).unwrap().state;
  reduce(&state, ActivityAction::GenerateNewActivityAttempt { id: None }, num_variants)
}

pub fn reduce(state: &ActivityState, action: ActivityAction, num_variants: &NumVariantsTable) -> ActivityState {
  activity_state_reducer(Some(state), action, ctx(num_variants)).unwrap().state
}

pub fn report(state: &ActivityState, id: &str, credit: f64, num_variants: &NumVariantsTable) -> ActivityState {
  let action = ActivityAction::UpdateSingleState {
    id: id.to_string(),
    doenet_state: serde_json::json!({ "submitted": credit }),
    credit_achieved: credit,
  };
  reduce(state, action, num_variants)
}

pub fn doc_state<'a>(root: &'a ActivityState, id: &str) -> &'a SingleDocState {
  match root.find(id) {
    Some(ActivityState::SingleDoc(d)) => d,
    other => panic!("{id} is not a document: {other:?}"),
  }
}

pub fn selected_ids(root: &ActivityState, select_id: &str) -> Vec<String> {
  match root.find(select_id) {
    Some(ActivityState::Select(s)) => s.selected_children.iter().map(|c| c.id().to_string()).collect(),
    other => panic!("{select_id} is not a select: {other:?}"),
  }
}

pub fn shown_order(root: &ActivityState) -> Vec<String> {
  match root {
    ActivityState::Sequence(s) => s
      .attempts
      .last()
      .map(|a| a.activities.iter().map(|c| c.id().to_string()).collect())
      .unwrap_or_default(),
    other => panic!("{} is not a sequence", other.id()),
  }
}

pub fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
  let mut v = items.to_vec();
  v.sort();
  v
}
