//! Source model: the immutable, author-written definition of an activity.
//!
//! A source tree is validated once and then shared (via `Arc`) by every state
//! derived from it.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{EngineError, Result};

/// Component types that count as one numbered question each.
const QUESTION_COMPONENTS: [&str; 3] = ["question", "problem", "exercise"];

/// One node of an activity definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActivitySource {
  SingleDoc(Arc<SingleDocSource>),
  Select(Arc<SelectSource>),
  Sequence(Arc<SequenceSource>),
}

/// A single document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleDocSource {
  pub id: String,
  #[serde(default)] pub title: Option<String>,
  /// Descriptions are shown but never scored or shuffled.
  #[serde(default)] pub is_description: bool,
  #[serde(default, rename = "doenetML")] pub doenet_ml: String,
  #[serde(default)] pub version: String,
  /// Variant count declared by the author, used when the renderer has not
  /// reported one.
  #[serde(default)] pub num_variants: Option<u32>,
  #[serde(default)] pub base_component_counts: BTreeMap<String, u32>,
}

/// A random choice of `num_to_select` children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSource {
  pub id: String,
  #[serde(default)] pub title: Option<String>,
  pub items: Vec<ActivitySource>,
  #[serde(default = "default_num_to_select")] pub num_to_select: usize,
  #[serde(default)] pub select_by_variant: bool,
}

/// An ordered, optionally shuffled, list of children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSource {
  pub id: String,
  #[serde(default)] pub title: Option<String>,
  pub items: Vec<ActivitySource>,
  #[serde(default)] pub shuffle: bool,
  /// Per-item credit weights in source order; missing entries weigh 1.
  #[serde(default)] pub weights: Option<Vec<f64>>,
}

fn default_num_to_select() -> usize { 1 }

impl SingleDocSource {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      title: None,
      is_description: false,
      doenet_ml: String::new(),
      version: String::new(),
      num_variants: None,
      base_component_counts: BTreeMap::new(),
    }
  }

  pub fn description(id: impl Into<String>) -> Self {
    Self { is_description: true, ..Self::new(id) }
  }

  pub fn with_questions(mut self, n: u32) -> Self {
    self.base_component_counts.insert("question".to_string(), n);
    self
  }

  /// Number of numbered questions this document contributes to the activity.
  pub fn num_questions(&self) -> u32 {
    if self.is_description {
      return 0;
    }
    QUESTION_COMPONENTS
      .iter()
      .filter_map(|c| self.base_component_counts.get(*c))
      .sum()
  }
}

impl SelectSource {
  pub fn new(id: impl Into<String>, items: Vec<ActivitySource>, num_to_select: usize) -> Self {
    Self { id: id.into(), title: None, items, num_to_select, select_by_variant: false }
  }
}

impl SequenceSource {
  pub fn new(id: impl Into<String>, items: Vec<ActivitySource>) -> Self {
    Self { id: id.into(), title: None, items, shuffle: false, weights: None }
  }

  /// Weight of the item at `idx`, defaulting to 1 past the end of `weights`.
  pub fn weight(&self, idx: usize) -> f64 {
    self.weights.as_ref().and_then(|w| w.get(idx)).copied().unwrap_or(1.0)
  }
}

impl ActivitySource {
  pub fn id(&self) -> &str {
    match self {
      ActivitySource::SingleDoc(s) => &s.id,
      ActivitySource::Select(s) => &s.id,
      ActivitySource::Sequence(s) => &s.id,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      ActivitySource::SingleDoc(_) => "singleDoc",
      ActivitySource::Select(_) => "select",
      ActivitySource::Sequence(_) => "sequence",
    }
  }

  /// Child sources; empty for a single document.
  pub fn items(&self) -> &[ActivitySource] {
    match self {
      ActivitySource::SingleDoc(_) => &[],
      ActivitySource::Select(s) => &s.items,
      ActivitySource::Sequence(s) => &s.items,
    }
  }

  pub fn is_description(&self) -> bool {
    matches!(self, ActivitySource::SingleDoc(s) if s.is_description)
  }
}

impl From<SingleDocSource> for ActivitySource {
  fn from(s: SingleDocSource) -> Self { ActivitySource::SingleDoc(Arc::new(s)) }
}

impl From<SelectSource> for ActivitySource {
  fn from(s: SelectSource) -> Self { ActivitySource::Select(Arc::new(s)) }
}

impl From<SequenceSource> for ActivitySource {
  fn from(s: SequenceSource) -> Self { ActivitySource::Sequence(Arc::new(s)) }
}

/// Check ids and container settings across the whole tree.
#[instrument(level = "debug", skip(source), fields(root = %source.id()))]
pub fn validate_source(source: &ActivitySource) -> Result<()> {
  let mut seen = HashSet::new();
  validate_node(source, &mut seen)
}

fn validate_node<'a>(source: &'a ActivitySource, seen: &mut HashSet<&'a str>) -> Result<()> {
  let id = source.id();
  if id.is_empty() {
    return Err(EngineError::EmptyId);
  }
  if id.contains('|') {
    return Err(EngineError::ReservedCharacterInId(id.to_string()));
  }
  if !seen.insert(id) {
    return Err(EngineError::DuplicateId(id.to_string()));
  }

  match source {
    ActivitySource::SingleDoc(_) => {}
    ActivitySource::Select(s) => {
      if s.num_to_select == 0 {
        return Err(EngineError::NothingToSelect(s.id.clone()));
      }
    }
    ActivitySource::Sequence(s) => {
      for &weight in s.weights.iter().flatten() {
        if !weight.is_finite() || weight < 0.0 {
          return Err(EngineError::InvalidWeight { id: s.id.clone(), weight });
        }
      }
    }
  }

  for item in source.items() {
    validate_node(item, seen)?;
  }
  Ok(())
}

/// Ids of every single document, in source order.
pub fn document_ids(source: &ActivitySource) -> Vec<&str> {
  let mut out = Vec::new();
  collect_document_ids(source, &mut out);
  out
}

fn collect_document_ids<'a>(source: &'a ActivitySource, out: &mut Vec<&'a str>) {
  match source {
    ActivitySource::SingleDoc(s) => out.push(&s.id),
    _ => source.items().iter().for_each(|item| collect_document_ids(item, out)),
  }
}

/// Read an activity definition from disk: `.json` files as JSON, anything else
/// as TOML. The result is validated before it is returned.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_activity_source(path: impl AsRef<Path>) -> Result<ActivitySource> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path)?;
  let source: ActivitySource = match path.extension().and_then(|e| e.to_str()) {
    Some("json") => serde_json::from_str(&text)?,
    _ => toml::from_str(&text)?,
  };
  validate_source(&source)?;
  info!(target: "activity_engine", root = %source.id(), num_documents = document_ids(&source).len(), "Loaded activity source");
  Ok(source)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(id: &str) -> ActivitySource {
    SingleDocSource::new(id).into()
  }

  fn seq(id: &str, items: Vec<ActivitySource>) -> ActivitySource {
    SequenceSource::new(id, items).into()
  }

  #[test]
  fn rejects_duplicate_ids_anywhere_in_the_tree() {
    let src = seq("root", vec![doc("a"), seq("inner", vec![doc("a")])]);
    assert!(matches!(validate_source(&src), Err(EngineError::DuplicateId(id)) if id == "a"));
  }

  #[test]
  fn rejects_pipe_in_id() {
    let src = seq("root", vec![doc("a|1")]);
    assert!(matches!(validate_source(&src), Err(EngineError::ReservedCharacterInId(_))));
  }

  #[test]
  fn parses_tagged_json() {
    let src: ActivitySource = serde_json::from_str(
      r#"{"type":"select","id":"s","numToSelect":1,"items":[
           {"type":"singleDoc","id":"d1","baseComponentCounts":{"question":2,"answer":3}},
           {"type":"singleDoc","id":"d2","isDescription":true}]}"#,
    )
    .unwrap();
    assert_eq!(document_ids(&src), vec!["d1", "d2"]);
    match &src.items()[0] {
      ActivitySource::SingleDoc(d) => assert_eq!(d.num_questions(), 2),
      other => panic!("unexpected {}", other.kind_name()),
    }
    assert!(src.items()[1].is_description());
  }

  #[test]
  fn missing_weights_default_to_one() {
    let s = SequenceSource { weights: Some(vec![2.0]), ..SequenceSource::new("s", vec![]) };
    assert_eq!(s.weight(0), 2.0);
    assert_eq!(s.weight(3), 1.0);
  }
}
