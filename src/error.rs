//! Engine error taxonomy.
//!
//! Every failure aborts the action that raised it; the engine never coerces a
//! broken tree into a best-effort state.

use serde::Serialize;
use thiserror::Error;

/// Broad class of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Bad input: source definitions, ids, credits or mismatched state kinds.
  Configuration,
  /// The engine's own bookkeeping disagrees with itself.
  Invariant,
  /// Reading or parsing external files and payloads.
  Io,
}

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("Activity id must not be empty")]
  EmptyId,

  #[error("Duplicate activity id `{0}`")]
  DuplicateId(String),

  #[error("Activity id `{0}` contains the reserved character `|`")]
  ReservedCharacterInId(String),

  #[error("Select `{0}` must select at least one item")]
  NothingToSelect(String),

  #[error("Select `{id}` asks for {num_to_select} items but only {available} options exist")]
  NotEnoughOptions {
    id: String,
    num_to_select: usize,
    available: usize,
  },

  #[error("Sequence `{id}` has an invalid weight {weight}")]
  InvalidWeight { id: String, weight: f64 },

  #[error("Credit {0} is outside [0, 1]")]
  InvalidCredit(f64),

  #[error("Variant slice {idx}/{num_slices} of `{id}` contains no variants")]
  EmptyVariantSlice { id: String, idx: u32, num_slices: u32 },

  #[error("Activity not found: `{0}`")]
  ActivityNotFound(String),

  #[error("Activity `{id}` is a {actual} activity, expected {expected}")]
  WrongStateType {
    id: String,
    expected: &'static str,
    actual: &'static str,
  },

  #[error("Activity `{child}` is not recorded as a child of `{parent}`")]
  ChildNotFound { parent: String, child: String },

  #[error("Source `{source_id}` does not match saved activity `{state_id}`")]
  SourceMismatch { source_id: String, state_id: String },

  #[error("Exclusion window for `{id}` leaves {found} options, expected {expected}")]
  ExclusionWindowMismatch {
    id: String,
    expected: usize,
    found: usize,
  },

  #[error("No activity state has been initialized")]
  Uninitialized,

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("TOML error: {0}")]
  Toml(#[from] toml::de::Error),
}

impl EngineError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      EngineError::ExclusionWindowMismatch { .. } => ErrorKind::Invariant,
      EngineError::Io(_) | EngineError::Json(_) | EngineError::Toml(_) => ErrorKind::Io,
      _ => ErrorKind::Configuration,
    }
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exclusion_window_mismatch_is_an_invariant_violation() {
    let err = EngineError::ExclusionWindowMismatch { id: "sel".into(), expected: 2, found: 3 };
    assert_eq!(err.kind(), ErrorKind::Invariant);
    assert_eq!(EngineError::DuplicateId("a".into()).kind(), ErrorKind::Configuration);
  }
}
