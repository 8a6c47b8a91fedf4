//! Loading engine configuration (activity source location + variant table) from TOML.
//!
//! See `EngineConfig` for the expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::Result;
use crate::state::NumVariantsTable;

#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
  /// Activity definition (`.json` or `.toml`). The built-in demo is used when absent.
  #[serde(default)] pub source_path: Option<PathBuf>,
  /// `initialVariant` of the root activity.
  #[serde(default = "default_variant_index")] pub variant_index: u64,
  /// Number given to the first question shown.
  #[serde(default = "default_initial_question_counter")] pub initial_question_counter: u32,
  /// Variant counts known ahead of time, keyed by document id.
  #[serde(default)] pub num_activity_variants: NumVariantsTable,
}

fn default_variant_index() -> u64 { 1 }
fn default_initial_question_counter() -> u32 { 1 }

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      source_path: None,
      variant_index: default_variant_index(),
      initial_question_counter: default_initial_question_counter(),
      num_activity_variants: NumVariantsTable::new(),
    }
  }
}

pub fn parse_engine_config(text: &str) -> Result<EngineConfig> {
  Ok(toml::from_str(text)?)
}

/// Attempt to load `EngineConfig` from ACTIVITY_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("ACTIVITY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_engine_config(&s) {
      Ok(cfg) => {
        info!(target: "activity_engine", %path, "Loaded engine config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "activity_engine", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "activity_engine", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
