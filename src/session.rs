//! One learner's activity, owned by a single writer.
//!
//! The session holds the source, the variant table and the current state, and
//! runs every action through the reducer. A failing action leaves the session
//! exactly as it was.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::reducer::{activity_state_reducer, ActivityAction, EngineEvent, ReduceContext};
use crate::report::{extract_activity_item_credit, ItemCredit};
use crate::serialize::{add_source_to_activity_state, prune_activity_state_for_save, ActivityStateNoSource};
use crate::source::ActivitySource;
use crate::state::{ActivityState, NumVariantsTable};
use crate::variants::missing_variant_counts;

pub struct ActivitySession {
  pub session_id: Uuid,
  source: Option<ActivitySource>,
  num_variants: NumVariantsTable,
  variant_index: u64,
  initial_question_counter: u32,
  state: Option<ActivityState>,
}

impl ActivitySession {
  pub fn new(config: &EngineConfig) -> Self {
    Self {
      session_id: Uuid::new_v4(),
      source: None,
      num_variants: config.num_activity_variants.clone(),
      variant_index: config.variant_index,
      initial_question_counter: config.initial_question_counter,
      state: None,
    }
  }

  pub fn state(&self) -> Option<&ActivityState> { self.state.as_ref() }

  pub fn source(&self) -> Option<&ActivitySource> { self.source.as_ref() }

  pub fn num_variants(&self) -> &NumVariantsTable { &self.num_variants }

  /// Build attempt 0 for `source` and generate the first attempt.
  #[instrument(level = "info", skip(self, source), fields(session = %self.session_id, root = %source.id()))]
  pub fn initialize(&mut self, source: ActivitySource, variant_index: Option<u64>) -> Result<Vec<EngineEvent>> {
    let missing = missing_variant_counts(&source, &self.num_variants);
    if !missing.is_empty() {
      warn!(target: "activity_engine", ?missing, "No variant count reported; assuming 1");
    }
    let variant_index = variant_index.unwrap_or(self.variant_index);
    // Both steps run on locals; nothing is committed unless both succeed.
    let initial =
      activity_state_reducer(None, ActivityAction::Initialize { source: source.clone(), variant_index }, self.ctx())?;
    let first = activity_state_reducer(
      Some(&initial.state),
      ActivityAction::GenerateNewActivityAttempt { id: None },
      self.ctx(),
    )?;
    self.state = Some(first.state);
    self.source = Some(source);
    self.variant_index = variant_index;
    Ok(first.events)
  }

  /// Run one action; the new state is committed only when it succeeds.
  #[instrument(level = "debug", skip(self, action), fields(session = %self.session_id))]
  pub fn apply(&mut self, action: ActivityAction) -> Result<Vec<EngineEvent>> {
    let reduced = activity_state_reducer(self.state.as_ref(), action, self.ctx())?;
    self.state = Some(reduced.state);
    Ok(reduced.events)
  }

  fn ctx(&self) -> ReduceContext<'_> {
    ReduceContext { num_variants: &self.num_variants, initial_question_counter: self.initial_question_counter }
  }

  /// Merge newly reported variant counts. Existing attempts keep their draws.
  pub fn set_num_variants(&mut self, table: NumVariantsTable) {
    info!(target: "activity_engine", session = %self.session_id, count = table.len(), "Variant counts updated");
    self.num_variants.extend(table);
  }

  /// Replace the state with a previously saved one.
  #[instrument(level = "info", skip_all, fields(session = %self.session_id, root = %saved.id()))]
  pub fn restore(&mut self, saved: &ActivityStateNoSource) -> Result<()> {
    let source = self.source.as_ref().ok_or(EngineError::Uninitialized)?;
    let state = add_source_to_activity_state(saved, source)?;
    self.apply(ActivityAction::Set { state })?;
    Ok(())
  }

  pub fn save(&self) -> Result<ActivityStateNoSource> {
    self.state.as_ref().map(prune_activity_state_for_save).ok_or(EngineError::Uninitialized)
  }

  pub fn item_credit(&self) -> Result<Vec<ItemCredit>> {
    self.state.as_ref().map(extract_activity_item_credit).ok_or(EngineError::Uninitialized)
  }
}
