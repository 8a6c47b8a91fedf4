//! Activity state: the living, attempt-by-attempt mirror of a source tree.
//!
//! This module owns:
//!   - the three node kinds and their shared accessors
//!   - initialization of a fresh tree (attempt 0) from a source
//!   - id lookup over the canonical child lists
//!
//! A select keeps every option in `all_children` and copies of the current
//! picks in `selected_children`; a sequence keeps source-ordered children in
//! `latest_child_states` and the shuffled order of each attempt in `attempts`.
//! Both copies are kept in step by the generators and the propagator.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::rng::{init_key, SeededRng};
use crate::source::{ActivitySource, SelectSource, SequenceSource, SingleDocSource};
use crate::util::suffixed_id;
use crate::variants::calc_num_variants;

/// Reported variant counts, keyed by document source id.
pub type NumVariantsTable = BTreeMap<String, u32>;

const CHILD_VARIANT_RANGE: f64 = 1_000_000.0;

/// Restriction of a node to every `num_slices`-th variant, starting at `idx`
/// (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSlice {
    pub idx: u32,
    pub num_slices: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActivityState {
    SingleDoc(SingleDocState),
    Select(SelectState),
    Sequence(SequenceState),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleDocState {
    pub id: String,
    pub parent_id: Option<String>,
    pub source: Arc<SingleDocSource>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    /// 0 until the first attempt is generated.
    pub current_variant: u32,
    pub previous_variants: Vec<u32>,
    /// Opaque state reported by the document renderer.
    pub doenet_state: Option<serde_json::Value>,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub initial_question_counter: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectState {
    pub id: String,
    pub parent_id: Option<String>,
    pub source: Arc<SelectSource>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub all_children: Vec<ActivityState>,
    pub selected_children: Vec<ActivityState>,
    pub previous_selections: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub id: String,
    pub parent_id: Option<String>,
    pub source: Arc<SequenceSource>,
    pub initial_variant: u64,
    pub credit_achieved: f64,
    pub attempt_number: u32,
    #[serde(default)]
    pub restrict_to_variant_slice: Option<VariantSlice>,
    pub latest_child_states: Vec<ActivityState>,
    pub attempts: Vec<SequenceAttemptState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAttemptState {
    /// Children in the order shown for this attempt.
    pub activities: Vec<ActivityState>,
    pub credit_achieved: f64,
}

impl ActivityState {
    pub fn id(&self) -> &str {
        match self {
            ActivityState::SingleDoc(s) => &s.id,
            ActivityState::Select(s) => &s.id,
            ActivityState::Sequence(s) => &s.id,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            ActivityState::SingleDoc(s) => s.parent_id.as_deref(),
            ActivityState::Select(s) => s.parent_id.as_deref(),
            ActivityState::Sequence(s) => s.parent_id.as_deref(),
        }
    }

    pub fn credit_achieved(&self) -> f64 {
        match self {
            ActivityState::SingleDoc(s) => s.credit_achieved,
            ActivityState::Select(s) => s.credit_achieved,
            ActivityState::Sequence(s) => s.credit_achieved,
        }
    }

    pub fn attempt_number(&self) -> u32 {
        match self {
            ActivityState::SingleDoc(s) => s.attempt_number,
            ActivityState::Select(s) => s.attempt_number,
            ActivityState::Sequence(s) => s.attempt_number,
        }
    }

    pub fn initial_variant(&self) -> u64 {
        match self {
            ActivityState::SingleDoc(s) => s.initial_variant,
            ActivityState::Select(s) => s.initial_variant,
            ActivityState::Sequence(s) => s.initial_variant,
        }
    }

    pub fn restrict_to_variant_slice(&self) -> Option<VariantSlice> {
        match self {
            ActivityState::SingleDoc(s) => s.restrict_to_variant_slice,
            ActivityState::Select(s) => s.restrict_to_variant_slice,
            ActivityState::Sequence(s) => s.restrict_to_variant_slice,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ActivityState::SingleDoc(_) => "singleDoc",
            ActivityState::Select(_) => "select",
            ActivityState::Sequence(_) => "sequence",
        }
    }

    pub fn source(&self) -> ActivitySource {
        match self {
            ActivityState::SingleDoc(s) => ActivitySource::SingleDoc(s.source.clone()),
            ActivityState::Select(s) => ActivitySource::Select(s.source.clone()),
            ActivityState::Sequence(s) => ActivitySource::Sequence(s.source.clone()),
        }
    }

    pub fn is_description(&self) -> bool {
        matches!(self, ActivityState::SingleDoc(s) if s.source.is_description)
    }

    /// Canonical children: every select option, or sequence children in
    /// source order.
    pub fn children(&self) -> &[ActivityState] {
        match self {
            ActivityState::SingleDoc(_) => &[],
            ActivityState::Select(s) => &s.all_children,
            ActivityState::Sequence(s) => &s.latest_child_states,
        }
    }

    /// Depth-first lookup by id over canonical children.
    pub fn find(&self, id: &str) -> Option<&ActivityState> {
        if self.id() == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    /// Index of every node in the tree by id.
    pub fn gather_states(&self) -> HashMap<&str, &ActivityState> {
        let mut out = HashMap::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.insert(node.id(), node);
            stack.extend(node.children());
        }
        out
    }

    /// Question counter of the first document this node shows.
    pub fn first_question_counter(&self) -> Option<u32> {
        match self {
            ActivityState::SingleDoc(s) => Some(s.initial_question_counter),
            ActivityState::Select(s) => s.selected_children.first()?.first_question_counter(),
            ActivityState::Sequence(s) => {
                let shown = s.attempts.last().map(|a| a.activities.as_slice()).unwrap_or(s.latest_child_states.as_slice());
                shown.first()?.first_question_counter()
            }
        }
    }
}

/// Placement of a node being initialized inside its tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitOptions<'a> {
    pub parent_id: Option<&'a str>,
    pub restrict_to_variant_slice: Option<VariantSlice>,
    /// `|N` suffixes accumulated from duplicated ancestors.
    pub id_suffix: &'a str,
}

/// Build attempt 0 of a whole tree.
#[instrument(level = "info", skip(source, num_variants), fields(root = %source.id()))]
pub fn initialize_activity_state(
    source: &ActivitySource,
    variant: u64,
    num_variants: &NumVariantsTable,
) -> Result<ActivityState> {
    initialize_node(source, variant, InitOptions::default(), num_variants)
}

pub(crate) fn initialize_node(
    source: &ActivitySource,
    variant: u64,
    opts: InitOptions<'_>,
    num_variants: &NumVariantsTable,
) -> Result<ActivityState> {
    Ok(match source {
        ActivitySource::SingleDoc(s) => ActivityState::SingleDoc(initialize_single_doc_state(s, variant, opts)),
        ActivitySource::Select(s) => ActivityState::Select(initialize_select_state(s, variant, opts, num_variants)?),
        ActivitySource::Sequence(s) => {
            ActivityState::Sequence(initialize_sequence_state(s, variant, opts, num_variants)?)
        }
    })
}

pub fn initialize_single_doc_state(source: &Arc<SingleDocSource>, variant: u64, opts: InitOptions<'_>) -> SingleDocState {
    SingleDocState {
        id: suffixed_id(&source.id, opts.id_suffix),
        parent_id: opts.parent_id.map(str::to_string),
        source: source.clone(),
        initial_variant: variant,
        credit_achieved: 0.0,
        attempt_number: 0,
        current_variant: 0,
        previous_variants: Vec::new(),
        doenet_state: None,
        restrict_to_variant_slice: opts.restrict_to_variant_slice,
        initial_question_counter: 0,
    }
}

pub fn initialize_select_state(
    source: &Arc<SelectSource>,
    variant: u64,
    opts: InitOptions<'_>,
    num_variants: &NumVariantsTable,
) -> Result<SelectState> {
    let id = suffixed_id(&source.id, opts.id_suffix);
    let mut rng = SeededRng::from_key(&init_key(variant, &id));

    let mut all_children = Vec::new();
    if source.select_by_variant && source.num_to_select > 1 {
        // One option per variant slice of each item.
        for item in &source.items {
            let num_slices = calc_num_variants(item, num_variants);
            for idx in 1..=num_slices {
                let child_suffix = format!("{}|{idx}", opts.id_suffix);
                let child_opts = InitOptions {
                    parent_id: Some(&id),
                    restrict_to_variant_slice: Some(VariantSlice { idx, num_slices }),
                    id_suffix: &child_suffix,
                };
                all_children.push(initialize_node(item, child_variant(&mut rng), child_opts, num_variants)?);
            }
        }
    } else {
        let child_opts = InitOptions { parent_id: Some(&id), restrict_to_variant_slice: None, id_suffix: opts.id_suffix };
        for item in &source.items {
            all_children.push(initialize_node(item, child_variant(&mut rng), child_opts, num_variants)?);
        }
    }
    debug!(target: "attempt", %id, num_options = all_children.len(), "Initialized select");

    Ok(SelectState {
        id,
        parent_id: opts.parent_id.map(str::to_string),
        source: source.clone(),
        initial_variant: variant,
        credit_achieved: 0.0,
        attempt_number: 0,
        restrict_to_variant_slice: opts.restrict_to_variant_slice,
        all_children,
        selected_children: Vec::new(),
        previous_selections: Vec::new(),
    })
}

pub fn initialize_sequence_state(
    source: &Arc<SequenceSource>,
    variant: u64,
    opts: InitOptions<'_>,
    num_variants: &NumVariantsTable,
) -> Result<SequenceState> {
    let id = suffixed_id(&source.id, opts.id_suffix);
    let mut rng = SeededRng::from_key(&init_key(variant, &id));

    // A sliced sequence hands its slice to every child.
    let child_opts = InitOptions {
        parent_id: Some(&id),
        restrict_to_variant_slice: opts.restrict_to_variant_slice,
        id_suffix: opts.id_suffix,
    };
    let latest_child_states = source
        .items
        .iter()
        .map(|item| initialize_node(item, child_variant(&mut rng), child_opts, num_variants))
        .collect::<Result<Vec<_>>>()?;

    Ok(SequenceState {
        id,
        parent_id: opts.parent_id.map(str::to_string),
        source: source.clone(),
        initial_variant: variant,
        credit_achieved: 0.0,
        attempt_number: 0,
        restrict_to_variant_slice: opts.restrict_to_variant_slice,
        latest_child_states,
        attempts: Vec::new(),
    })
}

fn child_variant(rng: &mut SeededRng) -> u64 {
    (rng.next_f64() * CHILD_VARIANT_RANGE).floor() as u64 + 1
}
