//! New attempts for a select.
//!
//! Options are consumed in groups of `all_children.len()`: each attempt first
//! draws from the options not yet shown in the current group, and only when
//! the group runs dry does a new group start, drawing the shortfall from the
//! options not already picked for this attempt.
//!
//! `generate_new_single_doc_attempt_for_multi_select` redraws just one of
//! several concurrent picks, leaving the others in place.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, instrument};

use crate::attempt::{generate_new_activity_attempt, skip_excluded, NewAttempt};
use crate::error::{EngineError, Result};
use crate::rng::{attempt_key, SeededRng};
use crate::state::{NumVariantsTable, SelectState};

#[instrument(level = "debug", skip(state, num_variants), fields(id = %state.id, attempt = state.attempt_number))]
pub fn generate_new_select_attempt(
    state: &SelectState,
    num_variants: &NumVariantsTable,
    initial_question_counter: u32,
    parent_attempt: u32,
    reset_credit: bool,
) -> Result<NewAttempt<SelectState>> {
    let total = state.all_children.len();
    let num_to_select = state.source.num_to_select;
    if num_to_select == 0 {
        return Err(EngineError::NothingToSelect(state.id.clone()));
    }
    if num_to_select > total {
        return Err(EngineError::NotEnoughOptions { id: state.id.clone(), num_to_select, available: total });
    }
    let index = option_index(state);

    // Appearances of each option in the current group. Single-slot redraws
    // append to the history, so an option can appear more than once; the
    // group is shorter than `total`, so some option always has none.
    let num_prev = state.previous_selections.len();
    let num_in_group = num_prev % total;
    let mut group_counts = vec![0usize; total];
    for id in &state.previous_selections[num_prev - num_in_group..] {
        group_counts[lookup(state, &index, id)?] += 1;
    }
    let mut pool: Vec<usize> = (0..total).filter(|&i| group_counts[i] == 0).collect();

    let key = attempt_key(state.initial_variant, &state.id, state.attempt_number, parent_attempt);
    let mut rng = SeededRng::from_key(&key);
    let mut chosen = Vec::with_capacity(num_to_select);
    let from_group = num_to_select.min(pool.len());
    draw_without_replacement(&mut rng, &mut pool, from_group, &mut chosen);

    if chosen.len() < num_to_select {
        // Group exhausted: start the next one immediately.
        let mut next_group: Vec<usize> = (0..total).filter(|i| !chosen.contains(i)).collect();
        let shortfall = num_to_select - chosen.len();
        draw_without_replacement(&mut rng, &mut next_group, shortfall, &mut chosen);
    }

    let attempt_number = state.attempt_number + 1;
    let mut new_state = state.clone();
    new_state.selected_children = Vec::with_capacity(num_to_select);
    let mut question_counter = initial_question_counter;
    for &idx in &chosen {
        let out = generate_new_activity_attempt(
            &state.all_children[idx],
            num_variants,
            question_counter,
            attempt_number,
            reset_credit,
        )?;
        question_counter = out.final_question_counter;
        new_state.previous_selections.push(out.state.id().to_string());
        new_state.all_children[idx] = out.state.clone();
        new_state.selected_children.push(out.state);
    }
    new_state.attempt_number = attempt_number;
    new_state.credit_achieved = 0.0;

    debug!(target: "attempt", id = %state.id, ?chosen, ?group_counts, total, "New select attempt");

    Ok(NewAttempt { state: new_state, final_question_counter: question_counter })
}

/// Replace the pick `child_id` with a fresh draw, keeping the other current
/// picks. The replacement's slot counts as 0 credit until it is attempted.
#[instrument(level = "info", skip(state, num_variants), fields(id = %state.id))]
pub fn generate_new_single_doc_attempt_for_multi_select(
    state: &SelectState,
    child_id: &str,
    num_variants: &NumVariantsTable,
) -> Result<SelectState> {
    let slot = state
        .selected_children
        .iter()
        .position(|c| c.id() == child_id)
        .ok_or_else(|| EngineError::ChildNotFound { parent: state.id.clone(), child: child_id.to_string() })?;
    let index = option_index(state);
    let total = state.all_children.len();

    let others = state
        .selected_children
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != slot)
        .map(|(_, c)| lookup(state, &index, c.id()))
        .collect::<Result<BTreeSet<usize>>>()?;

    // Sliding window over the history of the options still available.
    let pool_size = total - others.len();
    let mut history = Vec::new();
    for id in &state.previous_selections {
        let idx = lookup(state, &index, id)?;
        if !others.contains(&idx) {
            history.push(idx);
        }
    }
    // The window is shorter than the pool, so at least one option stays free
    // even when earlier redraws left repeats in it.
    let num_to_exclude = history.len() % pool_size;
    let window: BTreeSet<usize> = history[history.len() - num_to_exclude..].iter().copied().collect();

    let excluded: Vec<usize> = others.union(&window).copied().collect();
    // The select's own attempt is unchanged, so the history length keys
    // successive redraws apart.
    let key = attempt_key(
        state.initial_variant,
        &state.id,
        state.attempt_number,
        state.previous_selections.len() as u32,
    );
    let mut rng = SeededRng::from_key(&key);
    let pick = skip_excluded(rng.below(total - excluded.len()), &excluded);

    let question_counter = state.selected_children[slot].first_question_counter().unwrap_or(0);
    let out = generate_new_activity_attempt(
        &state.all_children[pick],
        num_variants,
        question_counter,
        state.attempt_number,
        false,
    )?;

    let mut new_state = state.clone();
    new_state.previous_selections.push(out.state.id().to_string());
    new_state.all_children[pick] = out.state.clone();
    new_state.selected_children[slot] = out.state;
    let others_credit: f64 = new_state
        .selected_children
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != slot)
        .map(|(_, c)| c.credit_achieved())
        .sum();
    new_state.credit_achieved = others_credit / new_state.selected_children.len() as f64;

    info!(
        target: "attempt",
        id = %state.id,
        replaced = %child_id,
        chosen = %new_state.selected_children[slot].id(),
        "Redrew one selected option"
    );
    Ok(new_state)
}

fn option_index(state: &SelectState) -> HashMap<&str, usize> {
    state.all_children.iter().enumerate().map(|(i, c)| (c.id(), i)).collect()
}

fn lookup(state: &SelectState, index: &HashMap<&str, usize>, id: &str) -> Result<usize> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| EngineError::ChildNotFound { parent: state.id.clone(), child: id.to_string() })
}

fn draw_without_replacement(rng: &mut SeededRng, pool: &mut Vec<usize>, count: usize, out: &mut Vec<usize>) {
    for _ in 0..count {
        let i = rng.below(pool.len());
        out.push(pool.remove(i));
    }
}
