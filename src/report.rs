//! Read-only summaries of a state for renderers and score reporting.

use serde::Serialize;

use crate::state::ActivityState;

/// Credit of one scored document, in display order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCredit {
  /// State id (may carry `|N` suffixes).
  pub id: String,
  pub score: f64,
  /// Source id of the document.
  pub doc_id: String,
  /// 1-based position among scored documents as shown.
  pub shuffled_order: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variant: Option<u32>,
}

/// Scored documents as currently shown, skipping descriptions.
pub fn extract_activity_item_credit(state: &ActivityState) -> Vec<ItemCredit> {
  let mut out = Vec::new();
  for leaf in shown_documents(state) {
    let ActivityState::SingleDoc(doc) = leaf else { continue };
    if doc.source.is_description {
      continue;
    }
    out.push(ItemCredit {
      id: doc.id.clone(),
      score: doc.credit_achieved,
      doc_id: doc.source.id.clone(),
      shuffled_order: out.len() + 1,
      variant: (doc.current_variant > 0).then_some(doc.current_variant),
    });
  }
  out
}

/// Ids of every document as currently shown, descriptions included.
pub fn item_sequence(state: &ActivityState) -> Vec<String> {
  shown_documents(state).into_iter().map(|s| s.id().to_string()).collect()
}

fn shown_documents(state: &ActivityState) -> Vec<&ActivityState> {
  let mut out = Vec::new();
  collect_shown(state, &mut out);
  out
}

fn collect_shown<'a>(state: &'a ActivityState, out: &mut Vec<&'a ActivityState>) {
  match state {
    ActivityState::SingleDoc(_) => out.push(state),
    ActivityState::Select(s) => s.selected_children.iter().for_each(|c| collect_shown(c, out)),
    ActivityState::Sequence(s) => {
      let shown = s.attempts.last().map(|a| a.activities.as_slice()).unwrap_or(s.latest_child_states.as_slice());
      shown.iter().for_each(|c| collect_shown(c, out));
    }
  }
}
