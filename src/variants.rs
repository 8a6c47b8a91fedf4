//! Variant arithmetic: how many distinct variants an activity can produce
//! with no overlap across one full cycle.
//!
//! Sequences need an unused variant from every child, so they report the
//! minimum over children. Selects report the number of fully disjoint rounds,
//! `floor(sum / num_to_select)`.

use crate::source::{ActivitySource, SingleDocSource};
use crate::state::{ActivityState, NumVariantsTable, VariantSlice};

/// Variant count of a document: reported count, then the author's declared
/// count, then 1.
pub fn num_document_variants(source: &SingleDocSource, num_variants: &NumVariantsTable) -> u32 {
  num_variants
    .get(&source.id)
    .copied()
    .or(source.num_variants)
    .unwrap_or(1)
    .max(1)
}

pub fn calc_num_variants(source: &ActivitySource, num_variants: &NumVariantsTable) -> u32 {
  match source {
    ActivitySource::SingleDoc(s) => num_document_variants(s, num_variants),
    ActivitySource::Sequence(s) => s
      .items
      .iter()
      .map(|item| calc_num_variants(item, num_variants))
      .min()
      .unwrap_or(1),
    ActivitySource::Select(s) => {
      let total: u32 = s.items.iter().map(|item| calc_num_variants(item, num_variants)).sum();
      total / s.num_to_select.max(1) as u32
    }
  }
}

/// Like [`calc_num_variants`], but honouring the variant slices already
/// applied to the state. A sliced select reports 1.
pub fn calc_num_variants_from_state(state: &ActivityState, num_variants: &NumVariantsTable) -> u32 {
  match state {
    ActivityState::SingleDoc(s) => {
      let total = num_document_variants(&s.source, num_variants);
      match s.restrict_to_variant_slice {
        Some(slice) => num_variants_in_slice(total, slice),
        None => total,
      }
    }
    ActivityState::Sequence(s) => s
      .latest_child_states
      .iter()
      .map(|child| calc_num_variants_from_state(child, num_variants))
      .min()
      .unwrap_or(1),
    ActivityState::Select(s) => {
      if s.restrict_to_variant_slice.is_some() {
        return 1;
      }
      let total: u32 = s
        .all_children
        .iter()
        .map(|child| calc_num_variants_from_state(child, num_variants))
        .sum();
      total / s.source.num_to_select.max(1) as u32
    }
  }
}

/// Number of variants `v` in `1..=total` with `v ≡ idx (mod num_slices)`.
pub fn num_variants_in_slice(total: u32, slice: VariantSlice) -> u32 {
  if slice.idx == 0 || slice.num_slices == 0 || slice.idx > total {
    return 0;
  }
  (total - slice.idx) / slice.num_slices + 1
}

/// Map a 1-based draw within a slice to the document variant it stands for.
pub fn slice_to_variant(draw: u32, slice: VariantSlice) -> u32 {
  (draw - 1) * slice.num_slices + slice.idx
}

/// Inverse of [`slice_to_variant`]; `None` for variants outside the slice.
pub fn variant_to_slice_draw(variant: u32, slice: VariantSlice) -> Option<u32> {
  if variant < slice.idx || (variant - slice.idx) % slice.num_slices != 0 {
    return None;
  }
  Some((variant - slice.idx) / slice.num_slices + 1)
}

/// Documents for which no variant count has been reported yet.
pub fn missing_variant_counts<'a>(source: &'a ActivitySource, num_variants: &NumVariantsTable) -> Vec<&'a str> {
  crate::source::document_ids(source)
    .into_iter()
    .filter(|id| !num_variants.contains_key(*id))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slice_counts() {
    let slice = |idx, num_slices| VariantSlice { idx, num_slices };
    assert_eq!(num_variants_in_slice(5, slice(1, 3)), 2); // 1, 4
    assert_eq!(num_variants_in_slice(5, slice(2, 3)), 2); // 2, 5
    assert_eq!(num_variants_in_slice(5, slice(3, 3)), 1); // 3
    assert_eq!(num_variants_in_slice(4, slice(4, 4)), 1);
    assert_eq!(num_variants_in_slice(2, slice(3, 3)), 0);
  }

  #[test]
  fn slice_projection_round_trips() {
    let slice = VariantSlice { idx: 2, num_slices: 3 };
    for draw in 1..5 {
      let v = slice_to_variant(draw, slice);
      assert_eq!(variant_to_slice_draw(v, slice), Some(draw));
    }
    assert_eq!(variant_to_slice_draw(3, slice), None);
    assert_eq!(variant_to_slice_draw(1, slice), None);
  }
}
