//! Built-in demo content so the driver is useful without any config file.

use crate::source::{ActivitySource, SelectSource, SequenceSource, SingleDocSource};
use crate::state::NumVariantsTable;

/// A shuffled sequence anchored by an introduction, holding a two-pick
/// select-by-variant, a standalone document and a one-pick select.
pub fn demo_activity() -> ActivitySource {
  let two_picks = SelectSource {
    select_by_variant: true,
    ..SelectSource::new(
      "fraction_practice",
      vec![
        SingleDocSource::new("add_fractions").with_questions(1).into(),
        SingleDocSource::new("compare_fractions").with_questions(1).into(),
      ],
      2,
    )
  };

  let one_pick = SelectSource::new(
    "word_problem",
    vec![
      SingleDocSource::new("pizza_story").with_questions(2).into(),
      SingleDocSource::new("recipe_story").with_questions(2).into(),
    ],
    1,
  );

  SequenceSource {
    shuffle: true,
    ..SequenceSource::new(
      "demo",
      vec![
        SingleDocSource::description("intro").into(),
        two_picks.into(),
        SingleDocSource::new("number_line").with_questions(1).into(),
        one_pick.into(),
      ],
    )
  }
  .into()
}

/// Variant counts for every document of `demo_activity`.
pub fn demo_num_variants() -> NumVariantsTable {
  [
    ("intro", 1),
    ("add_fractions", 3),
    ("compare_fractions", 2),
    ("number_line", 4),
    ("pizza_story", 2),
    ("recipe_story", 1),
  ]
  .into_iter()
  .map(|(id, n)| (id.to_string(), n))
  .collect()
}
