//! Small utility helpers used across modules.

/// Separator between a source id and its duplicate/slice index.
pub const ID_SEPARATOR: char = '|';

/// Source id followed by the `|N` suffixes a duplicated node inherits.
pub fn suffixed_id(source_id: &str, suffix: &str) -> String {
  format!("{source_id}{suffix}")
}

/// Source id of a state id, with every `|N` suffix removed.
pub fn base_id(state_id: &str) -> &str {
  state_id.split(ID_SEPARATOR).next().unwrap_or(state_id)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge document state payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
