//! Main-title extraction for episodic titles
//!
//! A best-effort, ordered rule cascade. The outputs for known export titles
//! are pinned by tests; the rules are not meant to generalize further.

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_TITLE_CHARS: usize = 3;

fn pattern(source: &str) -> Regex {
  Regex::new(source).expect("title pattern is a valid regex")
}

static EPISODES_MARKER: Lazy<Regex> = Lazy::new(|| pattern(r": Episodes?\s*\("));
static EPISODES_PREFIX: Lazy<Regex> = Lazy::new(|| pattern(r"^([^:]+: Episodes?)"));
static SEASON_MARKER_ANY_CASE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i): Season\s+\d+"));
static SEASON_PREFIX: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^([^:]+?)(?:\s*:\s*Season\s+\d+)"));
static SEASON_MARKER: Lazy<Regex> = Lazy::new(|| pattern(r": Season\s+\d+"));
static TRAILING_COLON: Lazy<Regex> = Lazy::new(|| pattern(r":\s*$"));

/// Suffixes stripped in priority order
static SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"(?i):\s*Season\s+\d+\s*:.*",
    r"(?i):\s*Episode\s+\d+.*",
    r"(?i):\s*Episodes?\s+\(\d+-\d+\).*",
    r"(?i):\s*\d{2}-\d{2}-\d{4}.*",
    r"(?i):\s*\d{4}:\s*.*",
    r"(?i):\s*\d{1,2}/\d{1,2}/\d{2,4}.*",
    r"(?i):\s*S\d+E\d+.*",
    r"(?i):\s*Part\s+\d+.*",
    r"(?i):\s*Chapter\s+\d+.*",
  ]
  .into_iter()
  .map(pattern)
  .collect()
});

fn char_len(text: &str) -> usize {
  text.chars().count()
}

/// Derive the show or franchise name from a full export title.
///
/// Returns the original title when no rule yields at least three characters.
pub fn main_title(full_title: &str) -> String {
  if full_title.is_empty() {
    return String::new();
  }

  let title = full_title.trim();

  if EPISODES_MARKER.is_match(title) {
    if let Some(caps) = EPISODES_PREFIX.captures(title) {
      return caps[1].trim().to_string();
    }
  }

  if SEASON_MARKER_ANY_CASE.is_match(title) {
    if let Some(caps) = SEASON_PREFIX.captures(title) {
      return caps[1].trim().to_string();
    }
  }

  if let Some(prefix) = repeated_segment_prefix(title) {
    return prefix;
  }

  let stripped = strip_first_suffix(title);
  let stripped = TRAILING_COLON.replace(&stripped, "").trim().to_string();

  if char_len(&stripped) < MIN_TITLE_CHARS {
    return full_title.to_string();
  }
  stripped
}

/// Titles with three or more colon segments whose subtitle repeats keep `first: second`
fn repeated_segment_prefix(title: &str) -> Option<String> {
  let parts: Vec<&str> = title.split(':').map(str::trim).collect();
  if parts.len() < 3 {
    return None;
  }

  let (first, second) = (parts[0], parts[1]);
  if first.is_empty() || second.is_empty() || char_len(first) <= 2 {
    return None;
  }

  let repeats = parts.len() >= 4 && parts[1] == parts[2];
  if SEASON_MARKER.is_match(title) || repeats {
    return Some(format!("{first}: {second}").trim().to_string());
  }
  None
}

fn strip_first_suffix(title: &str) -> String {
  for suffix in SUFFIXES.iter() {
    let candidate = suffix.replace(title, "");
    let candidate = candidate.trim();
    if candidate != title && char_len(candidate) >= MIN_TITLE_CHARS {
      return candidate.to_string();
    }
  }
  title.to_string()
}
