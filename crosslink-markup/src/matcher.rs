//! Word-bounded, case-insensitive name matching over a [`Tree`].
use std::ops::Range;

use log::trace;
use regex::Regex;

use crate::{
  error::MarkupError,
  tree::{NodeData, NodeId, RAW_TEXT_ELEMENTS, RCDATA_ELEMENTS, Tree},
};

/// Element names whose text is skipped unless configured otherwise.
pub const DEFAULT_SKIP_TAGS: &[&str] = &["script", "style"];

/// A compiled, literal page name.
///
/// The name matches case-insensitively and only as a whole word: `Sword`
/// never matches inside `Swordfish`. Runs of whitespace inside the name
/// match any whitespace run, so a name that wraps across a line break in
/// the source still matches.
#[derive(Debug, Clone)]
pub struct NamePattern {
  name:  String,
  regex: Regex,
}

impl NamePattern {
  /// Compile a pattern for `name`.
  ///
  /// # Errors
  ///
  /// Returns [`MarkupError::EmptyName`] for blank names.
  pub fn new(name: &str) -> Result<Self, MarkupError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
      return Err(MarkupError::EmptyName);
    }

    let body = trimmed
      .split_whitespace()
      .map(regex::escape)
      .collect::<Vec<_>>()
      .join(r"\s+");

    // `\b` only asserts something next to a word character; a name like
    // `C++` gets no trailing boundary rather than one that can never match.
    let lead = if trimmed.starts_with(is_word_char) { r"\b" } else { "" };
    let trail = if trimmed.ends_with(is_word_char) { r"\b" } else { "" };

    let regex = Regex::new(&format!("(?i){lead}(?:{body}){trail}"))?;
    Ok(Self {
      name: trimmed.to_string(),
      regex,
    })
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Byte range of the first match in `text`.
  #[must_use]
  pub fn find(&self, text: &str) -> Option<Range<usize>> {
    self.regex.find(text).map(|m| m.range())
  }

  #[must_use]
  pub fn is_match(&self, text: &str) -> bool {
    self.regex.is_match(text)
  }
}

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

/// A located occurrence: a text node and a byte span inside its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
  pub node: NodeId,
  pub span: Range<usize>,
}

/// Controls which text the matcher is allowed to look at.
#[derive(Debug, Clone)]
pub struct MatchOptions {
  /// Element names whose descendant text is never matched. Anchors and
  /// text-only elements (`textarea`, `title` and the raw-text elements) are
  /// always skipped and need not be listed.
  pub skip_tags: Vec<String>,
}

impl Default for MatchOptions {
  fn default() -> Self {
    Self {
      skip_tags: DEFAULT_SKIP_TAGS.iter().map(ToString::to_string).collect(),
    }
  }
}

impl MatchOptions {
  fn skipped(&self) -> Vec<&str> {
    let mut names: Vec<&str> =
      self.skip_tags.iter().map(String::as_str).collect();
    names.push("a");
    names.extend_from_slice(RAW_TEXT_ELEMENTS);
    names.extend_from_slice(RCDATA_ELEMENTS);
    names
  }
}

/// Find the first occurrence of `pattern` that is not already linked.
///
/// Text nodes are visited in document order; any node with an `<a>`, a
/// text-only element or a configured skip tag among its ancestors is
/// ignored, as is raw text.
#[must_use]
pub fn find_first_unlinked_occurrence(
  tree: &Tree,
  pattern: &NamePattern,
  options: &MatchOptions,
) -> Option<Match> {
  let skipped = options.skipped();

  for node in tree.text_nodes() {
    let Some(NodeData::Text { text, raw: false }) = tree.data(node) else {
      continue;
    };
    if tree.has_ancestor_named(node, &skipped) {
      continue;
    }
    if let Some(span) = pattern.find(text) {
      trace!(
        "Matched '{}' in text node {node} at {}..{}",
        pattern.name(),
        span.start,
        span.end
      );
      return Some(Match { node, span });
    }
  }
  None
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]
  use super::*;
  use crate::parse::parse;

  fn pattern(name: &str) -> NamePattern {
    NamePattern::new(name).expect("valid name")
  }

  fn matched_text(tree: &Tree, m: &Match) -> String {
    tree.text(m.node).expect("text node")[m.span.clone()].to_string()
  }

  #[test]
  fn respects_word_boundaries() {
    let sword = pattern("Sword");
    assert!(!sword.is_match("a Swordfish swims"));
    assert!(!sword.is_match("Broadsword"));
    assert!(sword.is_match("the sword, drawn"));
    assert!(sword.is_match("SWORD"));
  }

  #[test]
  fn escapes_regex_metacharacters() {
    let p = pattern("Dr. Who (1963)");
    assert!(p.is_match("see Dr. Who (1963) again"));
    assert!(!p.is_match("see Drx Who (1963) again"));

    let cpp = pattern("C++");
    assert!(cpp.is_match("written in C++ today"));
  }

  #[test]
  fn whitespace_in_names_is_flexible() {
    let p = pattern("Iron  Keep");
    assert_eq!(p.name(), "Iron  Keep");
    assert!(p.is_match("the Iron\nKeep stands"));
  }

  #[test]
  fn empty_names_are_rejected() {
    assert!(matches!(NamePattern::new("  "), Err(MarkupError::EmptyName)));
  }

  #[test]
  fn skips_text_inside_anchors() {
    let tree = parse(
      r#"<p><a href="/x">Castle <em>Castle</em></a> then the Castle</p>"#,
    );
    let m = find_first_unlinked_occurrence(
      &tree,
      &pattern("castle"),
      &MatchOptions::default(),
    )
    .expect("an unlinked occurrence");

    assert_eq!(tree.text(m.node), Some(" then the Castle"));
    assert_eq!(matched_text(&tree, &m), "Castle");
  }

  #[test]
  fn first_occurrence_in_document_order() {
    let tree = parse("<h1>Intro</h1><p>Castle one</p><p>Castle two</p>");
    let m = find_first_unlinked_occurrence(
      &tree,
      &pattern("Castle"),
      &MatchOptions::default(),
    )
    .expect("match");
    assert_eq!(tree.text(m.node), Some("Castle one"));
    assert_eq!(m.span, 0..6);
  }

  #[test]
  fn skips_script_and_configured_tags() {
    let tree =
      parse("<script>var Castle = 1;</script><code>Castle</code><p>Castle</p>");
    let options = MatchOptions {
      skip_tags: vec!["code".to_string()],
    };
    let m = find_first_unlinked_occurrence(&tree, &pattern("Castle"), &options)
      .expect("match");
    assert_eq!(tree.text(m.node), Some("Castle"));
    assert!(tree.has_ancestor_named(m.node, &["p"]));
  }

  #[test]
  fn never_matches_inside_text_only_elements() {
    let tree = parse(
      "<title>Castle</title><form><textarea>The Castle</textarea></form>",
    );
    let options = MatchOptions { skip_tags: vec![] };
    assert!(
      find_first_unlinked_occurrence(&tree, &pattern("Castle"), &options)
        .is_none()
    );
  }

  #[test]
  fn no_match_returns_none() {
    let tree = parse("<p>nothing here</p>");
    assert!(
      find_first_unlinked_occurrence(
        &tree,
        &pattern("Castle"),
        &MatchOptions::default()
      )
      .is_none()
    );
  }
}
