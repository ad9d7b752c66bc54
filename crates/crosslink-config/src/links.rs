use serde::{Deserialize, Serialize};

/// Default `class` attribute for inserted links.
pub const DEFAULT_LINK_CLASS: &str = "wiki-link";

/// Shape of inserted links and which text is off limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
  /// `class` attribute written on every inserted link.
  pub class: String,

  /// Whether inserted links carry a `title` with the target page name.
  pub include_title: bool,

  /// Elements whose text is never auto-linked. Text inside `<a>` is always
  /// skipped regardless of this list.
  pub skip_tags: Vec<String>,
}

impl Default for LinksConfig {
  fn default() -> Self {
    Self {
      class:         DEFAULT_LINK_CLASS.to_string(),
      include_title: true,
      skip_tags:     vec!["script".to_string(), "style".to_string()],
    }
  }
}
