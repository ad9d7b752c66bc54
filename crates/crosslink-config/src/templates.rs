//! Starter configuration files written by `crosslink init`.
use crate::{config::Config, error::ConfigError};

/// Default configuration in TOML, with enough comments that a first-time
/// user knows what each key does.
pub const DEFAULT_TOML_TEMPLATE: &str = r#"# crosslink configuration file

# JSON corpus used by the command line tool. Holds pages, characteristics
# and characteristic values.
corpus_path = "corpus.json"

[dispatch]
# How trigger operations run:
#   "inline"   - synchronously, errors are reported immediately
#   "queued"   - on a background worker pool with retries
#   "disabled" - skipped (safe: every operation can be re-run later)
mode = "inline"

# Worker threads for the queued mode. Keep this at 1 unless callers already
# serialize edits per page.
workers = 1

# Extra attempts for a queued operation whose write-back failed.
max_retries = 3

[links]
# Class attribute on inserted links.
class = "wiki-link"

# Add a title attribute carrying the target page name.
include_title = true

# Elements whose text is never linked. Existing links are always skipped.
skip_tags = ["script", "style"]
"#;

/// Render the default configuration in the requested format.
///
/// # Errors
///
/// Returns an error for formats other than `toml` and `json`.
pub fn get_template(format: &str) -> Result<String, ConfigError> {
  match format {
    "toml" => Ok(DEFAULT_TOML_TEMPLATE.to_string()),
    "json" => Ok(serde_json::to_string_pretty(&Config::default())?),
    other => {
      Err(ConfigError::Template(format!(
        "Unsupported config format: {other}"
      )))
    },
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]
  use super::*;

  #[test]
  fn toml_template_matches_defaults() {
    let parsed: Config =
      toml::from_str(DEFAULT_TOML_TEMPLATE).expect("template parses");
    assert_eq!(parsed, Config::default());
  }

  #[test]
  fn json_template_matches_defaults() {
    let json = get_template("json").expect("json template");
    let parsed: Config = serde_json::from_str(&json).expect("json parses");
    assert_eq!(parsed, Config::default());
  }

  #[test]
  fn unknown_format_is_rejected() {
    assert!(matches!(get_template("yaml"), Err(ConfigError::Template(_))));
  }
}
