use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How trigger operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
  /// Run the operation synchronously on the caller's thread.
  #[default]
  Inline,
  /// Hand the operation to a background worker pool.
  Queued,
  /// Log and skip. Every operation is idempotent, so skipped work can be
  /// caught up later with a full relink.
  Disabled,
}

impl fmt::Display for DispatchMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Inline => "inline",
      Self::Queued => "queued",
      Self::Disabled => "disabled",
    })
  }
}

impl FromStr for DispatchMode {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "inline" | "sync" => Ok(Self::Inline),
      "queued" | "queue" | "background" => Ok(Self::Queued),
      "disabled" | "off" | "none" => Ok(Self::Disabled),
      other => {
        Err(ConfigError::Invalid(format!(
          "unknown dispatch mode '{other}', expected one of: inline, queued, \
           disabled"
        )))
      },
    }
  }
}

/// Dispatcher selection and queue tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
  /// Execution mode, chosen once at process start.
  pub mode: DispatchMode,

  /// Worker threads for the queued dispatcher. The engine does no per-page
  /// locking, so more than one worker can lose concurrent edits to the same
  /// page.
  pub workers: usize,

  /// Extra attempts for a queued operation that failed to persist.
  pub max_retries: u32,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      mode:        DispatchMode::Inline,
      workers:     1,
      max_retries: 3,
    }
  }
}
