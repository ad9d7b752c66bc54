use std::{io, path::PathBuf};

use thiserror::Error;

/// Error type for crosslink-config operations
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config file {}: {source}", path.display())]
  Read {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Failed to write config file {}: {source}", path.display())]
  Write {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Failed to parse config file {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },

  /// The file extension does not name a supported format.
  #[error("Unsupported config file format: {}", .0.display())]
  Format(PathBuf),

  /// A value that parsed but cannot be used, or a bad override.
  #[error("Invalid configuration: {0}")]
  Invalid(String),

  #[error("Template error: {0}")]
  Template(String),

  #[error("Serde error: {0}")]
  Serde(#[from] serde_json::Error),
}
