use std::{
  fs,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{dispatch::DispatchConfig, error::ConfigError, links::LinksConfig, templates};

/// File names probed, in order, when no config file is given explicitly.
const DISCOVERED_CONFIG_FILES: &[&str] =
  &["crosslink.toml", ".crosslink.toml", "crosslink.json"];

/// Configuration for the crosslink engine and its command line tool.
///
/// Loaded from a TOML or JSON file (by extension), merged across multiple
/// files in order, then patched with `KEY=VALUE` overrides. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// JSON corpus file used by the file-backed document store.
  pub corpus_path: PathBuf,

  /// Dispatcher selection.
  pub dispatch: DispatchConfig,

  /// Link shape and skipped elements.
  pub links: LinksConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      corpus_path: PathBuf::from("corpus.json"),
      dispatch:    DispatchConfig::default(),
      links:       LinksConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from a file (TOML or JSON).
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be read or parsed, or if the format is
  /// unsupported.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    Self::from_value(path, read_value(path)?)
  }

  fn from_value(path: &Path, value: Value) -> Result<Self, ConfigError> {
    serde_json::from_value(value).map_err(|e| {
      ConfigError::Parse {
        path:    path.to_path_buf(),
        message: e.to_string(),
      }
    })
  }

  /// Load configuration from files and overrides.
  ///
  /// Explicit files are merged in order; without any, a config file in the
  /// working directory is used if one exists, else the defaults. Overrides
  /// are applied last.
  ///
  /// # Errors
  ///
  /// Returns an error if a file cannot be loaded or an override is invalid.
  pub fn load(
    config_files: &[PathBuf],
    config_overrides: &[String],
  ) -> Result<Self, ConfigError> {
    let mut config = if let Some(last) = config_files.last() {
      let mut merged = Value::Object(Map::new());
      for path in config_files {
        merge_values(&mut merged, read_value(path)?);
      }
      if config_files.len() > 1 {
        log::info!("Loaded and merged {} config files", config_files.len());
      }
      Self::from_value(last, merged)?
    } else if let Some(discovered) = Self::find_config_file() {
      log::info!("Using discovered config file: {}", discovered.display());
      Self::from_file(&discovered)?
    } else {
      Self::default()
    };

    if !config_overrides.is_empty() {
      config.apply_overrides(config_overrides)?;
    }

    config.validate()?;
    Ok(config)
  }

  /// Look for a config file in the current working directory.
  #[must_use]
  pub fn find_config_file() -> Option<PathBuf> {
    DISCOVERED_CONFIG_FILES
      .iter()
      .map(PathBuf::from)
      .find(|path| path.is_file())
  }

  /// Apply configuration overrides from KEY=VALUE strings.
  ///
  /// # Errors
  ///
  /// Returns an error if an override is not `KEY=VALUE`, names an unknown
  /// key, or carries a value of the wrong type.
  ///
  /// # Example
  ///
  /// ```rust
  /// # use crosslink_config::{Config, DispatchMode};
  /// let mut config = Config::default();
  /// config
  ///   .apply_overrides(&["dispatch.mode=queued".to_string()])
  ///   .expect("valid override");
  /// assert_eq!(config.dispatch.mode, DispatchMode::Queued);
  /// ```
  pub fn apply_overrides(
    &mut self,
    overrides: &[String],
  ) -> Result<(), ConfigError> {
    for override_str in overrides {
      let (key, value) = override_str.split_once('=').ok_or_else(|| {
        ConfigError::Invalid(format!(
          "override '{override_str}' is not in KEY=VALUE form"
        ))
      })?;

      self.apply_override(key.trim(), value.trim())?;
    }
    Ok(())
  }

  fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
      "corpus_path" => self.corpus_path = PathBuf::from(value),
      "dispatch.mode" => self.dispatch.mode = value.parse()?,
      "dispatch.workers" => self.dispatch.workers = parse_value(key, value)?,
      "dispatch.max_retries" => {
        self.dispatch.max_retries = parse_value(key, value)?;
      },
      "links.class" => self.links.class = value.to_string(),
      "links.include_title" => {
        self.links.include_title = parse_value(key, value)?;
      },
      "links.skip_tags" => {
        self.links.skip_tags = value
          .split(',')
          .map(|tag| tag.trim().to_lowercase())
          .filter(|tag| !tag.is_empty())
          .collect();
      },
      _ => {
        return Err(ConfigError::Invalid(format!(
          "unknown configuration key '{key}'"
        )));
      },
    }
    log::debug!("Applied config override {key}={value}");
    Ok(())
  }

  /// Check values that deserialize fine but cannot work.
  ///
  /// # Errors
  ///
  /// Returns an error for a zero worker count or a blank link class.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.dispatch.workers == 0 {
      return Err(ConfigError::Invalid(
        "dispatch.workers must be at least 1".to_string(),
      ));
    }
    if self.links.class.trim().is_empty() {
      return Err(ConfigError::Invalid(
        "links.class must not be empty".to_string(),
      ));
    }
    Ok(())
  }

  /// Write a commented default configuration file.
  ///
  /// # Errors
  ///
  /// Returns an error for unsupported formats or if the file cannot be
  /// written.
  pub fn generate_default_config(
    format: &str,
    path: &Path,
  ) -> Result<(), ConfigError> {
    let config_content = templates::get_template(format)?;

    fs::write(path, config_content).map_err(|source| {
      ConfigError::Write {
        path: path.to_path_buf(),
        source,
      }
    })?;

    log::info!("Created default configuration file: {}", path.display());
    Ok(())
  }
}

/// Read a config file into an untyped tree, choosing the parser by
/// extension.
fn read_value(path: &Path) -> Result<Value, ConfigError> {
  let content = fs::read_to_string(path).map_err(|source| {
    ConfigError::Read {
      path: path.to_path_buf(),
      source,
    }
  })?;

  let parse_error = |message: String| {
    ConfigError::Parse {
      path: path.to_path_buf(),
      message,
    }
  };

  let extension = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_lowercase);

  match extension.as_deref() {
    Some("json") => {
      serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
    },
    Some("toml") => {
      toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
    },
    _ => Err(ConfigError::Format(path.to_path_buf())),
  }
}

/// Lay `overlay` over `base`. Tables merge key by key; any other value a
/// later file mentions replaces the earlier one, defaults included.
fn merge_values(base: &mut Value, overlay: Value) {
  match (base, overlay) {
    (Value::Object(base), Value::Object(overlay)) => {
      for (key, value) in overlay {
        match base.get_mut(&key) {
          Some(existing) => merge_values(existing, value),
          None => {
            base.insert(key, value);
          },
        }
      }
    },
    (base, overlay) => *base = overlay,
  }
}

fn parse_value<T: std::str::FromStr>(
  key: &str,
  value: &str,
) -> Result<T, ConfigError> {
  value.parse().map_err(|_| {
    ConfigError::Invalid(format!("'{value}' is not a valid value for '{key}'"))
  })
}
