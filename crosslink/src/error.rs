use crosslink_markup::MarkupError;
use thiserror::Error;

use crate::store::StoreError;

/// Top-level error type for the crosslink engine.
///
/// Missing pages and characteristics are not errors: deletions race with
/// queued work all the time, so lookups that come back empty end the
/// operation successfully instead.
#[derive(Debug, Error)]
pub enum CrosslinkError {
  /// Reading from or writing back to the document store failed.
  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Markup error: {0}")]
  Markup(#[from] MarkupError),

  #[error("Regex error: {0}")]
  Regex(#[from] regex::Error),

  #[error("Dispatch error: {0}")]
  Dispatch(String),
}

impl CrosslinkError {
  /// Whether re-running the same operation may succeed.
  ///
  /// Every operation is idempotent, so persistence failures are always
  /// worth another attempt.
  #[must_use]
  pub const fn is_retryable(&self) -> bool {
    matches!(self, Self::Store(_))
  }
}

pub type Result<T, E = CrosslinkError> = std::result::Result<T, E>;
