use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised by structural tree edits.
///
/// Parsing never fails; these only surface when a caller hands the mutators
/// a node or span that does not belong to the tree it is editing.
#[derive(Debug, Error)]
pub enum MarkupError {
  #[error("node {0} does not exist in this tree")]
  UnknownNode(NodeId),

  #[error("node {0} has no parent")]
  Detached(NodeId),

  #[error("node {0} is already attached to a parent")]
  Attached(NodeId),

  #[error("node {0} is not a text node")]
  NotText(NodeId),

  #[error("node {0} is not an <a> element")]
  NotAnchor(NodeId),

  /// The span is out of range or splits a UTF-8 sequence, usually because
  /// the tree changed after the match was taken.
  #[error("span {start}..{end} is not valid for text node {node}")]
  StaleSpan {
    node:  NodeId,
    start: usize,
    end:   usize,
  },

  #[error("cannot build a pattern from an empty name")]
  EmptyName,

  #[error("Regex compilation failed: {0}")]
  Regex(#[from] regex::Error),
}
