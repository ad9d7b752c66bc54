//! # crosslink-markup
//!
//! Markup plumbing for automatic page crosslinking: an arena-backed tree for
//! HTML fragments, a word-bounded name matcher that never looks inside
//! existing links, and the two edits the crosslinker needs (wrap a span in a
//! link, unwrap a link back to text).
//!
//! ```rust
//! use crosslink_markup::{
//!   LinkSpec, MatchOptions, NamePattern, find_first_unlinked_occurrence,
//!   parse, serialize, wrap_with_link,
//! };
//!
//! let mut tree = parse("<p>The Castle looms.</p>");
//! let pattern = NamePattern::new("castle").unwrap();
//! if let Some(found) =
//!   find_first_unlinked_occurrence(&tree, &pattern, &MatchOptions::default())
//! {
//!   let link = LinkSpec {
//!     href:  "/worlds/1/concept/2/page/3".to_string(),
//!     class: Some("wiki-link".to_string()),
//!     title: Some("Castle".to_string()),
//!   };
//!   wrap_with_link(&mut tree, &found, &link).unwrap();
//! }
//! assert!(serialize(&tree).contains(">Castle</a>"));
//! ```
//!
//! Parsing never fails: malformed input is tokenized best-effort and empty
//! or unparsable input becomes an empty tree.

pub mod error;
pub mod matcher;
pub mod mutate;
pub mod parse;
pub mod serialize;
pub mod tree;

pub use crate::{
  error::MarkupError,
  matcher::{
    DEFAULT_SKIP_TAGS,
    Match,
    MatchOptions,
    NamePattern,
    find_first_unlinked_occurrence,
  },
  mutate::{LinkSpec, unwrap_link, wrap_with_link},
  parse::{parse, parse_optional},
  serialize::serialize,
  tree::{Attribute, Element, NodeData, NodeId, Tree},
};
