//! Link insertion and removal.
//!
//! Both operations are pure tree edits that touch only the node being
//! replaced. Callers must apply a [`Match`] to the same tree it was taken
//! from, one edit at a time, and re-match after each edit.
use log::trace;

use crate::{
  error::MarkupError,
  matcher::Match,
  tree::{Attribute, Element, NodeData, NodeId, Tree},
};

/// Attributes of an inserted link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
  pub href:  String,
  pub class: Option<String>,
  pub title: Option<String>,
}

impl LinkSpec {
  fn attributes(&self) -> Vec<Attribute> {
    let mut attrs = vec![Attribute::new("href", self.href.clone())];
    if let Some(class) = &self.class {
      attrs.push(Attribute::new("class", class.clone()));
    }
    if let Some(title) = &self.title {
      attrs.push(Attribute::new("title", title.clone()));
    }
    attrs
  }
}

/// Wrap the matched span in an `<a>` element.
///
/// The text node is split into `[before][<a>matched</a>][after]`; empty
/// pieces are not created. Returns the new anchor.
///
/// # Errors
///
/// Fails if the node is not an attached text node or the span no longer
/// fits its text (the tree changed since the match was taken).
pub fn wrap_with_link(
  tree: &mut Tree,
  found: &Match,
  link: &LinkSpec,
) -> Result<NodeId, MarkupError> {
  let node = found.node;
  let text = match tree.data(node) {
    Some(NodeData::Text { text, raw: false }) => text.clone(),
    Some(_) => return Err(MarkupError::NotText(node)),
    None => return Err(MarkupError::UnknownNode(node)),
  };

  let stale = || {
    MarkupError::StaleSpan {
      node,
      start: found.span.start,
      end: found.span.end,
    }
  };
  let before = text.get(..found.span.start).ok_or_else(stale)?;
  let matched = text.get(found.span.clone()).ok_or_else(stale)?;
  let after = text.get(found.span.end..).ok_or_else(stale)?;
  if matched.is_empty() {
    return Err(stale());
  }

  let mut replacements = Vec::with_capacity(3);
  if !before.is_empty() {
    replacements.push(tree.create_text(before));
  }
  let anchor = tree.create_element(Element::new("a", link.attributes()));
  let label = tree.create_text(matched);
  tree.append(anchor, label)?;
  replacements.push(anchor);
  if !after.is_empty() {
    replacements.push(tree.create_text(after));
  }

  tree.replace_with(node, &replacements)?;
  trace!("Linked '{matched}' to {}", link.href);
  Ok(anchor)
}

/// Replace an `<a>` element with its rendered text.
///
/// The text lands at the anchor's exact sibling position and is folded into
/// neighbouring text so later matching sees one continuous run.
///
/// # Errors
///
/// Fails if `anchor` is not an attached `<a>` element.
pub fn unwrap_link(tree: &mut Tree, anchor: NodeId) -> Result<(), MarkupError> {
  if !tree.is_element_named(anchor, "a") {
    return Err(MarkupError::NotAnchor(anchor));
  }
  let parent = tree.parent(anchor).ok_or(MarkupError::Detached(anchor))?;
  let text = tree.text_contents(anchor);

  if text.is_empty() {
    tree.replace_with(anchor, &[])?;
  } else {
    let replacement = tree.create_text(text);
    tree.replace_with(anchor, &[replacement])?;
  }
  tree.merge_adjacent_text(parent);
  Ok(())
}
