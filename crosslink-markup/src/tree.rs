//! Arena-backed markup tree.
//!
//! Every node lives in a single `Vec` owned by [`Tree`] and is addressed by a
//! [`NodeId`]. Parent links are stored as indices, so structural edits are
//! explicit arena operations (`append`, `replace_with`, `detach`) rather than
//! pointer surgery. Detached nodes stay in the arena until the tree is
//! dropped; they are simply unreachable from the root.
use std::fmt;

use crate::error::MarkupError;

/// Element names that never take children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
  "param", "source", "track", "wbr",
];

/// Element names whose content is tokenized as raw text.
pub const RAW_TEXT_ELEMENTS: &[&str] =
  &["script", "style", "xmp", "iframe", "noembed", "noframes"];

/// Element names whose content is tokenized as escapable raw text. Entities
/// are decoded, but the content is text only and can never hold a link.
pub const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// Index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
  /// Position of the node in the arena.
  #[must_use]
  pub const fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
  pub name:  String,
  pub value: String,
}

impl Attribute {
  pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      name:  name.into(),
      value: value.into(),
    }
  }
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  /// Lowercased local name.
  pub name:         String,
  /// Attributes in source order.
  pub attrs:        Vec<Attribute>,
  /// Written as `<name/>` in the source.
  pub self_closing: bool,
  /// An explicit end tag was present in the source (or the element was
  /// created programmatically). Unclosed elements serialize without one.
  pub closed:       bool,
}

impl Element {
  /// Create a closed element with the given attributes.
  pub fn new(name: impl Into<String>, attrs: Vec<Attribute>) -> Self {
    Self {
      name: name.into(),
      attrs,
      self_closing: false,
      closed: true,
    }
  }

  /// Look up an attribute value by (lowercase) name.
  #[must_use]
  pub fn attr(&self, name: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|attr| attr.name == name)
      .map(|attr| attr.value.as_str())
  }

  #[must_use]
  pub fn is_void(&self) -> bool {
    VOID_ELEMENTS.contains(&self.name.as_str())
  }

  #[must_use]
  pub fn is_raw_text(&self) -> bool {
    RAW_TEXT_ELEMENTS.contains(&self.name.as_str())
  }

  #[must_use]
  pub fn is_rcdata(&self) -> bool {
    RCDATA_ELEMENTS.contains(&self.name.as_str())
  }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
  /// The root. Exactly one per tree, always at index 0.
  Document,
  Element(Element),
  /// Character data. `raw` text came from a raw-text element (`<script>`,
  /// `<style>`, ...) and is written back without escaping.
  Text { text: String, raw: bool },
  Comment(String),
  Doctype(String),
}

#[derive(Debug, Clone)]
struct Node {
  data:     NodeData,
  parent:   Option<NodeId>,
  children: Vec<NodeId>,
}

/// A parsed markup fragment.
#[derive(Debug, Clone)]
pub struct Tree {
  nodes: Vec<Node>,
}

impl Default for Tree {
  fn default() -> Self {
    Self::new()
  }
}

impl Tree {
  /// An empty tree containing only the document root.
  #[must_use]
  pub fn new() -> Self {
    Self {
      nodes: vec![Node {
        data:     NodeData::Document,
        parent:   None,
        children: Vec::new(),
      }],
    }
  }

  #[must_use]
  pub const fn root(&self) -> NodeId {
    NodeId(0)
  }

  /// Whether the document root has no children.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.nodes[0].children.is_empty()
  }

  /// Number of arena slots, detached nodes included.
  #[must_use]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  fn check(&self, id: NodeId) -> Result<(), MarkupError> {
    if id.0 < self.nodes.len() {
      Ok(())
    } else {
      Err(MarkupError::UnknownNode(id))
    }
  }

  #[must_use]
  pub fn data(&self, id: NodeId) -> Option<&NodeData> {
    self.nodes.get(id.0).map(|node| &node.data)
  }

  #[must_use]
  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id.0).and_then(|node| node.parent)
  }

  #[must_use]
  pub fn children(&self, id: NodeId) -> &[NodeId] {
    self
      .nodes
      .get(id.0)
      .map_or(&[][..], |node| node.children.as_slice())
  }

  #[must_use]
  pub fn element(&self, id: NodeId) -> Option<&Element> {
    match self.data(id) {
      Some(NodeData::Element(element)) => Some(element),
      _ => None,
    }
  }

  pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
    match self.nodes.get_mut(id.0).map(|node| &mut node.data) {
      Some(NodeData::Element(element)) => Some(element),
      _ => None,
    }
  }

  /// Text of a non-raw or raw text node.
  #[must_use]
  pub fn text(&self, id: NodeId) -> Option<&str> {
    match self.data(id) {
      Some(NodeData::Text { text, .. }) => Some(text),
      _ => None,
    }
  }

  pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
    match self.nodes.get_mut(id.0).map(|node| &mut node.data) {
      Some(NodeData::Text { text, .. }) => Some(text),
      _ => None,
    }
  }

  #[must_use]
  pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
    self.element(id).is_some_and(|element| element.name == name)
  }

  /// Walk from the parent of `id` up to the root.
  #[must_use]
  pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
    Ancestors {
      tree: self,
      next: self.parent(id),
    }
  }

  /// Whether any ancestor of `id` is an element with one of `names`.
  #[must_use]
  pub fn has_ancestor_named(&self, id: NodeId, names: &[&str]) -> bool {
    self.ancestors(id).any(|ancestor| {
      self
        .element(ancestor)
        .is_some_and(|element| names.contains(&element.name.as_str()))
    })
  }

  /// Nodes below `id` in document (pre-)order, `id` itself excluded.
  #[must_use]
  pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
    let mut stack: Vec<NodeId> = self.children(id).to_vec();
    stack.reverse();
    Descendants { tree: self, stack }
  }

  /// All text nodes reachable from the root, in document order.
  #[must_use]
  pub fn text_nodes(&self) -> Vec<NodeId> {
    self
      .descendants(self.root())
      .filter(|&id| matches!(self.data(id), Some(NodeData::Text { .. })))
      .collect()
  }

  /// All `<a>` elements carrying an `href`, in document order.
  #[must_use]
  pub fn anchors(&self) -> Vec<NodeId> {
    self
      .descendants(self.root())
      .filter(|&id| {
        self
          .element(id)
          .is_some_and(|element| element.name == "a" && element.attr("href").is_some())
      })
      .collect()
  }

  /// Concatenated text of `id` and everything below it.
  #[must_use]
  pub fn text_contents(&self, id: NodeId) -> String {
    if let Some(text) = self.text(id) {
      return text.to_string();
    }
    let mut out = String::new();
    for descendant in self.descendants(id) {
      if let Some(NodeData::Text { text, .. }) = self.data(descendant) {
        out.push_str(text);
      }
    }
    out
  }

  /// Allocate a detached node.
  pub fn create(&mut self, data: NodeData) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(Node {
      data,
      parent: None,
      children: Vec::new(),
    });
    id
  }

  /// Allocate a detached, escaped text node.
  pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
    self.create(NodeData::Text {
      text: text.into(),
      raw:  false,
    })
  }

  /// Allocate a detached element.
  pub fn create_element(&mut self, element: Element) -> NodeId {
    self.create(NodeData::Element(element))
  }

  /// Append a detached node as the last child of `parent`.
  ///
  /// # Errors
  ///
  /// Fails if either id is unknown or `child` is still attached somewhere.
  pub fn append(
    &mut self,
    parent: NodeId,
    child: NodeId,
  ) -> Result<(), MarkupError> {
    self.check(parent)?;
    self.check(child)?;
    if self.nodes[child.0].parent.is_some() || child == self.root() {
      return Err(MarkupError::Attached(child));
    }
    self.nodes[child.0].parent = Some(parent);
    self.nodes[parent.0].children.push(child);
    Ok(())
  }

  /// Remove `id` from its parent. The node keeps its own subtree.
  ///
  /// # Errors
  ///
  /// Fails if `id` is unknown or already detached.
  pub fn detach(&mut self, id: NodeId) -> Result<(), MarkupError> {
    let parent = self.position(id)?.0;
    self.nodes[parent.0].children.retain(|&child| child != id);
    self.nodes[id.0].parent = None;
    Ok(())
  }

  fn position(&self, id: NodeId) -> Result<(NodeId, usize), MarkupError> {
    self.check(id)?;
    let parent = self.nodes[id.0].parent.ok_or(MarkupError::Detached(id))?;
    let index = self.nodes[parent.0]
      .children
      .iter()
      .position(|&child| child == id)
      .ok_or(MarkupError::Detached(id))?;
    Ok((parent, index))
  }

  /// Swap `target` for `replacements` at the same sibling position.
  ///
  /// `replacements` must all be detached. `target` ends up detached.
  ///
  /// # Errors
  ///
  /// Fails if `target` has no parent or a replacement is attached.
  pub fn replace_with(
    &mut self,
    target: NodeId,
    replacements: &[NodeId],
  ) -> Result<(), MarkupError> {
    let (parent, index) = self.position(target)?;
    for &replacement in replacements {
      self.check(replacement)?;
      if self.nodes[replacement.0].parent.is_some()
        || replacement == self.root()
      {
        return Err(MarkupError::Attached(replacement));
      }
    }

    for &replacement in replacements {
      self.nodes[replacement.0].parent = Some(parent);
    }
    self.nodes[parent.0]
      .children
      .splice(index..=index, replacements.iter().copied());
    self.nodes[target.0].parent = None;
    Ok(())
  }

  /// Fold runs of adjacent escaped text children of `parent` into one node.
  pub fn merge_adjacent_text(&mut self, parent: NodeId) {
    let children = self.children(parent).to_vec();
    let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

    for child in children {
      let mergeable = matches!(
        self.data(child),
        Some(NodeData::Text { raw: false, .. })
      );
      let previous = kept.last().copied().filter(|&prev| {
        matches!(self.data(prev), Some(NodeData::Text { raw: false, .. }))
      });

      match (mergeable, previous) {
        (true, Some(prev)) => {
          let tail = self.text(child).unwrap_or_default().to_string();
          if let NodeData::Text { text, .. } = &mut self.nodes[prev.0].data {
            text.push_str(&tail);
          }
          self.nodes[child.0].parent = None;
        },
        _ => kept.push(child),
      }
    }

    // Drop empty text left over from splits.
    kept.retain(|&child| {
      let empty = self.text(child).is_some_and(str::is_empty);
      if empty {
        self.nodes[child.0].parent = None;
      }
      !empty
    });

    if let Some(node) = self.nodes.get_mut(parent.0) {
      node.children = kept;
    }
  }
}

/// Iterator returned by [`Tree::ancestors`].
pub struct Ancestors<'a> {
  tree: &'a Tree,
  next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let current = self.next?;
    self.next = self.tree.parent(current);
    Some(current)
  }
}

/// Iterator returned by [`Tree::descendants`].
pub struct Descendants<'a> {
  tree:  &'a Tree,
  stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let current = self.stack.pop()?;
    self
      .stack
      .extend(self.tree.children(current).iter().rev().copied());
    Some(current)
  }
}
