//! Write a [`Tree`] back to markup.
//!
//! Output is stable: parsing serialized output and serializing again yields
//! the same bytes. Entities the tokenizer decoded are re-encoded minimally
//! (`&amp;`, `&lt;`, `&gt;` and `&nbsp;` in text, plus `&quot;` in
//! attributes), so already-escaped markup is never double-escaped.
use std::{borrow::Cow, fmt};

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::tree::{Element, NodeData, NodeId, Tree};

const NBSP: char = '\u{a0}';

/// Serialize the whole tree.
#[must_use]
pub fn serialize(tree: &Tree) -> String {
  let mut out = String::new();
  for &child in tree.children(tree.root()) {
    write_node(tree, child, &mut out);
  }
  out
}

impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&serialize(self))
  }
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
  match tree.data(id) {
    Some(NodeData::Document) => {
      for &child in tree.children(id) {
        write_node(tree, child, out);
      }
    },
    Some(NodeData::Element(element)) => write_element(tree, id, element, out),
    Some(NodeData::Text { text, raw: true }) => out.push_str(text),
    Some(NodeData::Text { text, raw: false }) => {
      out.push_str(&escape_text(text));
    },
    Some(NodeData::Comment(text)) => {
      out.push_str("<!--");
      out.push_str(text);
      out.push_str("-->");
    },
    Some(NodeData::Doctype(name)) => {
      out.push_str("<!DOCTYPE ");
      out.push_str(name);
      out.push('>');
    },
    None => {},
  }
}

fn write_element(tree: &Tree, id: NodeId, element: &Element, out: &mut String) {
  out.push('<');
  out.push_str(&element.name);
  for attr in &element.attrs {
    out.push(' ');
    out.push_str(&attr.name);
    if !attr.value.is_empty() {
      out.push_str("=\"");
      out.push_str(&encode_double_quoted_attribute(&attr.value));
      out.push('"');
    }
  }
  if element.self_closing {
    out.push('/');
  }
  out.push('>');

  if element.is_void() || element.self_closing {
    return;
  }

  for &child in tree.children(id) {
    write_node(tree, child, out);
  }

  if element.closed {
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
  }
}

fn escape_text(text: &str) -> Cow<'_, str> {
  let escaped = encode_text(text);
  if escaped.contains(NBSP) {
    Cow::Owned(escaped.replace(NBSP, "&nbsp;"))
  } else {
    escaped
  }
}
