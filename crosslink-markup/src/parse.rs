//! Tokenizer-driven parser for markup fragments.
//!
//! The html5ever tokenizer does the lexing (entities, attribute quoting,
//! comments, raw-text states) and this module builds the arena tree from the
//! token stream. Tree construction is deliberately shallow: no implied
//! `<html>`/`<body>`, no element re-parenting. An end tag closes the nearest
//! open element of the same name; stray end tags are dropped. This keeps
//! page fragments shaped the way their authors wrote them.
use std::{cell::RefCell, panic};

use html5ever::tokenizer::{
  BufferQueue,
  Tag,
  TagKind,
  Token,
  TokenSink,
  TokenSinkResult,
  Tokenizer,
  TokenizerOpts,
  states::RawKind,
};
use log::{error, trace};
use tendril::StrTendril;

use crate::tree::{Attribute, Element, NodeData, NodeId, Tree};

/// Parse a markup fragment into a [`Tree`].
///
/// Never fails. Empty input yields an empty tree, and a panic anywhere in
/// tokenization is caught, logged, and degraded to an empty tree.
#[must_use]
pub fn parse(raw: &str) -> Tree {
  if raw.is_empty() {
    return Tree::new();
  }

  match panic::catch_unwind(panic::AssertUnwindSafe(|| tokenize(raw))) {
    Ok(tree) => tree,
    Err(e) => {
      if let Some(msg) = e.downcast_ref::<String>() {
        error!("Error parsing markup, treating as empty: {msg}");
      } else if let Some(msg) = e.downcast_ref::<&str>() {
        error!("Error parsing markup, treating as empty: {msg}");
      } else {
        error!("Unknown error while parsing markup, treating as empty");
      }
      Tree::new()
    },
  }
}

/// Parse optional content; `None` is the empty tree.
#[must_use]
pub fn parse_optional(raw: Option<&str>) -> Tree {
  raw.map_or_else(Tree::new, parse)
}

fn tokenize(raw: &str) -> Tree {
  let tokenizer =
    Tokenizer::new(FragmentSink::default(), TokenizerOpts::default());
  let input = BufferQueue::default();
  input.push_back(StrTendril::from_slice(raw));
  let _ = tokenizer.feed(&input);
  tokenizer.end();

  let builder = tokenizer.sink.builder.take();
  builder.tree
}

#[derive(Default)]
struct FragmentSink {
  builder: RefCell<Builder>,
}

impl TokenSink for FragmentSink {
  type Handle = ();

  fn process_token(
    &self,
    token: Token,
    _line_number: u64,
  ) -> TokenSinkResult<()> {
    self.builder.borrow_mut().process(token)
  }
}

/// Incremental tree construction state.
#[derive(Default)]
struct Builder {
  tree: Tree,
  /// Open elements, innermost last.
  open: Vec<NodeId>,
}

impl Builder {
  fn current(&self) -> NodeId {
    self.open.last().copied().unwrap_or_else(|| self.tree.root())
  }

  fn in_raw_text(&self) -> bool {
    self
      .open
      .last()
      .and_then(|&id| self.tree.element(id))
      .is_some_and(Element::is_raw_text)
  }

  fn process(&mut self, token: Token) -> TokenSinkResult<()> {
    match token {
      Token::TagToken(tag) => {
        match tag.kind {
          TagKind::StartTag => return self.start_tag(tag),
          TagKind::EndTag => self.end_tag(&tag),
        }
      },
      Token::CharacterTokens(text) => self.push_text(&text),
      Token::CommentToken(text) => {
        self.attach(NodeData::Comment(text.to_string()));
      },
      Token::DoctypeToken(doctype) => {
        let name = doctype
          .name
          .as_ref()
          .map_or_else(|| "html".to_string(), ToString::to_string);
        self.attach(NodeData::Doctype(name));
      },
      Token::ParseError(message) => trace!("Markup parse error: {message}"),
      _ => {},
    }
    TokenSinkResult::Continue
  }

  fn attach(&mut self, data: NodeData) -> NodeId {
    let parent = self.current();
    let id = self.tree.create(data);
    // Freshly created nodes are detached, so this cannot fail.
    if let Err(e) = self.tree.append(parent, id) {
      error!("Failed to attach parsed node: {e}");
    }
    id
  }

  fn start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
    let element = Element {
      name:         tag.name.to_string(),
      attrs:        tag
        .attrs
        .iter()
        .map(|attr| {
          Attribute::new(attr.name.local.to_string(), attr.value.to_string())
        })
        .collect(),
      self_closing: tag.self_closing,
      closed:       false,
    };

    let opens = !element.is_void() && !tag.self_closing;
    let raw_kind = if opens {
      if element.name == "script" {
        Some(RawKind::ScriptData)
      } else if element.is_raw_text() {
        Some(RawKind::Rawtext)
      } else if element.is_rcdata() {
        Some(RawKind::Rcdata)
      } else {
        None
      }
    } else {
      None
    };

    let id = self.attach(NodeData::Element(element));
    if opens {
      self.open.push(id);
    }

    match raw_kind {
      Some(kind) => TokenSinkResult::RawData(kind),
      None => TokenSinkResult::Continue,
    }
  }

  fn end_tag(&mut self, tag: &Tag) {
    let name: &str = &tag.name;
    let Some(depth) = self
      .open
      .iter()
      .rposition(|&id| self.tree.is_element_named(id, name))
    else {
      trace!("Dropping stray end tag </{name}>");
      return;
    };

    let id = self.open[depth];
    if let Some(element) = self.tree.element_mut(id) {
      element.closed = true;
    }
    self.open.truncate(depth);
  }

  fn push_text(&mut self, text: &str) {
    if text.is_empty() {
      return;
    }
    let raw = self.in_raw_text();
    let parent = self.current();

    // The tokenizer splits character data around entities and newlines;
    // keep one text node per run so names spanning a split still match.
    let mergeable = self.tree.children(parent).last().copied().filter(|&last| {
      matches!(self.tree.data(last), Some(NodeData::Text { raw: r, .. }) if *r == raw)
    });
    if let Some(last) = mergeable {
      self.extend_text(last, text);
      return;
    }

    self.attach(NodeData::Text {
      text: text.to_string(),
      raw,
    });
  }

  fn extend_text(&mut self, id: NodeId, tail: &str) {
    if let Some(text) = self.tree.text_mut(id) {
      text.push_str(tail);
    }
  }
}
