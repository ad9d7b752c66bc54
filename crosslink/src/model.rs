//! Pages, characteristics and the identifiers that tie them together.
use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub u64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl FromStr for $name {
      type Err = ParseIntError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
      }
    }
  };
}

id_type!(
  /// Identifier of a page.
  PageId
);
id_type!(
  /// Identifier of a world (game world) that scopes pages.
  WorldId
);
id_type!(
  /// Identifier of a concept inside a world.
  ConceptId
);
id_type!(
  /// Identifier of a characteristic definition.
  CharacteristicId
);
id_type!(
  /// Identifier of a stored characteristic value row.
  ValueId
);

/// Canonical URL of a page. Used both to write links and to recognise them,
/// so the format must not change.
#[must_use]
pub fn canonical_url(world: WorldId, concept: ConceptId, page: PageId) -> String {
  format!("/worlds/{world}/concept/{concept}/page/{page}")
}

const fn default_true() -> bool {
  true
}

/// A document in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub id:           PageId,
  pub gameworld_id: WorldId,
  pub concept_id:   ConceptId,

  /// Display name, matched case-insensitively.
  pub name: String,

  /// Markup content. `None` behaves like an empty document.
  #[serde(default)]
  pub content: Option<String>,

  /// Whether this page's own content gets links inserted.
  #[serde(default = "default_true")]
  pub allow_crosslinks: bool,

  /// Whether pages from other worlds may be linked from this page.
  #[serde(default)]
  pub allow_crossworld: bool,

  /// Whether this page is kept out of every other page's candidate set.
  #[serde(default)]
  pub ignore_crosslink: bool,
}

impl Page {
  #[must_use]
  pub fn canonical_url(&self) -> String {
    canonical_url(self.gameworld_id, self.concept_id, self.id)
  }

  #[must_use]
  pub fn content_str(&self) -> &str {
    self.content.as_deref().unwrap_or_default()
  }
}

/// Type tag of a characteristic definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CharacteristicKind {
  /// Values are lists of page identifiers.
  PageRef,
  /// Any other type; the engine never touches these values.
  Other(String),
}

impl From<String> for CharacteristicKind {
  fn from(s: String) -> Self {
    if s == "page_ref" {
      Self::PageRef
    } else {
      Self::Other(s)
    }
  }
}

impl From<CharacteristicKind> for String {
  fn from(kind: CharacteristicKind) -> Self {
    match kind {
      CharacteristicKind::PageRef => "page_ref".to_string(),
      CharacteristicKind::Other(s) => s,
    }
  }
}

/// A typed attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
  pub id:   CharacteristicId,
  pub name: String,

  #[serde(rename = "type")]
  pub kind: CharacteristicKind,

  /// Concept whose pages a `page_ref` characteristic may point to.
  #[serde(default)]
  pub ref_concept_id: Option<ConceptId>,
}

/// A characteristic value attached to a page.
///
/// `value` is kept in its persisted form because non-`page_ref`
/// characteristics share the same table with arbitrary payloads. Page
/// references are read and written through [`PageRefList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCharacteristicValue {
  pub id:                ValueId,
  pub page_id:           PageId,
  pub characteristic_id: CharacteristicId,
  #[serde(default)]
  pub value:             Value,
}

/// Why a persisted value could not be read as page references.
#[derive(Debug, thiserror::Error)]
pub enum PageRefError {
  #[error("expected a list of page ids, found {0}")]
  NotAList(String),

  #[error("'{0}' is not a page id")]
  BadId(String),
}

/// Ordered list of referenced pages.
///
/// Persisted as a JSON array of decimal strings (`["3", "5"]`). Reading also
/// accepts bare integers, and `null` reads as the empty list. A string is an
/// id only in its canonical decimal form, surrounding whitespace aside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRefList(Vec<PageId>);

impl PageRefList {
  #[must_use]
  pub const fn new(ids: Vec<PageId>) -> Self {
    Self(ids)
  }

  /// Decode the persisted representation.
  ///
  /// # Errors
  ///
  /// Fails when the value is not an array, or an entry is not a page id.
  pub fn from_persisted(value: &Value) -> Result<Self, PageRefError> {
    let items = match value {
      Value::Null => return Ok(Self::default()),
      Value::Array(items) => items,
      other => return Err(PageRefError::NotAList(other.to_string())),
    };

    items
      .iter()
      .map(|item| {
        match item {
          Value::String(s) => {
            s.parse()
              .ok()
              .filter(|id: &PageId| id.to_string() == s.trim())
              .ok_or_else(|| PageRefError::BadId(s.clone()))
          },
          Value::Number(n) => {
            n.as_u64()
              .map(PageId)
              .ok_or_else(|| PageRefError::BadId(n.to_string()))
          },
          other => Err(PageRefError::BadId(other.to_string())),
        }
      })
      .collect::<Result<Vec<_>, _>>()
      .map(Self)
  }

  /// Remove `id` from a persisted list without decoding the rest of it.
  ///
  /// A string entry matches only when, trimmed, it is the decimal form of
  /// `id` (`"05"` is not page 5); a number entry matches by value. Entries
  /// that are not page ids are kept as they are. Returns the filtered array,
  /// or `None` when nothing was removed.
  ///
  /// # Errors
  ///
  /// Fails when the value is neither an array nor `null`.
  pub fn strip_persisted(
    value: &Value,
    id: PageId,
  ) -> Result<Option<Value>, PageRefError> {
    let items = match value {
      Value::Null => return Ok(None),
      Value::Array(items) => items,
      other => return Err(PageRefError::NotAList(other.to_string())),
    };

    let canonical = id.to_string();
    let kept: Vec<Value> = items
      .iter()
      .filter(|item| {
        match item {
          Value::String(s) => s.trim() != canonical,
          Value::Number(n) => n.as_u64() != Some(id.0),
          _ => true,
        }
      })
      .cloned()
      .collect();

    if kept.len() == items.len() {
      return Ok(None);
    }
    Ok(Some(Value::Array(kept)))
  }

  /// Encode as a JSON array of decimal strings.
  #[must_use]
  pub fn to_persisted(&self) -> Value {
    Value::Array(
      self
        .0
        .iter()
        .map(|id| Value::String(id.to_string()))
        .collect(),
    )
  }

  #[must_use]
  pub fn contains(&self, id: PageId) -> bool {
    self.0.contains(&id)
  }

  #[must_use]
  pub fn ids(&self) -> &[PageId] {
    &self.0
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}
