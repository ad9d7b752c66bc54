//! Document store boundary.
//!
//! The engine never talks to a database directly. It loads and writes pages
//! and characteristic values through [`DocumentStore`]; each `save_*` call
//! must persist atomically (all of the record or none of it).
use std::{io, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
  Characteristic,
  CharacteristicId,
  CharacteristicKind,
  ConceptId,
  Page,
  PageCharacteristicValue,
  PageId,
  WorldId,
};

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Errors surfaced by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Serde error: {0}")]
  Serde(#[from] serde_json::Error),

  /// A lock guarding in-memory state was poisoned by a panicking writer.
  #[error("store lock poisoned")]
  Poisoned,

  /// The backend refused or failed the request.
  #[error("store unavailable: {0}")]
  Unavailable(String),
}

/// Which pages to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFilter {
  /// Only pages in this world.
  pub world:        Option<WorldId>,
  /// Leave this page out.
  pub exclude:      Option<PageId>,
  /// Only pages that may be used as link targets (`ignore_crosslink` unset).
  pub targets_only: bool,
}

impl PageFilter {
  #[must_use]
  pub fn matches(&self, page: &Page) -> bool {
    self.world.is_none_or(|world| page.gameworld_id == world)
      && self.exclude != Some(page.id)
      && !(self.targets_only && page.ignore_crosslink)
  }
}

/// Which characteristics to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacteristicFilter {
  pub kind:        Option<CharacteristicKind>,
  pub ref_concept: Option<ConceptId>,
}

impl CharacteristicFilter {
  /// `page_ref` characteristics pointing into `concept`.
  #[must_use]
  pub const fn page_refs_into(concept: ConceptId) -> Self {
    Self {
      kind:        Some(CharacteristicKind::PageRef),
      ref_concept: Some(concept),
    }
  }

  #[must_use]
  pub fn matches(&self, characteristic: &Characteristic) -> bool {
    self
      .kind
      .as_ref()
      .is_none_or(|kind| &characteristic.kind == kind)
      && self
        .ref_concept
        .is_none_or(|concept| characteristic.ref_concept_id == Some(concept))
  }
}

/// Persistence operations the engine depends on.
///
/// `list_pages` must return pages in a stable order (by id for the bundled
/// stores); candidate de-duplication keeps the first page per name, so the
/// order decides which of two same-named pages gets linked.
pub trait DocumentStore: Send + Sync {
  /// Fetch a page. `Ok(None)` when it does not exist.
  ///
  /// # Errors
  ///
  /// Returns an error if the backend cannot be read.
  fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError>;

  /// List pages matching `filter`.
  ///
  /// # Errors
  ///
  /// Returns an error if the backend cannot be read.
  fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError>;

  /// Persist a page, replacing any previous version.
  ///
  /// # Errors
  ///
  /// Returns an error if the write did not happen. The stored page is then
  /// unchanged.
  fn save_page(&self, page: &Page) -> Result<(), StoreError>;

  /// List characteristic definitions matching `filter`.
  ///
  /// # Errors
  ///
  /// Returns an error if the backend cannot be read.
  fn list_characteristics(
    &self,
    filter: &CharacteristicFilter,
  ) -> Result<Vec<Characteristic>, StoreError>;

  /// All value rows of one characteristic.
  ///
  /// # Errors
  ///
  /// Returns an error if the backend cannot be read.
  fn list_characteristic_values(
    &self,
    characteristic: CharacteristicId,
  ) -> Result<Vec<PageCharacteristicValue>, StoreError>;

  /// Persist a characteristic value row.
  ///
  /// # Errors
  ///
  /// Returns an error if the write did not happen.
  fn save_characteristic_value(
    &self,
    value: &PageCharacteristicValue,
  ) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
  fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    (**self).get_page(id)
  }

  fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
    (**self).list_pages(filter)
  }

  fn save_page(&self, page: &Page) -> Result<(), StoreError> {
    (**self).save_page(page)
  }

  fn list_characteristics(
    &self,
    filter: &CharacteristicFilter,
  ) -> Result<Vec<Characteristic>, StoreError> {
    (**self).list_characteristics(filter)
  }

  fn list_characteristic_values(
    &self,
    characteristic: CharacteristicId,
  ) -> Result<Vec<PageCharacteristicValue>, StoreError> {
    (**self).list_characteristic_values(characteristic)
  }

  fn save_characteristic_value(
    &self,
    value: &PageCharacteristicValue,
  ) -> Result<(), StoreError> {
    (**self).save_characteristic_value(value)
  }
}

/// Serialized form of a whole corpus, as stored by [`JsonStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Corpus {
  pub pages:           Vec<Page>,
  pub characteristics: Vec<Characteristic>,
  pub values:          Vec<PageCharacteristicValue>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(id: u64, world: u64, ignore: bool) -> Page {
    Page {
      id:               PageId(id),
      gameworld_id:     WorldId(world),
      concept_id:       ConceptId(1),
      name:             format!("Page {id}"),
      content:          None,
      allow_crosslinks: true,
      allow_crossworld: false,
      ignore_crosslink: ignore,
    }
  }

  #[test]
  fn page_filter_combines_conditions() {
    let filter = PageFilter {
      world:        Some(WorldId(1)),
      exclude:      Some(PageId(2)),
      targets_only: true,
    };
    assert!(filter.matches(&page(1, 1, false)));
    assert!(!filter.matches(&page(2, 1, false)));
    assert!(!filter.matches(&page(3, 2, false)));
    assert!(!filter.matches(&page(4, 1, true)));
    assert!(PageFilter::default().matches(&page(4, 9, true)));
  }

  #[test]
  fn characteristic_filter_matches_kind_and_concept() {
    let filter = CharacteristicFilter::page_refs_into(ConceptId(7));
    let mut c = Characteristic {
      id:             CharacteristicId(1),
      name:           "Allies".to_string(),
      kind:           CharacteristicKind::PageRef,
      ref_concept_id: Some(ConceptId(7)),
    };
    assert!(filter.matches(&c));

    c.ref_concept_id = Some(ConceptId(8));
    assert!(!filter.matches(&c));

    c.ref_concept_id = Some(ConceptId(7));
    c.kind = CharacteristicKind::Other("text".to_string());
    assert!(!filter.matches(&c));
  }
}
