use std::{
  collections::BTreeMap,
  sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::{
  CharacteristicFilter,
  Corpus,
  DocumentStore,
  PageFilter,
  StoreError,
};
use crate::model::{
  Characteristic,
  CharacteristicId,
  Page,
  PageCharacteristicValue,
  PageId,
  ValueId,
};

#[derive(Debug, Default)]
struct Tables {
  pages:           BTreeMap<PageId, Page>,
  characteristics: BTreeMap<CharacteristicId, Characteristic>,
  values:          BTreeMap<ValueId, PageCharacteristicValue>,
}

/// In-memory document store.
///
/// Tables are keyed by id, so every listing comes back in id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn from_corpus(corpus: Corpus) -> Self {
    let tables = Tables {
      pages:           corpus.pages.into_iter().map(|p| (p.id, p)).collect(),
      characteristics: corpus
        .characteristics
        .into_iter()
        .map(|c| (c.id, c))
        .collect(),
      values:          corpus.values.into_iter().map(|v| (v.id, v)).collect(),
    };
    Self {
      tables: RwLock::new(tables),
    }
  }

  /// Snapshot the whole store.
  ///
  /// # Errors
  ///
  /// Returns [`StoreError::Poisoned`] if a writer panicked.
  pub fn to_corpus(&self) -> Result<Corpus, StoreError> {
    let tables = self.read()?;
    Ok(Corpus {
      pages:           tables.pages.values().cloned().collect(),
      characteristics: tables.characteristics.values().cloned().collect(),
      values:          tables.values.values().cloned().collect(),
    })
  }

  /// Remove a page. Returns the removed page, if any.
  ///
  /// # Errors
  ///
  /// Returns [`StoreError::Poisoned`] if a writer panicked.
  pub fn delete_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    Ok(self.write()?.pages.remove(&id))
  }

  /// Insert or replace a characteristic definition.
  ///
  /// # Errors
  ///
  /// Returns [`StoreError::Poisoned`] if a writer panicked.
  pub fn save_characteristic(
    &self,
    characteristic: Characteristic,
  ) -> Result<(), StoreError> {
    self
      .write()?
      .characteristics
      .insert(characteristic.id, characteristic);
    Ok(())
  }

  /// Fetch a single value row.
  ///
  /// # Errors
  ///
  /// Returns [`StoreError::Poisoned`] if a writer panicked.
  pub fn get_characteristic_value(
    &self,
    id: ValueId,
  ) -> Result<Option<PageCharacteristicValue>, StoreError> {
    Ok(self.read()?.values.get(&id).cloned())
  }

  pub(super) fn remove_characteristic_value(
    &self,
    id: ValueId,
  ) -> Result<(), StoreError> {
    self.write()?.values.remove(&id);
    Ok(())
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
    self.tables.read().map_err(|_| StoreError::Poisoned)
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
    self.tables.write().map_err(|_| StoreError::Poisoned)
  }
}

impl DocumentStore for MemoryStore {
  fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    Ok(self.read()?.pages.get(&id).cloned())
  }

  fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
    Ok(
      self
        .read()?
        .pages
        .values()
        .filter(|page| filter.matches(page))
        .cloned()
        .collect(),
    )
  }

  fn save_page(&self, page: &Page) -> Result<(), StoreError> {
    self.write()?.pages.insert(page.id, page.clone());
    Ok(())
  }

  fn list_characteristics(
    &self,
    filter: &CharacteristicFilter,
  ) -> Result<Vec<Characteristic>, StoreError> {
    Ok(
      self
        .read()?
        .characteristics
        .values()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect(),
    )
  }

  fn list_characteristic_values(
    &self,
    characteristic: CharacteristicId,
  ) -> Result<Vec<PageCharacteristicValue>, StoreError> {
    Ok(
      self
        .read()?
        .values
        .values()
        .filter(|v| v.characteristic_id == characteristic)
        .cloned()
        .collect(),
    )
  }

  fn save_characteristic_value(
    &self,
    value: &PageCharacteristicValue,
  ) -> Result<(), StoreError> {
    self.write()?.values.insert(value.id, value.clone());
    Ok(())
  }
}
