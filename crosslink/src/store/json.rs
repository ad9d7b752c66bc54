use std::{
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::Mutex,
};

use log::{debug, warn};

use super::{
  CharacteristicFilter,
  Corpus,
  DocumentStore,
  MemoryStore,
  PageFilter,
  StoreError,
};
use crate::model::{
  Characteristic,
  CharacteristicId,
  Page,
  PageCharacteristicValue,
  PageId,
};

/// Document store backed by a single JSON file.
///
/// The whole corpus is held in memory. Every save rewrites the file through a
/// temporary sibling and a rename, so readers never see a half-written file.
/// When the write fails the in-memory change is rolled back.
#[derive(Debug)]
pub struct JsonStore {
  path:   PathBuf,
  inner:  MemoryStore,
  writer: Mutex<()>,
}

impl JsonStore {
  /// Open the corpus at `path`. A missing file is an empty corpus.
  ///
  /// # Errors
  ///
  /// Returns an error if the file exists but cannot be read or parsed.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let path = path.into();
    let corpus = match fs::read_to_string(&path) {
      Ok(raw) => serde_json::from_str::<Corpus>(&raw)?,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        warn!(
          "Corpus file {} does not exist, starting empty",
          path.display()
        );
        Corpus::default()
      },
      Err(e) => return Err(e.into()),
    };

    debug!(
      "Loaded {} pages, {} characteristics and {} values from {}",
      corpus.pages.len(),
      corpus.characteristics.len(),
      corpus.values.len(),
      path.display()
    );

    Ok(Self {
      path,
      inner: MemoryStore::from_corpus(corpus),
      writer: Mutex::new(()),
    })
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Remove a page and persist. Returns the removed page, if any.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be written; the page is then kept.
  pub fn delete_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
    let Some(removed) = self.inner.delete_page(id)? else {
      return Ok(None);
    };
    if let Err(e) = self.persist() {
      self.inner.save_page(&removed)?;
      return Err(e);
    }
    Ok(Some(removed))
  }

  /// Insert or replace a characteristic definition and persist.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be written.
  pub fn save_characteristic(
    &self,
    characteristic: Characteristic,
  ) -> Result<(), StoreError> {
    let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
    self.inner.save_characteristic(characteristic)?;
    self.persist()
  }

  /// Current contents of the store.
  ///
  /// # Errors
  ///
  /// Returns [`StoreError::Poisoned`] if a writer panicked.
  pub fn to_corpus(&self) -> Result<Corpus, StoreError> {
    self.inner.to_corpus()
  }

  fn persist(&self) -> Result<(), StoreError> {
    let corpus = self.inner.to_corpus()?;
    let bytes = serde_json::to_vec_pretty(&corpus)?;

    let mut tmp = self.path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)?;
    }
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, &self.path) {
      let _ = fs::remove_file(&tmp);
      return Err(e.into());
    }
    Ok(())
  }
}

impl DocumentStore for JsonStore {
  fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    self.inner.get_page(id)
  }

  fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
    self.inner.list_pages(filter)
  }

  fn save_page(&self, page: &Page) -> Result<(), StoreError> {
    let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
    let previous = self.inner.get_page(page.id)?;
    self.inner.save_page(page)?;
    if let Err(e) = self.persist() {
      match previous {
        Some(previous) => self.inner.save_page(&previous)?,
        None => {
          self.inner.delete_page(page.id)?;
        },
      }
      return Err(e);
    }
    Ok(())
  }

  fn list_characteristics(
    &self,
    filter: &CharacteristicFilter,
  ) -> Result<Vec<Characteristic>, StoreError> {
    self.inner.list_characteristics(filter)
  }

  fn list_characteristic_values(
    &self,
    characteristic: CharacteristicId,
  ) -> Result<Vec<PageCharacteristicValue>, StoreError> {
    self.inner.list_characteristic_values(characteristic)
  }

  fn save_characteristic_value(
    &self,
    value: &PageCharacteristicValue,
  ) -> Result<(), StoreError> {
    let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
    let previous = self.inner.get_characteristic_value(value.id)?;
    self.inner.save_characteristic_value(value)?;
    if let Err(e) = self.persist() {
      match previous {
        Some(previous) => self.inner.save_characteristic_value(&previous)?,
        None => self.inner.remove_characteristic_value(value.id)?,
      }
      return Err(e);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]
  use tempfile::tempdir;

  use super::*;
  use crate::model::{ConceptId, WorldId};

  fn page(id: u64, content: &str) -> Page {
    Page {
      id:               PageId(id),
      gameworld_id:     WorldId(1),
      concept_id:       ConceptId(1),
      name:             format!("Page {id}"),
      content:          Some(content.to_string()),
      allow_crosslinks: true,
      allow_crossworld: false,
      ignore_crosslink: false,
    }
  }

  #[test]
  fn missing_file_opens_empty() {
    let dir = tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path().join("none.json")).expect("open");
    assert!(store.to_corpus().expect("corpus").pages.is_empty());
  }

  #[test]
  fn saves_are_visible_after_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("corpus.json");

    let store = JsonStore::open(&path).expect("open");
    store.save_page(&page(1, "<p>one</p>")).expect("save");
    store.save_page(&page(2, "<p>two</p>")).expect("save");
    assert!(store.delete_page(PageId(2)).expect("delete").is_some());

    let reopened = JsonStore::open(&path).expect("reopen");
    assert_eq!(
      reopened.get_page(PageId(1)).expect("get"),
      Some(page(1, "<p>one</p>"))
    );
    assert!(reopened.get_page(PageId(2)).expect("get").is_none());
    assert!(!path.with_extension("json.tmp").exists());
  }

  #[test]
  fn failed_write_rolls_back() {
    let dir = tempdir().expect("tempdir");
    // A directory at the target path makes the final rename fail.
    let path = dir.path().join("corpus.json");
    fs::create_dir(&path).expect("mkdir");
    fs::write(path.join("keep"), "x").expect("block");

    let store = JsonStore {
      path:   path.clone(),
      inner:  MemoryStore::new(),
      writer: Mutex::new(()),
    };
    assert!(store.save_page(&page(1, "<p>one</p>")).is_err());
    assert!(store.get_page(PageId(1)).expect("get").is_none());
  }

  #[test]
  fn corrupt_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corpus.json");
    fs::write(&path, "{ not json").expect("write");
    assert!(matches!(JsonStore::open(&path), Err(StoreError::Serde(_))));
  }
}
