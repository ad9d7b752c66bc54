#![allow(clippy::expect_used, reason = "Fine in tests")]
use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use crosslink::{
  Crosslinker,
  DocumentStore,
  MemoryStore,
  Operation,
  Page,
  PageId,
  dispatch::{
    DisabledDispatcher,
    Dispatcher,
    InlineDispatcher,
    QueuedDispatcher,
    dispatcher_from_config,
  },
  model::{
    Characteristic,
    CharacteristicId,
    ConceptId,
    PageCharacteristicValue,
    WorldId,
  },
  store::{CharacteristicFilter, PageFilter, StoreError},
  triggers,
};
use crosslink_config::{DispatchConfig, DispatchMode, LinksConfig};

/// Memory store whose first `failures` page writes fail.
struct FlakyStore {
  inner:    MemoryStore,
  failures: AtomicUsize,
  attempts: AtomicUsize,
}

impl FlakyStore {
  fn new(pages: &[Page], failures: usize) -> Self {
    let inner = MemoryStore::new();
    for page in pages {
      inner.save_page(page).expect("seed");
    }
    Self {
      inner,
      failures: AtomicUsize::new(failures),
      attempts: AtomicUsize::new(0),
    }
  }
}

impl DocumentStore for FlakyStore {
  fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
    self.inner.get_page(id)
  }

  fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, StoreError> {
    self.inner.list_pages(filter)
  }

  fn save_page(&self, page: &Page) -> Result<(), StoreError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    let failed = self
      .failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if failed {
      return Err(StoreError::Unavailable("flaky".to_string()));
    }
    self.inner.save_page(page)
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
    self.inner.save_characteristic_value(value)
  }
}

fn page(id: u64, name: &str, content: &str) -> Page {
  Page {
    id:               PageId(id),
    gameworld_id:     WorldId(1),
    concept_id:       ConceptId(1),
    name:             name.to_string(),
    content:          Some(content.to_string()),
    allow_crosslinks: true,
    allow_crossworld: false,
    ignore_crosslink: false,
  }
}

fn corpus() -> Vec<Page> {
  vec![
    page(1, "Town", "<p>The Castle looms.</p>"),
    page(2, "Castle", "<p>Above the Town.</p>"),
  ]
}

fn engine(failures: usize) -> Arc<Crosslinker<Arc<FlakyStore>>> {
  let store = Arc::new(FlakyStore::new(&corpus(), failures));
  Arc::new(Crosslinker::new(store, &LinksConfig::default()))
}

fn linked(engine: &Crosslinker<Arc<FlakyStore>>, id: u64) -> bool {
  engine
    .store()
    .get_page(PageId(id))
    .expect("get")
    .expect("page")
    .content_str()
    .contains("wiki-link")
}

#[test]
fn inline_runs_immediately_and_reports_failures() {
  let engine = engine(0);
  let dispatcher = InlineDispatcher::new(Arc::clone(&engine));
  dispatcher
    .dispatch(Operation::CrosslinkPage, PageId(1))
    .expect("dispatch");
  assert!(linked(&engine, 1));

  let failing = self::engine(1);
  let dispatcher = InlineDispatcher::new(Arc::clone(&failing));
  assert!(
    dispatcher
      .dispatch(Operation::CrosslinkPage, PageId(1))
      .is_err()
  );
  assert!(!linked(&failing, 1));
}

#[test]
fn queued_retries_persistence_failures() {
  let engine = engine(2);
  let dispatcher =
    QueuedDispatcher::new(Arc::clone(&engine), 1, 3).expect("pool");
  dispatcher
    .dispatch(Operation::CrosslinkPage, PageId(1))
    .expect("dispatch");
  assert_eq!(dispatcher.wait_idle(), 0);

  assert!(linked(&engine, 1));
  assert_eq!(engine.store().attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn queued_gives_up_after_max_retries() {
  let engine = engine(10);
  let dispatcher =
    QueuedDispatcher::new(Arc::clone(&engine), 1, 1).expect("pool");
  dispatcher
    .dispatch(Operation::CrosslinkPage, PageId(1))
    .expect("dispatch");

  assert!(dispatcher.flush().is_err());
  assert!(!linked(&engine, 1));
  assert_eq!(engine.store().attempts.load(Ordering::SeqCst), 2);
  // Failures are reported once.
  assert!(dispatcher.flush().is_ok());
}

#[test]
fn disabled_skips_everything() {
  let engine = engine(0);
  triggers::on_page_created(&DisabledDispatcher, PageId(1)).expect("skip");
  assert!(!linked(&engine, 1));
  assert!(!linked(&engine, 2));
}

#[test]
fn config_selects_the_dispatcher() {
  for mode in [
    DispatchMode::Inline,
    DispatchMode::Queued,
    DispatchMode::Disabled,
  ] {
    let config = DispatchConfig {
      mode,
      ..DispatchConfig::default()
    };
    let dispatcher =
      dispatcher_from_config(&config, engine(0)).expect("dispatcher");
    assert_eq!(dispatcher.mode(), mode);
  }
}

#[test]
fn created_trigger_links_both_directions() {
  let engine = engine(0);
  let config = DispatchConfig {
    mode: DispatchMode::Queued,
    ..DispatchConfig::default()
  };
  let dispatcher =
    dispatcher_from_config(&config, Arc::clone(&engine)).expect("dispatcher");

  triggers::on_page_created(dispatcher.as_ref(), PageId(2)).expect("trigger");
  dispatcher.flush().expect("flush");

  assert!(linked(&engine, 2));
  assert!(linked(&engine, 1));
}
