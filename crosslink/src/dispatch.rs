//! Dispatching trigger operations.
//!
//! Call sites receive a [`Dispatcher`] chosen once at startup and never
//! reach for a global queue. All operations are idempotent, so running
//! them late, twice, or not at all never corrupts the corpus.
use std::{
  fmt,
  sync::{Arc, Condvar, Mutex, PoisonError},
  thread,
  time::Duration,
};

use crosslink_config::{DispatchConfig, DispatchMode};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
  engine::Crosslinker,
  error::{CrosslinkError, Result},
  model::PageId,
  store::DocumentStore,
};

/// Base delay between queued retries; attempt `n` waits `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// The operations a trigger can request.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  CrosslinkPage,
  CrosslinkBatchForNewPage,
  RetractLinksToDeletedPage,
  CleanupReferencesToDeletedPage,
}

impl Operation {
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::CrosslinkPage => "crosslink_page",
      Self::CrosslinkBatchForNewPage => "crosslink_batch_for_new_page",
      Self::RetractLinksToDeletedPage => "retract_links_to_deleted_page",
      Self::CleanupReferencesToDeletedPage => {
        "cleanup_references_to_deleted_page"
      },
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Runs, queues or drops trigger operations.
pub trait Dispatcher: Send + Sync {
  /// Request `operation` for `page`.
  ///
  /// # Errors
  ///
  /// Inline dispatch returns the operation's own error. Queued dispatch
  /// only fails if the job could not be queued.
  fn dispatch(&self, operation: Operation, page: PageId) -> Result<()>;

  /// Block until previously dispatched work has finished.
  ///
  /// # Errors
  ///
  /// Fails if any queued job gave up after exhausting its retries.
  fn flush(&self) -> Result<()> {
    Ok(())
  }

  fn mode(&self) -> DispatchMode;
}

/// Runs each operation immediately on the calling thread.
#[derive(Debug)]
pub struct InlineDispatcher<S> {
  engine: Arc<Crosslinker<S>>,
}

impl<S> InlineDispatcher<S> {
  pub const fn new(engine: Arc<Crosslinker<S>>) -> Self {
    Self { engine }
  }
}

impl<S: DocumentStore> Dispatcher for InlineDispatcher<S> {
  fn dispatch(&self, operation: Operation, page: PageId) -> Result<()> {
    let report = self.engine.run(operation, page)?;
    info!("{operation} for page {page}: {report}");
    Ok(())
  }

  fn mode(&self) -> DispatchMode {
    DispatchMode::Inline
  }
}

/// Drops every operation. The corpus catches up on the next relink.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDispatcher;

impl Dispatcher for DisabledDispatcher {
  fn dispatch(&self, operation: Operation, page: PageId) -> Result<()> {
    info!("Dispatch disabled, skipping {operation} for page {page}");
    Ok(())
  }

  fn mode(&self) -> DispatchMode {
    DispatchMode::Disabled
  }
}

#[derive(Debug, Default)]
struct QueueState {
  pending: usize,
  failed:  usize,
}

#[derive(Debug, Default)]
struct Tracker {
  state: Mutex<QueueState>,
  idle:  Condvar,
}

impl Tracker {
  fn started(&self) {
    self
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .pending += 1;
  }

  fn finished(&self, ok: bool) {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    state.pending = state.pending.saturating_sub(1);
    if !ok {
      state.failed += 1;
    }
    if state.pending == 0 {
      self.idle.notify_all();
    }
  }

  /// Wait for the queue to drain; returns and resets the failure count.
  fn wait_idle(&self) -> usize {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    while state.pending > 0 {
      state = self
        .idle
        .wait(state)
        .unwrap_or_else(PoisonError::into_inner);
    }
    std::mem::take(&mut state.failed)
  }
}

/// Runs operations on a background thread pool with retries.
///
/// With a single worker (the default) operations run one at a time in
/// dispatch order, which keeps edits to any one page serialized.
pub struct QueuedDispatcher<S> {
  engine:      Arc<Crosslinker<S>>,
  pool:        rayon::ThreadPool,
  max_retries: u32,
  tracker:     Arc<Tracker>,
}

impl<S: DocumentStore + 'static> QueuedDispatcher<S> {
  /// Start a pool of `workers` threads.
  ///
  /// # Errors
  ///
  /// Fails if the thread pool cannot be created.
  pub fn new(
    engine: Arc<Crosslinker<S>>,
    workers: usize,
    max_retries: u32,
  ) -> Result<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(workers.max(1))
      .thread_name(|i| format!("crosslink-worker-{i}"))
      .build()
      .map_err(|e| {
        CrosslinkError::Dispatch(format!("failed to start workers: {e}"))
      })?;

    debug!("Started {} crosslink workers", pool.current_num_threads());
    Ok(Self {
      engine,
      pool,
      max_retries,
      tracker: Arc::new(Tracker::default()),
    })
  }

  /// Block until every dispatched job has finished. Returns how many gave
  /// up since the last call.
  pub fn wait_idle(&self) -> usize {
    self.tracker.wait_idle()
  }
}

fn run_with_retries<S: DocumentStore>(
  engine: &Crosslinker<S>,
  operation: Operation,
  page: PageId,
  max_retries: u32,
) -> bool {
  let mut attempt = 0;
  loop {
    match engine.run(operation, page) {
      Ok(report) => {
        info!("{operation} for page {page}: {report}");
        return true;
      },
      Err(e) if e.is_retryable() && attempt < max_retries => {
        attempt += 1;
        warn!(
          "{operation} for page {page} failed (attempt {attempt} of {}): {e}",
          max_retries + 1
        );
        thread::sleep(RETRY_BACKOFF * attempt);
      },
      Err(e) => {
        error!("{operation} for page {page} failed, giving up: {e}");
        return false;
      },
    }
  }
}

impl<S: DocumentStore + 'static> Dispatcher for QueuedDispatcher<S> {
  fn dispatch(&self, operation: Operation, page: PageId) -> Result<()> {
    let engine = Arc::clone(&self.engine);
    let tracker = Arc::clone(&self.tracker);
    let max_retries = self.max_retries;

    tracker.started();
    debug!("Queued {operation} for page {page}");
    self.pool.spawn(move || {
      let ok = run_with_retries(&engine, operation, page, max_retries);
      tracker.finished(ok);
    });
    Ok(())
  }

  fn flush(&self) -> Result<()> {
    match self.wait_idle() {
      0 => Ok(()),
      failed => {
        Err(CrosslinkError::Dispatch(format!(
          "{failed} queued operations failed"
        )))
      },
    }
  }

  fn mode(&self) -> DispatchMode {
    DispatchMode::Queued
  }
}

/// Build the dispatcher selected by `config`.
///
/// # Errors
///
/// Fails if queued mode cannot start its workers.
pub fn dispatcher_from_config<S: DocumentStore + 'static>(
  config: &DispatchConfig,
  engine: Arc<Crosslinker<S>>,
) -> Result<Box<dyn Dispatcher>> {
  let dispatcher: Box<dyn Dispatcher> = match config.mode {
    DispatchMode::Inline => Box::new(InlineDispatcher::new(engine)),
    DispatchMode::Queued => {
      Box::new(QueuedDispatcher::new(
        engine,
        config.workers,
        config.max_retries,
      )?)
    },
    DispatchMode::Disabled => Box::new(DisabledDispatcher),
  };
  debug!("Using {} dispatcher", dispatcher.mode());
  Ok(dispatcher)
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]
  use serde_json::json;

  use super::*;

  #[test]
  fn operations_use_snake_case_names() {
    assert_eq!(
      serde_json::to_value(Operation::CrosslinkBatchForNewPage).expect("ser"),
      json!("crosslink_batch_for_new_page")
    );
    let op: Operation =
      serde_json::from_value(json!("cleanup_references_to_deleted_page"))
        .expect("de");
    assert_eq!(op, Operation::CleanupReferencesToDeletedPage);
    assert_eq!(op.to_string(), "cleanup_references_to_deleted_page");
  }

  #[test]
  fn tracker_counts_failures_once() {
    let tracker = Tracker::default();
    tracker.started();
    tracker.started();
    tracker.finished(true);
    tracker.finished(false);
    assert_eq!(tracker.wait_idle(), 1);
    assert_eq!(tracker.wait_idle(), 0);
  }
}
