//! The four trigger operations, wired to a [`DocumentStore`].
//!
//! Each operation loads what it needs, runs the pure scanner or maintainer
//! transforms in memory, and writes back only what changed, one
//! `save_*` call per record. Missing pages end an operation early with an
//! empty [`Report`]; persistence failures are returned to the caller.
use std::{fmt, ops::AddAssign};

use crosslink_config::LinksConfig;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
  dispatch::Operation,
  error::Result,
  maintainer,
  model::{Page, PageId},
  scanner::{CandidateIndex, Scanner},
  store::{CharacteristicFilter, DocumentStore, PageFilter},
};

/// What an operation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
  pub pages_scanned:  usize,
  pub pages_updated:  usize,
  pub links_added:    usize,
  pub links_removed:  usize,
  pub values_updated: usize,
}

impl Report {
  /// Whether anything was written.
  #[must_use]
  pub const fn is_noop(&self) -> bool {
    self.pages_updated == 0 && self.values_updated == 0
  }
}

impl AddAssign for Report {
  fn add_assign(&mut self, other: Self) {
    self.pages_scanned += other.pages_scanned;
    self.pages_updated += other.pages_updated;
    self.links_added += other.links_added;
    self.links_removed += other.links_removed;
    self.values_updated += other.values_updated;
  }
}

impl fmt::Display for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} pages scanned, {} updated, {} links added, {} links removed, {} \
       values updated",
      self.pages_scanned,
      self.pages_updated,
      self.links_added,
      self.links_removed,
      self.values_updated
    )
  }
}

/// Crosslinking engine over a document store.
#[derive(Debug)]
pub struct Crosslinker<S> {
  store:   S,
  scanner: Scanner,
}

impl<S: DocumentStore> Crosslinker<S> {
  pub fn new(store: S, links: &LinksConfig) -> Self {
    Self {
      store,
      scanner: Scanner::new(links),
    }
  }

  pub const fn store(&self) -> &S {
    &self.store
  }

  pub const fn scanner(&self) -> &Scanner {
    &self.scanner
  }

  /// Run `operation` against `page`.
  ///
  /// # Errors
  ///
  /// Propagates the operation's error.
  pub fn run(&self, operation: Operation, page: PageId) -> Result<Report> {
    match operation {
      Operation::CrosslinkPage => self.crosslink_page(page),
      Operation::CrosslinkBatchForNewPage => {
        self.crosslink_batch_for_new_page(page)
      },
      Operation::RetractLinksToDeletedPage => {
        self.retract_links_to_deleted_page(page)
      },
      Operation::CleanupReferencesToDeletedPage => {
        self.cleanup_references_to_deleted_page(page)
      },
    }
  }

  /// Insert links into one page's content.
  ///
  /// # Errors
  ///
  /// Returns an error if the store cannot be read or the page cannot be
  /// written back.
  pub fn crosslink_page(&self, id: PageId) -> Result<Report> {
    let Some(page) = self.store.get_page(id)? else {
      debug!("Page {id} no longer exists, nothing to link");
      return Ok(Report::default());
    };
    if !page.allow_crosslinks {
      debug!("Page {id} does not allow crosslinks");
      return Ok(Report::default());
    }

    let filter = PageFilter {
      world:        (!page.allow_crossworld).then_some(page.gameworld_id),
      exclude:      Some(page.id),
      targets_only: true,
    };
    let candidates = CandidateIndex::new(self.store.list_pages(&filter)?);
    debug!("Page {id} has {} candidate names", candidates.len());

    let outcome = self.scanner.scan_and_link(&page, &candidates)?;
    let mut report = Report {
      pages_scanned: 1,
      ..Report::default()
    };
    if let Some(content) = outcome.content {
      self.write_page(page, content)?;
      report.pages_updated = 1;
      report.links_added = outcome.linked.len();
    }
    Ok(report)
  }

  /// Rescan every page that may link to the newly created page `id`.
  ///
  /// # Errors
  ///
  /// Returns an error if the store cannot be read or a page cannot be
  /// written back. Pages written before the failure stay written.
  pub fn crosslink_batch_for_new_page(&self, id: PageId) -> Result<Report> {
    let Some(new_page) = self.store.get_page(id)? else {
      debug!("Page {id} no longer exists, nothing to link to");
      return Ok(Report::default());
    };

    let corpus = self.store.list_pages(&PageFilter::default())?;
    let rewritten = self.scanner.batch_link_new_page(&new_page, &corpus)?;

    let mut report = Report {
      pages_scanned: corpus.len().saturating_sub(1),
      ..Report::default()
    };
    for relinked in rewritten {
      report.links_added += relinked.linked.len();
      report.pages_updated += 1;
      self.store.save_page(&relinked.page)?;
      info!("Linked page {} to new page {id}", relinked.page.id);
    }
    Ok(report)
  }

  /// Unwrap every link to `id` across the corpus, keeping the link text.
  ///
  /// Works whether or not the page still exists.
  ///
  /// # Errors
  ///
  /// Returns an error if the store cannot be read or a page cannot be
  /// written back.
  pub fn retract_links_to_deleted_page(&self, id: PageId) -> Result<Report> {
    let pattern = maintainer::retraction_pattern(id)?;
    let pages = self.store.list_pages(&PageFilter {
      exclude: Some(id),
      ..PageFilter::default()
    })?;

    let mut report = Report {
      pages_scanned: pages.len(),
      ..Report::default()
    };
    for page in pages {
      let Some((content, removed)) =
        maintainer::retract_links_in_page(&page, &pattern)?
      else {
        continue;
      };
      let source = page.id;
      self.write_page(page, content)?;
      info!("Removed {removed} links to page {id} from page {source}");
      report.pages_updated += 1;
      report.links_removed += removed;
    }
    Ok(report)
  }

  /// Remove `id` from every `page_ref` value scoped to its concept.
  ///
  /// The page must still exist so its concept can be resolved; once it is
  /// gone this is a no-op.
  ///
  /// # Errors
  ///
  /// Returns an error if the store cannot be read or a value cannot be
  /// written back.
  pub fn cleanup_references_to_deleted_page(
    &self,
    id: PageId,
  ) -> Result<Report> {
    let Some(page) = self.store.get_page(id)? else {
      debug!("Page {id} no longer exists, references already cleaned");
      return Ok(Report::default());
    };

    let characteristics = self.store.list_characteristics(
      &CharacteristicFilter::page_refs_into(page.concept_id),
    )?;

    let mut report = Report::default();
    for characteristic in characteristics {
      for row in self.store.list_characteristic_values(characteristic.id)? {
        let updated = match maintainer::strip_reference(&row, id) {
          Ok(Some(updated)) => updated,
          Ok(None) => continue,
          Err(e) => {
            warn!(
              "Skipping value {} of characteristic '{}': {e}",
              row.id, characteristic.name
            );
            continue;
          },
        };
        self.store.save_characteristic_value(&updated)?;
        debug!(
          "Removed page {id} from value {} of characteristic '{}'",
          row.id, characteristic.name
        );
        report.values_updated += 1;
      }
    }
    if report.values_updated > 0 {
      info!("Removed page {id} from {} reference lists", report.values_updated);
    }
    Ok(report)
  }

  /// Rescan every page in the corpus.
  ///
  /// Scanning runs in parallel on the current rayon pool against one
  /// snapshot of the corpus; changed pages are then written back one at a
  /// time.
  ///
  /// # Errors
  ///
  /// Returns an error if the store cannot be read or a page cannot be
  /// written back.
  pub fn relink_all(&self) -> Result<Report> {
    let corpus = self.store.list_pages(&PageFilter::default())?;
    let candidates = CandidateIndex::new(corpus.iter().cloned());
    info!(
      "Relinking {} pages against {} candidate names",
      corpus.len(),
      candidates.len()
    );

    let outcomes = corpus
      .par_iter()
      .map(|page| {
        self
          .scanner
          .scan_and_link(page, &candidates)
          .map(|outcome| (page, outcome))
      })
      .collect::<Result<Vec<_>>>()?;

    let mut report = Report {
      pages_scanned: corpus.len(),
      ..Report::default()
    };
    for (page, outcome) in outcomes {
      let Some(content) = outcome.content else {
        continue;
      };
      report.pages_updated += 1;
      report.links_added += outcome.linked.len();
      self.write_page(page.clone(), content)?;
    }
    Ok(report)
  }

  fn write_page(&self, page: Page, content: String) -> Result<()> {
    let id = page.id;
    self.store.save_page(&Page {
      content: Some(content),
      ..page
    })?;
    debug!("Saved page {id}");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]
  use super::*;

  #[test]
  fn reports_accumulate() {
    let mut total = Report {
      pages_scanned: 2,
      links_added: 1,
      ..Report::default()
    };
    total += Report {
      pages_scanned: 3,
      pages_updated: 1,
      values_updated: 2,
      ..Report::default()
    };
    assert_eq!(total.pages_scanned, 5);
    assert_eq!(total.pages_updated, 1);
    assert_eq!(total.links_added, 1);
    assert_eq!(total.values_updated, 2);
    assert!(!total.is_noop());
    assert!(Report::default().is_noop());
  }

  #[test]
  fn report_display() {
    let report = Report {
      pages_scanned: 4,
      pages_updated: 1,
      links_added: 2,
      ..Report::default()
    };
    assert_eq!(
      report.to_string(),
      "4 pages scanned, 1 updated, 2 links added, 0 links removed, 0 values \
       updated"
    );
  }
}
