//! Candidate selection and link insertion for a single page.
//!
//! Everything here is a pure transform over pages already loaded from the
//! store. The engine decides what to load and what to write back.
use crosslink_config::LinksConfig;
use crosslink_markup::{
  LinkSpec,
  MatchOptions,
  NamePattern,
  Tree,
  find_first_unlinked_occurrence,
  parse_optional,
  serialize,
  wrap_with_link,
};
use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::{
  error::Result,
  model::{Page, PageId},
};

/// Whether `candidate` may be linked from `source`'s content.
///
/// This is the single eligibility rule shared by every scanning path.
#[must_use]
pub fn is_candidate(source: &Page, candidate: &Page) -> bool {
  candidate.id != source.id
    && !candidate.ignore_crosslink
    && (source.allow_crossworld
      || candidate.gameworld_id == source.gameworld_id)
}

/// Normalized lookup key for a page name.
fn name_key(name: &str) -> String {
  name.trim().to_lowercase()
}

struct NameEntry {
  pattern: NamePattern,
  pages:   Vec<Page>,
}

/// Link targets grouped by case-insensitive name.
///
/// Names keep the order in which they were first seen, and pages under one
/// name keep insertion order. For a given source page the first eligible
/// page under each name wins, so feeding pages in a stable order (the
/// stores list by id) gives stable results.
#[derive(Default)]
pub struct CandidateIndex {
  names: IndexMap<String, NameEntry>,
}

impl CandidateIndex {
  /// Index `pages`. Pages flagged `ignore_crosslink` and pages with a blank
  /// name are left out.
  #[must_use]
  pub fn new(pages: impl IntoIterator<Item = Page>) -> Self {
    let mut names: IndexMap<String, NameEntry> = IndexMap::new();
    for page in pages {
      if page.ignore_crosslink {
        continue;
      }
      let key = name_key(&page.name);
      if let Some(entry) = names.get_mut(&key) {
        entry.pages.push(page);
        continue;
      }
      match NamePattern::new(&page.name) {
        Ok(pattern) => {
          names.insert(key, NameEntry {
            pattern,
            pages: vec![page],
          });
        },
        Err(e) => warn!("Page {} cannot be a link target: {e}", page.id),
      }
    }
    Self { names }
  }

  /// Number of distinct names.
  #[must_use]
  pub fn len(&self) -> usize {
    self.names.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// The `(key, pattern, target)` triples eligible for `source`, one per
  /// name, in index order.
  fn targets_for<'a>(
    &'a self,
    source: &'a Page,
  ) -> impl Iterator<Item = (&'a str, &'a NamePattern, &'a Page)> {
    self.names.iter().filter_map(move |(key, entry)| {
      entry
        .pages
        .iter()
        .find(|candidate| is_candidate(source, candidate))
        .map(|target| (key.as_str(), &entry.pattern, target))
    })
  }
}

/// Result of scanning one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
  /// New content, present only when at least one link was inserted.
  pub content: Option<String>,
  /// Targets linked during this scan, in insertion order.
  pub linked:  Vec<PageId>,
}

impl ScanOutcome {
  #[must_use]
  pub const fn changed(&self) -> bool {
    self.content.is_some()
  }
}

/// A page rewritten by a batch scan, with its new content already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relinked {
  pub page:   Page,
  pub linked: Vec<PageId>,
}

/// Inserts links into page content.
#[derive(Debug, Clone)]
pub struct Scanner {
  options:       MatchOptions,
  class:         String,
  include_title: bool,
}

impl Default for Scanner {
  fn default() -> Self {
    Self::new(&LinksConfig::default())
  }
}

impl Scanner {
  #[must_use]
  pub fn new(links: &LinksConfig) -> Self {
    Self {
      options:       MatchOptions {
        skip_tags: links.skip_tags.clone(),
      },
      class:         links.class.clone(),
      include_title: links.include_title,
    }
  }

  fn link_for(&self, target: &Page, href: String) -> LinkSpec {
    LinkSpec {
      href,
      class: Some(self.class.clone()),
      title: self.include_title.then(|| target.name.clone()),
    }
  }

  /// Link the first unlinked occurrence of every eligible candidate name in
  /// `page`'s content.
  ///
  /// A name is skipped when the content already has an anchor pointing at
  /// the target's canonical URL, or an anchor whose text is the name. That
  /// check runs against the tree as edited so far, so links added earlier in
  /// the same pass count.
  ///
  /// # Errors
  ///
  /// Only fails if a fresh match cannot be applied to the tree it came from.
  pub fn scan_and_link(
    &self,
    page: &Page,
    candidates: &CandidateIndex,
  ) -> Result<ScanOutcome> {
    if !page.allow_crosslinks {
      debug!("Page {} does not allow crosslinks, skipping", page.id);
      return Ok(ScanOutcome::default());
    }

    let mut tree = parse_optional(page.content.as_deref());
    if tree.is_empty() {
      return Ok(ScanOutcome::default());
    }

    let mut linked = Vec::new();
    for (key, pattern, target) in candidates.targets_for(page) {
      let href = target.canonical_url();
      if already_linked(&tree, &href, key) {
        trace!("Page {} already links '{key}'", page.id);
        continue;
      }

      let Some(found) =
        find_first_unlinked_occurrence(&tree, pattern, &self.options)
      else {
        continue;
      };

      wrap_with_link(&mut tree, &found, &self.link_for(target, href))?;
      debug!("Linked '{}' in page {} to page {}", key, page.id, target.id);
      linked.push(target.id);
    }

    if linked.is_empty() {
      return Ok(ScanOutcome::default());
    }

    Ok(ScanOutcome {
      content: Some(serialize(&tree)),
      linked,
    })
  }

  /// Rescan every page that could now link to `new_page`.
  ///
  /// `corpus` must hold every page, in the store's listing order, and may
  /// include `new_page` itself. Only pages whose content changed are
  /// returned.
  ///
  /// # Errors
  ///
  /// Propagates [`Scanner::scan_and_link`] failures.
  pub fn batch_link_new_page(
    &self,
    new_page: &Page,
    corpus: &[Page],
  ) -> Result<Vec<Relinked>> {
    if new_page.ignore_crosslink {
      debug!("Page {} is not a link target, nothing to do", new_page.id);
      return Ok(Vec::new());
    }

    let index = CandidateIndex::new(corpus.iter().cloned());
    let mut rewritten = Vec::new();

    for page in corpus {
      if !page.allow_crosslinks || !is_candidate(page, new_page) {
        continue;
      }
      let outcome = self.scan_and_link(page, &index)?;
      if let Some(content) = outcome.content {
        rewritten.push(Relinked {
          page:   Page {
            content: Some(content),
            ..page.clone()
          },
          linked: outcome.linked,
        });
      }
    }
    Ok(rewritten)
  }
}

fn already_linked(tree: &Tree, href: &str, key: &str) -> bool {
  tree.anchors().into_iter().any(|anchor| {
    tree
      .element(anchor)
      .and_then(|element| element.attr("href"))
      .is_some_and(|existing| existing == href)
      || name_key(&tree.text_contents(anchor)) == key
  })
}
