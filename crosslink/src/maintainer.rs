//! Consistency repairs after a page is deleted.
use crosslink_markup::{MarkupError, Tree, parse_optional, serialize, unwrap_link};
use log::trace;
use regex::Regex;

use crate::model::{
  Page,
  PageCharacteristicValue,
  PageId,
  PageRefError,
  PageRefList,
};

/// Pattern matching any canonical URL of `deleted`, whatever world or
/// concept it was filed under. The id is word-bounded so page 5 does not
/// match page 55.
///
/// # Errors
///
/// Never fails in practice; the pattern is built from a number.
pub fn retraction_pattern(deleted: PageId) -> Result<Regex, regex::Error> {
  Regex::new(&format!(r"/worlds/\d+/concept/\d+/page/{deleted}\b"))
}

/// Unwrap every anchor whose `href` matches `pattern`, keeping its text.
/// Returns the number of anchors removed.
///
/// Anchors are unwrapped last-to-first so a nested match is flattened before
/// its parent.
///
/// # Errors
///
/// Fails only on an inconsistent tree.
pub fn retract_links(
  tree: &mut Tree,
  pattern: &Regex,
) -> Result<usize, MarkupError> {
  let doomed: Vec<_> = tree
    .anchors()
    .into_iter()
    .filter(|&anchor| {
      tree
        .element(anchor)
        .and_then(|element| element.attr("href"))
        .is_some_and(|href| pattern.is_match(href))
    })
    .collect();

  for &anchor in doomed.iter().rev() {
    trace!("Unwrapping anchor {anchor}");
    unwrap_link(tree, anchor)?;
  }
  Ok(doomed.len())
}

/// Retract matching links from a page's content.
///
/// Returns the new content and the number of links removed, or `None` when
/// nothing matched.
///
/// # Errors
///
/// Fails only on an inconsistent tree.
pub fn retract_links_in_page(
  page: &Page,
  pattern: &Regex,
) -> Result<Option<(String, usize)>, MarkupError> {
  let mut tree = parse_optional(page.content.as_deref());
  let removed = retract_links(&mut tree, pattern)?;
  if removed == 0 {
    return Ok(None);
  }
  Ok(Some((serialize(&tree), removed)))
}

/// Drop `deleted` from a `page_ref` value.
///
/// Returns the updated row, or `None` when the list did not mention the page
/// and nothing needs to be written. Entries that are not page ids are left
/// in place.
///
/// # Errors
///
/// Fails when the stored value is not a list.
pub fn strip_reference(
  value: &PageCharacteristicValue,
  deleted: PageId,
) -> Result<Option<PageCharacteristicValue>, PageRefError> {
  Ok(
    PageRefList::strip_persisted(&value.value, deleted)?.map(|stripped| {
      PageCharacteristicValue {
        value: stripped,
        ..value.clone()
      }
    }),
  )
}
