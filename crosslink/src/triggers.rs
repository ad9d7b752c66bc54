//! Lifecycle hooks for the application that owns the pages.
use crate::{
  dispatch::{Dispatcher, Operation},
  error::Result,
  model::PageId,
};

/// A page was created: link its own content, then let existing pages link
/// to it.
///
/// # Errors
///
/// Propagates dispatch errors.
pub fn on_page_created(dispatcher: &dyn Dispatcher, page: PageId) -> Result<()> {
  dispatcher.dispatch(Operation::CrosslinkPage, page)?;
  dispatcher.dispatch(Operation::CrosslinkBatchForNewPage, page)
}

/// A page's content changed.
///
/// # Errors
///
/// Propagates dispatch errors.
pub fn on_page_edited(dispatcher: &dyn Dispatcher, page: PageId) -> Result<()> {
  dispatcher.dispatch(Operation::CrosslinkPage, page)
}

/// A page is about to be deleted.
///
/// Reference cleanup needs the page to resolve its concept, so it is
/// dispatched first, and the page should only be removed from the store once
/// the dispatcher is flushed. Link retraction works from the id alone.
///
/// # Errors
///
/// Propagates dispatch errors.
pub fn on_page_deleted(dispatcher: &dyn Dispatcher, page: PageId) -> Result<()> {
  dispatcher.dispatch(Operation::CleanupReferencesToDeletedPage, page)?;
  dispatcher.dispatch(Operation::RetractLinksToDeletedPage, page)
}
