//! Automatic crosslinking for world-building page corpora.
//!
//! Page content is scanned for the names of other pages and the first
//! mention of each is wrapped in a link to that page's canonical URL. When a
//! page is deleted, links pointing at it are unwrapped and its id is removed
//! from structured `page_ref` values.
//!
//! [`engine::Crosslinker`] exposes the trigger operations over any
//! [`store::DocumentStore`]; [`dispatch`] decides whether they run inline,
//! on a worker pool, or not at all.
pub mod cli;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod maintainer;
pub mod model;
pub mod scanner;
pub mod store;
pub mod triggers;

pub use crate::{
  dispatch::{Dispatcher, Operation},
  engine::{Crosslinker, Report},
  error::{CrosslinkError, Result},
  model::{Page, PageId},
  store::{DocumentStore, JsonStore, MemoryStore},
};
