//! Page ingestion for farmlore.
//!
//! Observed pages arrive as `(url, content)`. A [`Pipeline`] routes each page
//! to the first handler whose [`UrlPattern`] matches its URL; handlers use the
//! [`extract`] functions to turn page text into records and merge them into
//! the store. Pages matching no pattern are ignored.

#![warn(missing_docs)]

pub mod error;
pub mod extract;
pub mod pattern;
pub mod pipeline;

pub use error::{IngestError, Result};
pub use pattern::UrlPattern;
pub use pipeline::{Dispatch, FnHandler, Page, PageHandler, Pipeline};
