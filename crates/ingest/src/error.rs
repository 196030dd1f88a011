//! Ingestion error types.

use farmlore_store::StoreError;
use thiserror::Error;

/// Errors raised while routing or extracting a page.
#[derive(Debug, Error)]
pub enum IngestError {
	/// A URL pattern could not be compiled.
	#[error("invalid url pattern {pattern:?}: {source}")]
	Pattern {
		/// The pattern as registered.
		pattern: String,
		/// Compiler error.
		#[source]
		source: globset::Error,
	},

	/// A page matched a filter but did not have the expected shape.
	#[error("cannot extract from {url}: {reason}")]
	Extract {
		/// Page URL.
		url: String,
		/// What was missing or malformed.
		reason: String,
	},

	/// A field value could not be parsed.
	#[error("cannot parse {what} from {input:?}")]
	Parse {
		/// Kind of value expected.
		what: &'static str,
		/// Offending text.
		input: String,
	},

	/// Merging the extracted records failed.
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl IngestError {
	/// Extraction failure for `url`.
	pub fn extract(url: &str, reason: impl Into<String>) -> Self {
		Self::Extract {
			url: url.to_string(),
			reason: reason.into(),
		}
	}
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;
