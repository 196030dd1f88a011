//! Glob-style URL patterns.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{IngestError, Result};

/// A URL pattern where `*` matches any run of characters, `/` included.
///
/// Every other character is literal, so `item.php?*` matches a literal `?`.
/// Matching is case-sensitive and covers the whole URL.
#[derive(Debug, Clone)]
pub struct UrlPattern {
	raw: String,
	matcher: GlobMatcher,
}

impl UrlPattern {
	/// Compiles `pattern`.
	pub fn new(pattern: &str) -> Result<Self> {
		let glob = pattern.split('*').map(escape_literal).collect::<Vec<_>>().join("*");
		let matcher = GlobBuilder::new(&glob)
			.literal_separator(false)
			.case_insensitive(false)
			.backslash_escape(false)
			.build()
			.map_err(|source| IngestError::Pattern {
				pattern: pattern.to_string(),
				source,
			})?
			.compile_matcher();
		Ok(Self {
			raw: pattern.to_string(),
			matcher,
		})
	}

	/// Returns true if `url` matches in full.
	pub fn matches(&self, url: &str) -> bool {
		self.matcher.is_match(url)
	}

	/// The pattern as written.
	pub fn as_str(&self) -> &str {
		&self.raw
	}
}

impl std::fmt::Display for UrlPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.raw)
	}
}

/// Wraps every glob metacharacter in a one-character class.
fn escape_literal(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '?' | '[' | ']' | '{' | '}') {
			out.push('[');
			out.push(c);
			out.push(']');
		} else {
			out.push(c);
		}
	}
	out
}
