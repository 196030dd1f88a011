//! URL-routed dispatch of observed pages to handlers.

use async_trait::async_trait;

use crate::error::Result;
use crate::pattern::UrlPattern;

/// A page as observed by a view or fetched by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
	/// Full page URL.
	pub url: &'a str,
	/// Page body.
	pub content: &'a str,
}

impl<'a> Page<'a> {
	/// Page at `url` with body `content`.
	pub fn new(url: &'a str, content: &'a str) -> Self {
		Self { url, content }
	}
}

/// Processes pages matching one registered pattern.
///
/// `C` is the context handed to every handler, typically the hub's.
#[async_trait]
pub trait PageHandler<C: ?Sized + Sync>: Send + Sync {
	/// Handles one page. Returns whether any state changed.
	async fn handle(&self, ctx: &C, page: Page<'_>) -> Result<bool>;
}

/// Adapter turning a synchronous closure into a [`PageHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<C, F> PageHandler<C> for FnHandler<F>
where
	C: ?Sized + Sync,
	F: Fn(&C, Page<'_>) -> Result<bool> + Send + Sync,
{
	async fn handle(&self, ctx: &C, page: Page<'_>) -> Result<bool> {
		(self.0)(ctx, page)
	}
}

/// Outcome of [`Pipeline::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	/// No registered pattern matched the URL.
	Unmatched,
	/// A handler ran to completion.
	Handled {
		/// Pattern that matched.
		filter: usize,
		/// Whether the handler changed any state.
		changed: bool,
	},
}

type AfterIngest<C> = Box<dyn Fn(&C, Page<'_>, bool) + Send + Sync>;

struct Filter<C: ?Sized + Sync> {
	pattern: UrlPattern,
	handler: Box<dyn PageHandler<C>>,
}

/// Ordered table of `(pattern, handler)` filters.
///
/// The first filter whose pattern matches handles the page; later
/// overlapping filters never see it.
pub struct Pipeline<C: ?Sized + Sync> {
	filters: Vec<Filter<C>>,
	after_ingest: Option<AfterIngest<C>>,
}

impl<C: ?Sized + Sync> Default for Pipeline<C> {
	fn default() -> Self {
		Self {
			filters: Vec::new(),
			after_ingest: None,
		}
	}
}

impl<C: ?Sized + Sync> std::fmt::Debug for Pipeline<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipeline")
			.field("filters", &self.filters.iter().map(|flt| flt.pattern.as_str()).collect::<Vec<_>>())
			.field("after_ingest", &self.after_ingest.is_some())
			.finish()
	}
}

impl<C: ?Sized + Sync> Pipeline<C> {
	/// Empty pipeline.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a filter. Returns its index.
	pub fn register_filter(&mut self, pattern: &str, handler: impl PageHandler<C> + 'static) -> Result<usize> {
		let pattern = UrlPattern::new(pattern)?;
		tracing::debug!(%pattern, index = self.filters.len(), "registered page filter");
		self.filters.push(Filter {
			pattern,
			handler: Box::new(handler),
		});
		Ok(self.filters.len() - 1)
	}

	/// Appends a filter backed by a synchronous closure.
	pub fn register_fn<F>(&mut self, pattern: &str, f: F) -> Result<usize>
	where
		F: Fn(&C, Page<'_>) -> Result<bool> + Send + Sync + 'static,
	{
		self.register_filter(pattern, FnHandler(f))
	}

	/// Sets the callback run once after every successfully handled page.
	pub fn on_after_ingest(&mut self, f: impl Fn(&C, Page<'_>, bool) + Send + Sync + 'static) {
		self.after_ingest = Some(Box::new(f));
	}

	/// Number of registered filters.
	pub fn len(&self) -> usize {
		self.filters.len()
	}

	/// Returns true if no filters are registered.
	pub fn is_empty(&self) -> bool {
		self.filters.is_empty()
	}

	/// Routes `page` to the first matching filter.
	///
	/// # Errors
	///
	/// Returns the handler's error unchanged; the after-ingest callback does
	/// not run in that case.
	pub async fn dispatch(&self, ctx: &C, page: Page<'_>) -> Result<Dispatch> {
		let Some((index, filter)) = self.filters.iter().enumerate().find(|(_, f)| f.pattern.matches(page.url)) else {
			tracing::trace!(url = page.url, "no page filter matched");
			return Ok(Dispatch::Unmatched);
		};

		let changed = filter.handler.handle(ctx, page).await.inspect_err(|error| {
			tracing::warn!(url = page.url, pattern = %filter.pattern, %error, "page handler failed");
		})?;
		tracing::debug!(url = page.url, pattern = %filter.pattern, changed, "page ingested");

		if let Some(after) = &self.after_ingest {
			after(ctx, page, changed);
		}
		Ok(Dispatch::Handled { filter: index, changed })
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::error::IngestError;

	#[derive(Default)]
	struct Counters {
		first: AtomicUsize,
		second: AtomicUsize,
	}

	fn pipeline() -> (Pipeline<Counters>, std::sync::Arc<AtomicUsize>) {
		let after = std::sync::Arc::new(AtomicUsize::new(0));
		let mut p = Pipeline::new();
		p.register_fn("https://farmrpg.com/item.php?*", |c: &Counters, _| {
			c.first.fetch_add(1, Ordering::SeqCst);
			Ok(true)
		})
		.unwrap();
		p.register_fn("https://farmrpg.com/*", |c: &Counters, page| {
			c.second.fetch_add(1, Ordering::SeqCst);
			if page.content == "boom" {
				return Err(IngestError::extract(page.url, "boom"));
			}
			Ok(false)
		})
		.unwrap();
		let seen = std::sync::Arc::clone(&after);
		p.on_after_ingest(move |_, _, _| {
			seen.fetch_add(1, Ordering::SeqCst);
		});
		(p, after)
	}

	#[tokio::test(flavor = "current_thread")]
	async fn first_matching_filter_wins() {
		let (p, after) = pipeline();
		let ctx = Counters::default();
		let out = p.dispatch(&ctx, Page::new("https://farmrpg.com/item.php?id=1", "")).await.unwrap();
		assert_eq!(out, Dispatch::Handled { filter: 0, changed: true });
		assert_eq!(ctx.first.load(Ordering::SeqCst), 1);
		assert_eq!(ctx.second.load(Ordering::SeqCst), 0);
		assert_eq!(after.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn unmatched_url_is_a_no_op() {
		let (p, after) = pipeline();
		let ctx = Counters::default();
		let out = p.dispatch(&ctx, Page::new("https://example.com/", "")).await.unwrap();
		assert_eq!(out, Dispatch::Unmatched);
		assert_eq!(after.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn handler_error_skips_callback() {
		let (p, after) = pipeline();
		let ctx = Counters::default();
		let err = p
			.dispatch(&ctx, Page::new("https://farmrpg.com/index.php", "boom"))
			.await
			.unwrap_err();
		assert!(matches!(err, IngestError::Extract { .. }));
		assert_eq!(ctx.second.load(Ordering::SeqCst), 1);
		assert_eq!(after.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn len_tracks_registrations() {
		let mut p: Pipeline<Counters> = Pipeline::new();
		assert!(p.is_empty());
		p.register_fn("https://farmrpg.com/*", |_, _| Ok(false)).unwrap();
		assert_eq!(p.len(), 1);
	}
}
