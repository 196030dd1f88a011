//! Calls to the remote application.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use url::Url;

use crate::error::RemoteError;

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
	/// Absolute URL the page was fetched from.
	pub url: String,
	/// Response body.
	pub content: String,
}

/// Operations the hub performs against the remote application.
#[async_trait]
pub trait RemoteOps: Send + Sync {
	/// Clears the active perk set (`worker.php?go=resetperks`).
	async fn reset_perks(&self) -> Result<(), RemoteError>;

	/// Activates perk set `id` (`worker.php?go=activateperkset&id=`).
	async fn activate_perkset(&self, id: &str) -> Result<(), RemoteError>;

	/// Fetches `path`, relative to the application origin.
	async fn fetch_page(&self, path: &str) -> Result<FetchedPage, RemoteError>;
}

/// Replaces an existing `Origin` with `origin` and sets `Referer` to
/// `{origin}/index.php`, inserting `Referer` if absent.
///
/// A request without `Origin` keeps going without one. Other headers are left alone.
pub fn rewrite_origin_headers(headers: &mut HeaderMap, origin: &str) -> Result<(), RemoteError> {
	let origin = origin.trim_end_matches('/');
	let value = |v: String| HeaderValue::from_str(&v).map_err(|e| RemoteError::InvalidRequest(format!("header {v:?}: {e}")));
	if headers.contains_key(ORIGIN) {
		headers.insert(ORIGIN, value(origin.to_string())?);
	}
	headers.insert(REFERER, value(format!("{origin}/index.php"))?);
	Ok(())
}

/// [`RemoteOps`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
	client: reqwest::Client,
	base: Url,
	origin: String,
}

impl HttpRemote {
	/// Client for the application at `base_url`.
	pub fn new(base_url: &str) -> Result<Self, RemoteError> {
		let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
			.map_err(|e| RemoteError::InvalidRequest(format!("base url {base_url:?}: {e}")))?;
		let origin = base.origin().ascii_serialization();
		Ok(Self {
			client: reqwest::Client::new(),
			base,
			origin,
		})
	}

	fn url(&self, path: &str) -> Result<Url, RemoteError> {
		self.base
			.join(path.trim_start_matches('/'))
			.map_err(|e| RemoteError::InvalidRequest(format!("path {path:?}: {e}")))
	}

	async fn send(&self, method: reqwest::Method, url: Url) -> Result<reqwest::Response, RemoteError> {
		// The hub's own requests carry the application origin.
		let mut headers = HeaderMap::new();
		headers.insert(ORIGIN, HeaderValue::from_static("null"));
		rewrite_origin_headers(&mut headers, &self.origin)?;
		tracing::debug!(%method, %url, "remote request");
		let response = self
			.client
			.request(method, url.clone())
			.headers(headers)
			.send()
			.await
			.map_err(|source| RemoteError::Transport {
				url: url.to_string(),
				source,
			})?;
		let status = response.status();
		if !status.is_success() {
			return Err(RemoteError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}
		Ok(response)
	}

	async fn post_worker(&self, query: &str) -> Result<(), RemoteError> {
		let url = self.url(&format!("worker.php?{query}"))?;
		self.send(reqwest::Method::POST, url).await.map(drop)
	}
}

#[async_trait]
impl RemoteOps for HttpRemote {
	async fn reset_perks(&self) -> Result<(), RemoteError> {
		self.post_worker("go=resetperks").await
	}

	async fn activate_perkset(&self, id: &str) -> Result<(), RemoteError> {
		let id: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
		self.post_worker(&format!("go=activateperkset&id={id}")).await
	}

	async fn fetch_page(&self, path: &str) -> Result<FetchedPage, RemoteError> {
		let url = self.url(path)?;
		let response = self.send(reqwest::Method::GET, url.clone()).await?;
		let content = response.text().await.map_err(|source| RemoteError::Transport {
			url: url.to_string(),
			source,
		})?;
		Ok(FetchedPage {
			url: url.to_string(),
			content,
		})
	}
}

#[cfg(test)]
mod tests {
	use reqwest::header::{ACCEPT, HeaderValue};

	use super::*;

	#[test]
	fn origin_and_referer_are_set() {
		let mut headers = HeaderMap::new();
		headers.insert(ORIGIN, HeaderValue::from_static("moz-extension://abc"));
		headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
		rewrite_origin_headers(&mut headers, "https://farmrpg.com/").unwrap();

		assert_eq!(headers[ORIGIN], "https://farmrpg.com");
		assert_eq!(headers[REFERER], "https://farmrpg.com/index.php");
		assert_eq!(headers[ACCEPT], "text/html");
		assert_eq!(headers.get_all(REFERER).iter().count(), 1);
	}

	#[test]
	fn missing_origin_stays_missing() {
		let mut headers = HeaderMap::new();
		rewrite_origin_headers(&mut headers, "https://farmrpg.com").unwrap();
		assert!(!headers.contains_key(ORIGIN));
		assert_eq!(headers[REFERER], "https://farmrpg.com/index.php");
	}

	#[test]
	fn existing_referer_is_replaced() {
		let mut headers = HeaderMap::new();
		headers.insert(REFERER, HeaderValue::from_static("https://elsewhere.test/"));
		rewrite_origin_headers(&mut headers, "https://farmrpg.com").unwrap();
		assert_eq!(headers[REFERER], "https://farmrpg.com/index.php");
	}

	#[test]
	fn urls_resolve_against_base() {
		let remote = HttpRemote::new("http://localhost:9000/game").unwrap();
		assert_eq!(
			remote.url("/worker.php?go=resetperks").unwrap().as_str(),
			"http://localhost:9000/game/worker.php?go=resetperks"
		);
		assert_eq!(remote.origin, "http://localhost:9000");
	}
}
