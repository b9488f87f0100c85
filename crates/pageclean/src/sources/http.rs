//! Direct HTTP page source
//!
//! Fetches pages with a plain GET request and parses the HTML locally.
//! Also used for navigation link discovery regardless of the page source
//! chosen for extraction.

use crate::error::ExtractError;
use crate::html::extract_main_content;
use crate::links::{self, NavLink};
use crate::sources::PageSource;
use crate::types::PageTarget;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout (per read, including the first response byte)
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Body timeout (total)
const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// Response body, lossily decoded
    pub html: String,
}

/// Direct HTTP page source
///
/// - GET with a browser-like User-Agent
/// - Non-success status and binary content are fetch errors
/// - Main content picked by CSS selector priority
///
/// The HTTP client is built on first use and shared by clones, so pages of
/// one run reuse connections.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    user_agent: Option<String>,
    client: Arc<OnceLock<reqwest::Client>>,
}

impl HttpSource {
    /// Create a new direct source with the default User-Agent
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom User-Agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self.client = Arc::default();
        self
    }

    fn client(&self) -> Result<&reqwest::Client, ExtractError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let mut headers = HeaderMap::new();
        let user_agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html, text/plain, */*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| ExtractError::ClientBuild(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }

    /// GET a page and return its body
    ///
    /// A body that fails or stalls partway is a fetch error, never a
    /// truncated page.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ExtractError> {
        debug!(url, "Fetching page");
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(ExtractError::from_reqwest)?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(ExtractError::Fetch(format!(
                "HTTP status {} for url {}",
                status, final_url
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok());
        if let Some(ct) = content_type {
            if is_binary_content_type(ct) {
                return Err(ExtractError::Fetch(format!(
                    "Binary content ({}) is not supported",
                    ct
                )));
            }
        }

        let body = read_body_with_timeout(response, BODY_TIMEOUT).await?;

        Ok(FetchedPage {
            url: final_url,
            html: String::from_utf8_lossy(&body).to_string(),
        })
    }

    /// Fetch `url` and discover up to `max_links` same-host navigation links
    ///
    /// Links are resolved against the final URL after redirects.
    pub async fn discover_links(
        &self,
        url: &str,
        max_links: usize,
    ) -> Result<Vec<NavLink>, ExtractError> {
        let page = self.fetch_page(url).await?;
        let base = parse_url(&page.url)?;
        Ok(links::discover_links(&page.html, &base, max_links))
    }
}

#[async_trait]
impl PageSource for HttpSource {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn extract(&self, target: &PageTarget) -> Result<String, ExtractError> {
        let mut page = self.fetch_page(&target.url).await?;

        if let Some(item) = &target.menu_item {
            let base = parse_url(&page.url)?;
            let link = links::find_link_by_text(&page.html, &base, item).ok_or_else(|| {
                ExtractError::Fetch(format!(
                    "navigation menu item '{}' not found on {}",
                    item, page.url
                ))
            })?;
            debug!(item = item.as_str(), link = link.as_str(), "Following menu item");
            page = self.fetch_page(&link).await?;
        }

        Ok(extract_main_content(&page.html))
    }

    async fn menu_items(&self, url: &str) -> Result<Vec<String>, ExtractError> {
        let page = self.fetch_page(url).await?;
        let base = parse_url(&page.url)?;
        Ok(links::menu_labels(&page.html, &base))
    }
}

fn parse_url(url: &str) -> Result<Url, ExtractError> {
    Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read the response body under a total deadline
async fn read_body_with_timeout(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<Bytes, ExtractError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        warn!(received = body.len(), error = %e, "Body read failed");
                        return Err(ExtractError::from_reqwest(e));
                    }
                    None => {
                        return Ok(Bytes::from(body));
                    }
                }
            }
            _ = timeout_future => {
                warn!(received = body.len(), "Body timeout reached");
                return Err(ExtractError::Fetch(format!(
                    "body read timed out after {}s",
                    timeout.as_secs()
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary_content_type() {
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("Application/PDF"));
        assert!(is_binary_content_type("application/octet-stream"));
        assert!(is_binary_content_type("font/woff2"));

        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("text/plain"));
        assert!(!is_binary_content_type("application/xhtml+xml"));
    }

    #[test]
    fn test_client_shared_by_clones() {
        let source = HttpSource::new();
        let clone = source.clone();
        assert!(std::ptr::eq(
            source.client().unwrap(),
            clone.client().unwrap()
        ));

        // A new User-Agent needs its own client
        let custom = clone.with_user_agent("custom-agent/1.0");
        assert!(!std::ptr::eq(
            source.client().unwrap(),
            custom.client().unwrap()
        ));
    }

    #[test]
    fn test_parse_url_error() {
        let err = parse_url("not a url").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidUrl(_)));
    }
}
