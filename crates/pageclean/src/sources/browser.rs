//! Browser-automation page source
//!
//! Delegates navigation and extraction to a WebDriver server (ChromeDriver,
//! geckodriver, Selenium). Each extraction opens its own session, so page
//! tasks never share browser state.

use crate::error::ExtractError;
use crate::links::{same_host, same_page, unique_labels};
use crate::sources::PageSource;
use crate::types::PageTarget;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default WebDriver endpoint
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Content containers, tried in priority order
pub const BROWSER_CONTENT_SELECTORS: &[&str] = &[
    "body > main",
    "body > article",
    "body > div.content",
    "body",
];

/// How long to let a page load and settle after navigation
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Browser-automation page source
#[derive(Debug, Clone)]
pub struct BrowserSource {
    webdriver_url: String,
    settle_delay: Duration,
    headless: bool,
}

impl Default for BrowserSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserSource {
    /// Create a source talking to [`DEFAULT_WEBDRIVER_URL`]
    pub fn new() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            headless: true,
        }
    }

    /// Set the WebDriver endpoint
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    /// Set the post-navigation settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Run the browser with a visible window
    pub fn headful(mut self) -> Self {
        self.headless = false;
        self
    }

    /// The configured WebDriver endpoint
    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        if self.headless {
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
            );
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }
        caps
    }

    async fn connect(&self) -> Result<Client, ExtractError> {
        ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                ExtractError::Browser(format!(
                    "failed to start a WebDriver session at {}: {}",
                    self.webdriver_url, e
                ))
            })
    }

    /// Run `task` in a fresh session and always close the session afterwards
    async fn with_session<T, F, Fut>(&self, task: F) -> Result<T, ExtractError>
    where
        F: FnOnce(Client) -> Fut,
        Fut: std::future::Future<Output = Result<T, ExtractError>>,
    {
        let client = self.connect().await?;
        let result = task(client.clone()).await;
        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close WebDriver session");
        }
        result
    }

    async fn navigate(&self, client: &Client, url: &str) -> Result<(), ExtractError> {
        client
            .goto(url)
            .await
            .map_err(|e| ExtractError::Browser(format!("failed to open {}: {}", url, e)))?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn extract(&self, target: &PageTarget) -> Result<String, ExtractError> {
        self.with_session(|client| async move {
            self.navigate(&client, &target.url).await?;

            if let Some(item) = &target.menu_item {
                let link = client.find(Locator::LinkText(item)).await.map_err(|e| {
                    ExtractError::Browser(format!("menu item '{}' not found: {}", item, e))
                })?;
                link.click().await.map_err(|e| {
                    ExtractError::Browser(format!("failed to click '{}': {}", item, e))
                })?;
                tokio::time::sleep(self.settle_delay).await;
            }

            for selector in BROWSER_CONTENT_SELECTORS {
                match client.find(Locator::Css(selector)).await {
                    Ok(element) => {
                        debug!(selector, url = target.url.as_str(), "Matched content container");
                        return element
                            .text()
                            .await
                            .map_err(|e| ExtractError::Browser(e.to_string()));
                    }
                    Err(e) => debug!(selector, error = %e, "Content container not present"),
                }
            }

            Err(ExtractError::Browser(format!(
                "no content container found on {}",
                target.url
            )))
        })
        .await
    }

    async fn menu_items(&self, url: &str) -> Result<Vec<String>, ExtractError> {
        self.with_session(|client| async move {
            self.navigate(&client, url).await?;

            let anchors = client
                .find_all(Locator::Css("nav a"))
                .await
                .map_err(|e| ExtractError::Browser(e.to_string()))?;

            let base = Url::parse(url).map_err(|e| ExtractError::InvalidUrl(e.to_string()))?;
            let mut texts = Vec::with_capacity(anchors.len());
            for anchor in anchors {
                // The `href` property is already absolute
                let href = match anchor.prop("href").await {
                    Ok(Some(href)) => href,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable menu item");
                        continue;
                    }
                };
                if !is_menu_target(&base, &href) {
                    continue;
                }
                match anchor.text().await {
                    Ok(text) => texts.push(text),
                    Err(e) => debug!(error = %e, "Skipping unreadable menu item"),
                }
            }
            Ok(unique_labels(texts))
        })
        .await
    }
}

/// Same-host menu link that is not the page itself
fn is_menu_target(base: &Url, href: &str) -> bool {
    Url::parse(href)
        .is_ok_and(|target| same_host(base, &target) && !same_page(href, base.as_str()))
}
