//! Page sources: where raw page text comes from
//!
//! Design: each source turns a [`PageTarget`] into raw, unstripped text.
//! The pipeline applies stripping and cleanup on top, so a source never
//! needs to know about the generative-AI step.

mod browser;
mod http;

pub use browser::{BrowserSource, BROWSER_CONTENT_SELECTORS, DEFAULT_WEBDRIVER_URL};
pub use http::{FetchedPage, HttpSource};

use crate::error::ExtractError;
use crate::types::PageTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Trait for page text sources
///
/// Implementations must be safe to share between concurrently running page
/// tasks.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Unique identifier for this source (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Load the target page and return its raw main-content text
    ///
    /// When `target.menu_item` is set, the page reached by following that
    /// menu item from `target.url` is extracted instead.
    async fn extract(&self, target: &PageTarget) -> Result<String, ExtractError>;

    /// Texts of the navigation menu items on `url`, deduplicated
    async fn menu_items(&self, url: &str) -> Result<Vec<String>, ExtractError>;
}

/// Which built-in source to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Direct HTTP fetch and HTML parsing
    #[default]
    Direct,
    /// WebDriver-driven browser
    Browser,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" | "http" => Ok(SourceKind::Direct),
            "browser" | "agent" => Ok(SourceKind::Browser),
            _ => Err("Invalid source: must be direct or browser".to_string()),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Direct => write!(f, "direct"),
            SourceKind::Browser => write!(f, "browser"),
        }
    }
}
