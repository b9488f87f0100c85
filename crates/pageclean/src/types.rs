//! Core types for pageclean

use crate::error::ExtractError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

/// Default number of extra pages explored per request
pub const DEFAULT_MAX_PAGES: usize = 3;

/// Upper bound on extra pages explored per request
pub const MAX_PAGES_LIMIT: usize = 10;

/// Label of the page the user asked for
pub const HOME_LABEL: &str = "Home";

/// How far to look beyond the requested page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorationMode {
    /// Only the requested page
    #[default]
    Single,
    /// The requested page plus same-site navigation links
    Linked,
    /// The requested page plus pages reached by navigation menu item text
    Menu,
}

impl FromStr for ExplorationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(ExplorationMode::Single),
            "linked" => Ok(ExplorationMode::Linked),
            "menu" => Ok(ExplorationMode::Menu),
            _ => Err("Invalid mode: must be single, linked or menu".to_string()),
        }
    }
}

impl std::fmt::Display for ExplorationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExplorationMode::Single => write!(f, "single"),
            ExplorationMode::Linked => write!(f, "linked"),
            ExplorationMode::Menu => write!(f, "menu"),
        }
    }
}

/// One extraction request, as submitted from the UI or CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// URL to extract (scheme optional, `https://` is assumed)
    pub url: String,

    /// Exploration mode (default single page)
    #[serde(default)]
    pub mode: ExplorationMode,

    /// Maximum number of extra pages to explore (default 3, clamped to 1..=10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,
}

impl ExtractRequest {
    /// Create a single-page request for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the exploration mode
    pub fn mode(mut self, mode: ExplorationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the page cap
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Page cap after defaulting and clamping
    pub fn effective_max_pages(&self) -> usize {
        self.max_pages
            .unwrap_or(DEFAULT_MAX_PAGES)
            .clamp(1, MAX_PAGES_LIMIT)
    }
}

/// A page scheduled for processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    /// Label shown in the page selector
    pub label: String,
    /// URL to load
    pub url: String,
    /// Navigation menu item to follow after loading `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item: Option<String>,
}

impl PageTarget {
    /// Target a URL directly
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            menu_item: None,
        }
    }

    /// Target the page reached by following `item` from `url`
    pub fn menu(url: impl Into<String>, item: impl Into<String>) -> Self {
        let item = item.into();
        Self {
            label: item.clone(),
            url: url.into(),
            menu_item: Some(item),
        }
    }
}

/// Result of one page pipeline
#[derive(Debug, Clone)]
pub struct PageReport {
    /// Unique label within the report
    pub label: String,
    /// URL the page was loaded from
    pub url: String,
    /// Menu item followed, if any
    pub menu_item: Option<String>,
    /// Cleaned text, or the failure
    pub outcome: Result<String, ExtractError>,
}

impl PageReport {
    /// Build a report for `target`
    pub fn new(target: PageTarget, outcome: Result<String, ExtractError>) -> Self {
        Self {
            label: target.label,
            url: target.url,
            menu_item: target.menu_item,
            outcome,
        }
    }

    /// True when the page produced cleaned content
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&ExtractError> {
        self.outcome.as_ref().err()
    }

    /// Text to display or export for this page
    ///
    /// Cleanup errors are already tagged and are returned as-is; other
    /// failures are prefixed with the page URL.
    pub fn text(&self) -> String {
        match &self.outcome {
            Ok(content) => content.clone(),
            Err(e) if e.is_cleanup() => e.to_string(),
            Err(e) => format!("Error extracting content from {}: {}", self.url, e),
        }
    }
}

impl Serialize for PageReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PageReport", 5)?;
        state.serialize_field("label", &self.label)?;
        state.serialize_field("url", &self.url)?;
        match &self.menu_item {
            Some(item) => state.serialize_field("menu_item", item)?,
            None => state.skip_field("menu_item")?,
        }
        let status = match &self.outcome {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        state.serialize_field("status", status)?;
        state.serialize_field("content", &self.text())?;
        state.end()
    }
}

/// Result of one extraction request
#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    /// Normalized URL that was requested
    pub url: String,
    /// Exploration mode used
    pub mode: ExplorationMode,
    /// Pages in discovery order, the requested page first
    pub pages: Vec<PageReport>,
    /// Informational messages for the user
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    /// True when any page hit the generative-AI rate limit
    pub rate_limited: bool,
}

impl ExtractReport {
    /// Look up a page by label
    pub fn page(&self, label: &str) -> Option<&PageReport> {
        self.pages.iter().find(|page| page.label == label)
    }

    /// Page labels in order
    pub fn labels(&self) -> Vec<&str> {
        self.pages.iter().map(|page| page.label.as_str()).collect()
    }
}
