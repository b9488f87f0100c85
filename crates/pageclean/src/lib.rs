//! Pageclean - web page extraction with generative-AI cleanup
//!
//! This crate fetches a web page (optionally together with the pages linked
//! from its navigation), strips boilerplate from the extracted text and sends
//! the remainder through a generative-AI model that returns clean, readable
//! text.
//!
//! ## Pipeline
//!
//! Each page goes through the same steps:
//! 1. A [`PageSource`] loads the page and returns its raw main-content text
//! 2. [`strip_boilerplate`] normalizes the text and rejects near-empty pages
//! 3. A [`TextCleaner`] produces the final text
//!
//! Pages of one request run as concurrent tasks; one failing page never
//! affects the others.
//!
//! Built-in sources:
//! - [`HttpSource`] - direct HTTP fetch and HTML parsing
//! - [`BrowserSource`] - navigation through a WebDriver-controlled browser
//!
//! ## Example
//!
//! ```no_run
//! use pageclean::{ExplorationMode, ExtractRequest, Extractor};
//!
//! # async fn run() -> Result<(), pageclean::ExtractError> {
//! let extractor = Extractor::builder().build();
//! let request = ExtractRequest::new("example.com").mode(ExplorationMode::Linked);
//! let report = extractor.run(request).await?;
//! for page in &report.pages {
//!     println!("## {}\n{}", page.label, page.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod config;
mod error;
pub mod export;
mod html;
pub mod links;
mod pipeline;
pub mod sources;
mod strip;
mod types;

pub use cleanup::{GeminiCleaner, GenerationConfig, TextCleaner};
pub use config::Settings;
pub use error::ExtractError;
pub use export::{export_file_name, write_export};
pub use html::extract_main_content;
pub use links::{discover_links, NavLink};
pub use pipeline::{normalize_url, Extractor, ExtractorBuilder, Progress, NO_LINKED_PAGES_NOTICE};
pub use sources::{BrowserSource, HttpSource, PageSource, SourceKind};
pub use strip::{ensure_sufficient, strip_boilerplate, MIN_CONTENT_LENGTH};
pub use types::{
    ExplorationMode, ExtractReport, ExtractRequest, PageReport, PageTarget, DEFAULT_MAX_PAGES,
    HOME_LABEL, MAX_PAGES_LIMIT,
};

/// Default User-Agent string (a desktop browser, since many sites block bots)
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
