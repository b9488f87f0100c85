//! Extraction pipeline: target planning, concurrent page tasks, report

use crate::cleanup::{GeminiCleaner, TextCleaner};
use crate::config::Settings;
use crate::error::ExtractError;
use crate::links::{label_from_url, same_page};
use crate::sources::{BrowserSource, HttpSource, PageSource, SourceKind};
use crate::strip::{ensure_sufficient, strip_boilerplate, MIN_CONTENT_LENGTH};
use crate::types::{
    ExplorationMode, ExtractReport, ExtractRequest, PageReport, PageTarget, HOME_LABEL,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Notice recorded when exploration finds nothing beyond the requested page
pub const NO_LINKED_PAGES_NOTICE: &str =
    "No linked pages found on the website. Processing only the main page.";

/// Progress update during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase ("validate", "discover", "process", "complete")
    pub phase: String,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Estimated completion percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f32>,
}

impl Progress {
    /// Create a new update for `phase`
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: None,
            percent_complete: None,
        }
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set completion percentage
    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Normalize a user-supplied URL
///
/// Trims whitespace and assumes `https://` when no http(s) scheme is given.
pub fn normalize_url(raw: &str) -> Result<String, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::MissingUrl);
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ExtractError::InvalidUrl(format!("{}: missing host", trimmed)));
    }
    Ok(parsed.to_string())
}

/// Builder for configuring an [`Extractor`]
#[derive(Default)]
pub struct ExtractorBuilder {
    user_agent: Option<String>,
    source: SourceKind,
    custom_source: Option<Arc<dyn PageSource>>,
    webdriver_url: Option<String>,
    cleaner: Option<Arc<dyn TextCleaner>>,
    min_content_length: Option<usize>,
}

impl ExtractorBuilder {
    /// Create a builder with the direct source and the Gemini cleaner
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from environment settings
    pub fn from_settings(settings: &Settings) -> Self {
        let mut builder = Self::new()
            .cleaner(Arc::new(settings.cleaner()))
            .webdriver_url(&settings.webdriver_url)
            .min_content_length(settings.min_content_length);
        if let Some(ua) = &settings.user_agent {
            builder = builder.user_agent(ua);
        }
        builder
    }

    /// Set custom User-Agent for direct fetches
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Select a built-in page source
    pub fn source(mut self, kind: SourceKind) -> Self {
        self.source = kind;
        self
    }

    /// Use a custom page source (overrides [`Self::source`])
    pub fn with_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.custom_source = Some(source);
        self
    }

    /// WebDriver endpoint for the browser source
    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = Some(url.into());
        self
    }

    /// Use a custom text cleaner
    pub fn cleaner(mut self, cleaner: Arc<dyn TextCleaner>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Minimum stripped content length in characters
    pub fn min_content_length(mut self, min: usize) -> Self {
        self.min_content_length = Some(min);
        self
    }

    /// Build the extractor
    pub fn build(self) -> Extractor {
        let http = match self.user_agent {
            Some(ua) => HttpSource::new().with_user_agent(ua),
            None => HttpSource::new(),
        };

        let source: Arc<dyn PageSource> = match (self.custom_source, self.source) {
            (Some(custom), _) => custom,
            (None, SourceKind::Direct) => Arc::new(http.clone()),
            (None, SourceKind::Browser) => {
                let browser = BrowserSource::new();
                Arc::new(match self.webdriver_url {
                    Some(url) => browser.with_webdriver_url(url),
                    None => browser,
                })
            }
        };

        Extractor {
            http: Arc::new(http),
            source,
            cleaner: self
                .cleaner
                .unwrap_or_else(|| Arc::new(GeminiCleaner::new())),
            min_content_length: self.min_content_length.unwrap_or(MIN_CONTENT_LENGTH),
        }
    }
}

/// Configured extraction pipeline
///
/// Cheap to clone; clones share the source and cleaner.
#[derive(Clone)]
pub struct Extractor {
    /// Used for link discovery whatever the page source
    http: Arc<HttpSource>,
    source: Arc<dyn PageSource>,
    cleaner: Arc<dyn TextCleaner>,
    min_content_length: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        ExtractorBuilder::new().build()
    }
}

impl Extractor {
    /// Create a new extractor builder
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Name of the page source in use
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Minimum stripped content length in characters
    pub fn min_content_length(&self) -> usize {
        self.min_content_length
    }

    /// Run a request to completion
    pub async fn run(&self, req: ExtractRequest) -> Result<ExtractReport, ExtractError> {
        self.run_with_progress(req, |_| {}).await
    }

    /// Run a request, reporting progress through `progress`
    ///
    /// Only URL validation fails the whole run. Discovery and page failures
    /// are recorded in the report.
    pub async fn run_with_progress<F>(
        &self,
        req: ExtractRequest,
        mut progress: F,
    ) -> Result<ExtractReport, ExtractError>
    where
        F: FnMut(Progress),
    {
        progress(Progress::new("validate").with_percent(0.0));
        let url = normalize_url(&req.url)?;
        let max_pages = req.effective_max_pages();

        if req.mode != ExplorationMode::Single {
            progress(
                Progress::new("discover")
                    .with_message(format!("Discovering pages on {}", url))
                    .with_percent(10.0),
            );
        }
        let (targets, notices) = self.plan_targets(&url, req.mode, max_pages).await;

        let total = targets.len();
        progress(
            Progress::new("process")
                .with_message(format!("Processing {} page(s)", total))
                .with_percent(20.0),
        );

        let mut pages = Vec::with_capacity(total);
        for (index, (target, handle)) in self.spawn_pages(targets).into_iter().enumerate() {
            let report = join_page(target, handle).await;
            progress(
                Progress::new("process")
                    .with_message(format!("Finished {}", report.label))
                    .with_percent(20.0 + 80.0 * (index + 1) as f32 / total as f32),
            );
            pages.push(report);
        }

        let rate_limited = pages
            .iter()
            .any(|page| page.error().is_some_and(ExtractError::is_rate_limited));
        if rate_limited {
            warn!(url = url.as_str(), "Cleanup rate limit reached during run");
        }

        let succeeded = pages.iter().filter(|page| page.is_success()).count();
        info!(
            url = url.as_str(),
            mode = %req.mode,
            pages = pages.len(),
            succeeded,
            "Extraction finished"
        );
        progress(Progress::new("complete").with_percent(100.0));

        Ok(ExtractReport {
            url,
            mode: req.mode,
            pages,
            notices,
            rate_limited,
        })
    }

    /// Pages to process for `url`, the requested page first, plus notices
    pub async fn plan_targets(
        &self,
        url: &str,
        mode: ExplorationMode,
        max_pages: usize,
    ) -> (Vec<PageTarget>, Vec<String>) {
        let mut targets = vec![PageTarget::new(HOME_LABEL, url)];
        let mut notices = Vec::new();

        let extra: Vec<PageTarget> = match mode {
            ExplorationMode::Single => return (targets, notices),
            ExplorationMode::Linked => {
                // One extra slot in case the page links to itself
                match self.http.discover_links(url, max_pages + 1).await {
                    Ok(links) => links
                        .into_iter()
                        .filter(|link| !same_page(&link.url, url))
                        .take(max_pages)
                        .map(|link| {
                            let label = if link.label.is_empty() {
                                label_from_url(&link.url)
                            } else {
                                link.label
                            };
                            PageTarget::new(label, link.url)
                        })
                        .collect(),
                    Err(e) => {
                        warn!(url, error = %e, "Link discovery failed");
                        Vec::new()
                    }
                }
            }
            ExplorationMode::Menu => match self.source.menu_items(url).await {
                // The requested page is already the first target
                Ok(items) => items
                    .into_iter()
                    .filter(|item| !item.eq_ignore_ascii_case(HOME_LABEL))
                    .take(max_pages)
                    .map(|item| PageTarget::menu(url, item))
                    .collect(),
                Err(e) => {
                    warn!(url, error = %e, "Menu discovery failed");
                    Vec::new()
                }
            },
        };

        if extra.is_empty() {
            notices.push(NO_LINKED_PAGES_NOTICE.to_string());
        }
        targets.extend(extra);
        assign_unique_labels(&mut targets);
        debug!(url, count = targets.len(), "Planned page targets");
        (targets, notices)
    }

    /// Process one page without spawning
    pub async fn process_page(&self, target: PageTarget) -> PageReport {
        process_page(
            Arc::clone(&self.source),
            Arc::clone(&self.cleaner),
            self.min_content_length,
            target,
        )
        .await
    }

    /// Process pages as concurrent tasks, returning reports in input order
    pub async fn process_batch(&self, targets: Vec<PageTarget>) -> Vec<PageReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for (target, handle) in self.spawn_pages(targets) {
            reports.push(join_page(target, handle).await);
        }
        reports
    }

    fn spawn_pages(&self, targets: Vec<PageTarget>) -> Vec<(PageTarget, JoinHandle<PageReport>)> {
        targets
            .into_iter()
            .map(|target| {
                let task = process_page(
                    Arc::clone(&self.source),
                    Arc::clone(&self.cleaner),
                    self.min_content_length,
                    target.clone(),
                );
                (target, tokio::spawn(task))
            })
            .collect()
    }
}

/// Await a page task; a panicked task becomes that page's error
async fn join_page(target: PageTarget, handle: JoinHandle<PageReport>) -> PageReport {
    match handle.await {
        Ok(report) => report,
        Err(e) => {
            error!(label = target.label.as_str(), error = %e, "Page task failed");
            PageReport::new(
                target,
                Err(ExtractError::Other(format!("page task failed: {}", e))),
            )
        }
    }
}

async fn process_page(
    source: Arc<dyn PageSource>,
    cleaner: Arc<dyn TextCleaner>,
    min_content_length: usize,
    target: PageTarget,
) -> PageReport {
    debug!(
        label = target.label.as_str(),
        url = target.url.as_str(),
        source = source.name(),
        "Processing page"
    );
    let outcome = clean_page(source.as_ref(), cleaner.as_ref(), min_content_length, &target).await;
    if let Err(e) = &outcome {
        warn!(
            label = target.label.as_str(),
            url = target.url.as_str(),
            error = %e,
            "Page failed"
        );
    }
    PageReport::new(target, outcome)
}

async fn clean_page(
    source: &dyn PageSource,
    cleaner: &dyn TextCleaner,
    min_content_length: usize,
    target: &PageTarget,
) -> Result<String, ExtractError> {
    let raw = source.extract(target).await?;
    let stripped = strip_boilerplate(&raw);
    ensure_sufficient(&stripped, min_content_length)?;
    cleaner.clean(&stripped).await
}

/// Suffix repeated labels with ` (2)`, ` (3)`, ...
fn assign_unique_labels(targets: &mut [PageTarget]) {
    let mut seen: HashSet<String> = HashSet::new();
    for target in targets.iter_mut() {
        if !seen.contains(&target.label) {
            seen.insert(target.label.clone());
            continue;
        }
        let mut n = 2;
        let label = loop {
            let candidate = format!("{} ({})", target.label, n);
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        seen.insert(label.clone());
        target.label = label;
    }
}
