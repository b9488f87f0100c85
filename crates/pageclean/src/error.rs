//! Error types for pageclean

use thiserror::Error;

/// Errors that can occur while extracting or cleaning a page
///
/// The `Display` form of each variant is the message shown to the user in
/// place of the page content.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// Network or HTTP failure while fetching the page
    #[error("Error fetching the webpage: {0}")]
    Fetch(String),

    /// Stripped text is shorter than the minimum content length
    #[error("Error: Insufficient content extracted")]
    InsufficientContent {
        /// Length of the stripped text in characters
        length: usize,
    },

    /// Generative-AI endpoint reported quota exhaustion
    #[error("CLEANING ERROR: API rate limit - please try again later.")]
    RateLimited(String),

    /// Any other cleanup failure
    #[error("CLEANING ERROR: {0}")]
    Cleanup(String),

    /// The model answered that it got no real page content
    #[error("CONTENT EXTRACTION ERROR: Failed to retrieve meaningful page content")]
    NoMeaningfulContent,

    /// Browser automation failure
    #[error("Error during agent-based extraction: {0}")]
    Browser(String),

    /// Unexpected failure
    #[error("Error: {0}")]
    Other(String),
}

impl ExtractError {
    /// Create an error from a reqwest error raised while fetching a page
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractError::Fetch(format!("request timed out: {}", err))
        } else if err.is_connect() {
            ExtractError::Fetch(format!("failed to connect: {}", err))
        } else {
            ExtractError::Fetch(err.to_string())
        }
    }

    /// True for the rate-limit case of the cleanup call
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ExtractError::RateLimited(_))
    }

    /// True for errors produced by the cleanup step
    ///
    /// These messages are already tagged and are shown verbatim.
    pub fn is_cleanup(&self) -> bool {
        matches!(
            self,
            ExtractError::RateLimited(_)
                | ExtractError::Cleanup(_)
                | ExtractError::NoMeaningfulContent
        )
    }

    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::MissingUrl | ExtractError::InvalidUrl(_) => "invalid_request",
            ExtractError::ClientBuild(_) | ExtractError::Fetch(_) => "fetch",
            ExtractError::InsufficientContent { .. } => "insufficient_content",
            ExtractError::RateLimited(_) => "rate_limited",
            ExtractError::Cleanup(_) | ExtractError::NoMeaningfulContent => "cleanup",
            ExtractError::Browser(_) => "browser",
            ExtractError::Other(_) => "other",
        }
    }
}
