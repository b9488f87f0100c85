//! Environment-driven settings

use crate::cleanup::{GeminiCleaner, API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::sources::{BrowserSource, DEFAULT_WEBDRIVER_URL};
use crate::strip::MIN_CONTENT_LENGTH;
use tracing::warn;

/// Model name variable
pub const MODEL_ENV: &str = "GEMINI_MODEL";
/// API base URL variable
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";
/// WebDriver endpoint variable
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";
/// User-Agent override variable
pub const USER_AGENT_ENV: &str = "PAGECLEAN_USER_AGENT";
/// Minimum stripped content length variable
pub const MIN_CONTENT_LENGTH_ENV: &str = "PAGECLEAN_MIN_CONTENT_LENGTH";

/// Runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Generative-AI API key; read at call time when unset
    pub api_key: Option<String>,
    /// Generative-AI model
    pub model: String,
    /// Generative-AI API base URL
    pub api_base_url: String,
    /// WebDriver endpoint for the browser source
    pub webdriver_url: String,
    /// User-Agent override for direct fetches
    pub user_agent: Option<String>,
    /// Minimum stripped content length in characters
    pub min_content_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            user_agent: None,
            min_content_length: MIN_CONTENT_LENGTH,
        }
    }
}

impl Settings {
    /// Load `.env` from the working directory, then read the environment
    pub fn load() -> Self {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_env()
    }

    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let min_content_length = match get(MIN_CONTENT_LENGTH_ENV) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(
                    value = raw.as_str(),
                    "Ignoring invalid {}", MIN_CONTENT_LENGTH_ENV
                );
                defaults.min_content_length
            }),
            None => defaults.min_content_length,
        };

        Self {
            api_key: get(API_KEY_ENV),
            model: get(MODEL_ENV).unwrap_or(defaults.model),
            api_base_url: get(BASE_URL_ENV).unwrap_or(defaults.api_base_url),
            webdriver_url: get(WEBDRIVER_URL_ENV).unwrap_or(defaults.webdriver_url),
            user_agent: get(USER_AGENT_ENV),
            min_content_length,
        }
    }

    /// Cleaner configured from these settings
    pub fn cleaner(&self) -> GeminiCleaner {
        let cleaner = GeminiCleaner::new()
            .with_model(&self.model)
            .with_base_url(&self.api_base_url);
        match &self.api_key {
            Some(key) => cleaner.with_api_key(key),
            None => cleaner,
        }
    }

    /// Browser source configured from these settings
    pub fn browser(&self) -> BrowserSource {
        BrowserSource::new().with_webdriver_url(&self.webdriver_url)
    }
}
