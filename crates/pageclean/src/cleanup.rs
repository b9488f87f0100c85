//! Remote cleanup through a generative-AI endpoint
//!
//! The stripped page text is sent to the Gemini `generateContent` API with a
//! fixed cleaning instruction. The response text is returned verbatim.

use crate::error::ExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Cleaning instruction; `{text}` is replaced with the page text
pub const CLEANING_PROMPT: &str = "CLEANING TASK: Clean and format the following web content while:
1. Removing navigation elements, headers, footers, and ads
2. Preserving all meaningful content
3. Maintaining proper paragraph structure
4. Keeping important headings and subheadings
5. Ensuring readability

CONTENT TO CLEAN:
{text}

CLEANED OUTPUT:";

/// Phrase the model uses when it was handed no real page content
const NO_CONTENT_MARKER: &str = "provide the actual scraped content";

/// Whole-request timeout for the completion call
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the prompt for `text`
pub fn build_prompt(text: &str) -> String {
    CLEANING_PROMPT.replace("{text}", text)
}

/// Trait for the text cleanup step
#[async_trait]
pub trait TextCleaner: Send + Sync {
    /// Unique identifier for this cleaner (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Return the cleaned text, or a cleanup error
    async fn clean(&self, text: &str) -> Result<String, ExtractError>;
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling mass
    pub top_p: f32,
    /// Top-k sampling
    pub top_k: u32,
    /// Output length bound in tokens
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            top_k: 32,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Error envelope returned by the API on non-success status
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini `generateContent` cleaner
///
/// Clones share one HTTP client.
#[derive(Debug, Clone)]
pub struct GeminiCleaner {
    api_key: Option<String>,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    client: Arc<OnceLock<reqwest::Client>>,
}

impl Default for GeminiCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiCleaner {
    /// Create a cleaner that reads [`API_KEY_ENV`] when it is called
    pub fn new() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
            client: Arc::default(),
        }
    }

    /// Use an explicit API key instead of the environment
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling parameters
    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Model name in use
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn client(&self) -> Result<&reqwest::Client, ExtractError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::Client::builder()
            .timeout(CLEANUP_TIMEOUT)
            .build()
            .map_err(|e| ExtractError::Cleanup(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }

    fn resolve_api_key(&self) -> Result<String, ExtractError> {
        let usable = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(usable)
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(usable))
            .ok_or_else(|| ExtractError::Cleanup(format!("{} is not set", API_KEY_ENV)))
    }
}

#[async_trait]
impl TextCleaner for GeminiCleaner {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn clean(&self, text: &str) -> Result<String, ExtractError> {
        let api_key = self.resolve_api_key()?;
        let client = self.client()?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(text)),
                }],
            }],
            generation_config: &self.generation,
        };

        debug!(model = self.model.as_str(), chars = text.len(), "Sending cleanup request");
        let response = client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::Cleanup(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ExtractError::Cleanup(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_api_error(status.as_u16(), &raw));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| ExtractError::Cleanup(format!("unexpected response: {}", e)))?;

        let cleaned = response_text(&parsed);
        if cleaned.trim().is_empty() {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .or_else(|| parsed.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ExtractError::Cleanup(format!(
                "empty response from model ({})",
                reason
            )));
        }

        if cleaned.to_lowercase().contains(NO_CONTENT_MARKER) {
            return Err(ExtractError::NoMeaningfulContent);
        }

        Ok(cleaned)
    }
}

/// Concatenated text parts of the first candidate
fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Map a non-success API response to a cleanup error
fn classify_api_error(status: u16, body: &str) -> ExtractError {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let detail = match &envelope {
        Some(env) => format!("{} {}: {}", env.error.code, env.error.status, env.error.message),
        None => format!("HTTP {}: {}", status, body.trim()),
    };

    let exhausted = envelope
        .as_ref()
        .map(|env| env.error.status == "RESOURCE_EXHAUSTED")
        .unwrap_or(false);

    if status == 429 || exhausted {
        warn!(%detail, "Generative-AI rate limit reached");
        ExtractError::RateLimited(detail)
    } else {
        ExtractError::Cleanup(detail)
    }
}
