//! Quote generation with explicit fallback selection
//!
//! A [`QuoteSource`] returns a tagged [`GenerationOutcome`]. Turning that
//! outcome into the quote a run will use is a separate step,
//! [`select_quote`], which validates generated quotes and substitutes a
//! random entry from [`FALLBACK_QUOTES`] on any failure. Generation problems
//! never abort a run.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::types::{Quote, MAX_QUOTE_CHARS};

/// Quotes used when generation is unavailable or returns malformed data
pub const FALLBACK_QUOTES: &[(&str, &str)] = &[
    ("Every moment is a fresh beginning.", "T.S. Eliot"),
    ("Success is not final, failure is not fatal.", "Winston Churchill"),
    (
        "The future belongs to those who believe in the beauty of their dreams.",
        "Eleanor Roosevelt",
    ),
    ("The only way to do great work is to love what you do.", "Steve Jobs"),
    (
        "Your time is limited. Don't waste it living someone else's life.",
        "Steve Jobs",
    ),
    ("The best revenge is massive success.", "Frank Sinatra"),
    ("Believe you can and you're halfway there.", "Theodore Roosevelt"),
    (
        "Everything you've ever wanted is on the other side of fear.",
        "George Addair",
    ),
    ("Dream big and dare to fail.", "Norman Vaughan"),
    ("The harder you work, the luckier you get.", "Gary Player"),
];

/// Quote characters removed from generated content
const QUOTE_MARKS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(Quote),
    Failed(GenerationError),
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn generate(&self) -> GenerationOutcome;
}

/// Remove enclosing and embedded quote characters
///
/// Apostrophes inside words are kept when they are plain ASCII (`don't`);
/// every other quote mark is dropped.
pub fn strip_quote_marks(text: &str) -> String {
    let trimmed = text.trim().trim_matches(|c| QUOTE_MARKS.contains(&c));
    let mut out = String::with_capacity(trimmed.len());
    let chars: Vec<char> = trimmed.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if *c == '\'' {
            let inner = i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_alphanumeric()
                && chars[i + 1].is_alphanumeric();
            if inner {
                out.push(*c);
            }
            continue;
        }
        if !QUOTE_MARKS.contains(c) {
            out.push(*c);
        }
    }
    out.trim().to_string()
}

/// Normalize and check a quote against the content rules
///
/// # Errors
///
/// Returns `GenerationError::Malformed` if content or author is empty, or the
/// content exceeds [`MAX_QUOTE_CHARS`] characters.
pub fn validate_quote(quote: Quote) -> Result<Quote, GenerationError> {
    let content = strip_quote_marks(&quote.content);
    let author = quote.author.trim().to_string();

    if content.is_empty() {
        return Err(GenerationError::Malformed("empty content".to_string()));
    }
    if author.is_empty() {
        return Err(GenerationError::Malformed("empty author".to_string()));
    }
    let length = content.chars().count();
    if length > MAX_QUOTE_CHARS {
        return Err(GenerationError::Malformed(format!(
            "content is {} characters (max {})",
            length, MAX_QUOTE_CHARS
        )));
    }

    Ok(Quote { content, author })
}

/// Pick one fallback quote uniformly at random
pub fn fallback_quote() -> Quote {
    let (content, author) = FALLBACK_QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_QUOTES[0]);
    Quote::new(content, author)
}

/// Resolve a generation outcome into the quote a run will use
pub fn select_quote(outcome: GenerationOutcome) -> Quote {
    match outcome {
        GenerationOutcome::Generated(quote) => match validate_quote(quote) {
            Ok(quote) => {
                info!("Using generated quote: {}", quote);
                quote
            }
            Err(e) => {
                warn!("Invalid quote format from generator ({}), using fallback", e);
                fallback_quote()
            }
        },
        GenerationOutcome::Failed(e) => {
            warn!("Quote generation failed ({}), using fallback", e);
            fallback_quote()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

/// Parse the generator's text reply, tolerating a Markdown code fence
///
/// # Errors
///
/// Returns `GenerationError::Malformed` if the text is not a JSON object
/// with non-empty `content` and `author`.
pub fn parse_quote_response(text: &str) -> Result<Quote, GenerationError> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    let raw: RawQuote = serde_json::from_str(body.trim())
        .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {}", e)))?;

    match (raw.content, raw.author) {
        (Some(content), Some(author)) if !content.is_empty() && !author.is_empty() => {
            Ok(Quote { content, author })
        }
        _ => Err(GenerationError::Malformed(
            "missing content or author".to_string(),
        )),
    }
}

pub const QUOTE_PROMPT: &str = r#"Generate a short motivational quote in JSON format:
{
  "content": "<quote>",
  "author": "<author>"
}

Rules:
- Quote must be under 100 characters
- Focus on success or motivation
- Author must be well-known
- Do not include quotation marks in the quote
- Response must be valid JSON only"#;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 256,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Quote source backed by the Gemini `generateContent` API
pub struct GeminiSource {
    client: Client,
    api_key: Option<SecretString>,
    config: GeminiConfig,
}

impl GeminiSource {
    /// # Errors
    ///
    /// Returns `GenerationError::Request` if the HTTP client cannot be built.
    pub fn new(
        api_key: Option<SecretString>,
        config: GeminiConfig,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    async fn request(&self) -> Result<Quote, GenerationError> {
        let api_key = self.api_key.as_ref().ok_or(GenerationError::MissingApiKey)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: QUOTE_PROMPT }],
            }],
            generation_config: GenerationParams {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("invalid response body: {}", e)))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Malformed("empty response".to_string()));
        }

        parse_quote_response(&text)
    }
}

#[async_trait]
impl QuoteSource for GeminiSource {
    async fn generate(&self) -> GenerationOutcome {
        match self.request().await {
            Ok(quote) => GenerationOutcome::Generated(quote),
            Err(e) => GenerationOutcome::Failed(e),
        }
    }
}

/// Source that always defers to the fallback table
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSource;

#[async_trait]
impl QuoteSource for FallbackSource {
    async fn generate(&self) -> GenerationOutcome {
        GenerationOutcome::Failed(GenerationError::MissingApiKey)
    }
}
