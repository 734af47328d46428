//! Analysis Service Client
//!
//! Sends selected text to the morphological analysis service and flattens
//! the per-sentence response into one ordered token list.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{KakuError, KakuResult};
use crate::token::{preview, Token};

/// Path of the analysis endpoint, relative to the service base URL
pub const ANALYSIS_PATH: &str = "/api/analysis/text";

/// Trait for analysis backends
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze `text`; one attempt, no retry
    async fn analyze(&self, text: &str) -> KakuResult<Vec<Token>>;
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Debug, Deserialize)]
struct Sentence {
    #[serde(default)]
    tokens: Vec<Token>,
}

/// HTTP client for the analysis service
#[derive(Clone)]
pub struct AnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ANALYSIS_PATH),
            timeout,
        }
    }

    /// Create a client from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.analysis_url, config.analysis_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    async fn analyze(&self, text: &str) -> KakuResult<Vec<Token>> {
        info!("📤 Sending text for analysis: \"{}\"", preview(text));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text }))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            warn!("❌ Analysis API error ({}): {}", status, body_text);
            return Err(KakuError::Network(format!("analysis service returned {status}")));
        }

        debug!("Analysis raw body: {}", body_text);
        let tokens = parse_response(&body_text)?;
        info!("🧩 Analysis produced {} tokens", tokens.len());
        Ok(tokens)
    }
}

/// Flatten every sentence's tokens, in order, dropping empty surfaces
pub fn parse_response(body: &str) -> KakuResult<Vec<Token>> {
    let parsed: AnalysisResponse = serde_json::from_str(body)
        .map_err(|e| KakuError::Network(format!("malformed analysis response: {e}")))?;

    let tokens: Vec<Token> = parsed
        .sentences
        .into_iter()
        .flat_map(|s| s.tokens)
        .filter(|t| {
            if t.surface.is_empty() {
                debug!("Dropping token with empty surface");
            }
            !t.surface.is_empty()
        })
        .collect();
    Ok(tokens)
}
