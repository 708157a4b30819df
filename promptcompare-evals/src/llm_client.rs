// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Text-generation and embedding collaborators
//!
//! Both are traits so the scoring core never depends on a vendor. Every call
//! made through [`CallPolicy`] is bounded by a timeout and retried at most
//! `max_retries` times.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Trait for text-generation clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get the plain-text completion
    async fn generate(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Get cost per token (input, output)
    fn cost_per_token(&self) -> (f64, f64);
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Calculate cost based on per-token pricing
    pub fn calculate_cost(&self, cost_per_input: f64, cost_per_output: f64) -> f64 {
        (self.prompt_tokens as f64 * cost_per_input)
            + (self.completion_tokens as f64 * cost_per_output)
    }
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from embedding clients
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A transport failure observed by another caller of a shared request
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed embedding payload: {0}")]
    Malformed(String),
}

impl EmbedError {
    /// Owned copy of an error that several waiters observed together
    ///
    /// Keeps the kind, and with it retryability. Transport and decode errors
    /// cannot be cloned so their messages are carried instead.
    pub fn to_owned_kind(&self) -> Self {
        match self {
            EmbedError::ApiError(message) => EmbedError::ApiError(message.clone()),
            EmbedError::RateLimitExceeded => EmbedError::RateLimitExceeded,
            EmbedError::DimensionMismatch { left, right } => EmbedError::DimensionMismatch {
                left: *left,
                right: *right,
            },
            EmbedError::Timeout(after) => EmbedError::Timeout(*after),
            EmbedError::Http(e) => EmbedError::Transport(e.to_string()),
            EmbedError::Transport(message) => EmbedError::Transport(message.clone()),
            EmbedError::Json(e) => EmbedError::Malformed(e.to_string()),
            EmbedError::Malformed(message) => EmbedError::Malformed(message.clone()),
        }
    }
}

/// Trait for embedding clients
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text string
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError>;

    /// Embed a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError>;
}

/// Errors a [`CallPolicy`] knows how to retry
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;

    fn timed_out(after: Duration) -> Self;
}

impl Retryable for LLMError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LLMError::RateLimitExceeded | LLMError::Timeout(_) | LLMError::Http(_)
        )
    }

    fn timed_out(after: Duration) -> Self {
        LLMError::Timeout(after)
    }
}

impl Retryable for EmbedError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbedError::RateLimitExceeded
                | EmbedError::Timeout(_)
                | EmbedError::Http(_)
                | EmbedError::Transport(_)
        )
    }

    fn timed_out(after: Duration) -> Self {
        EmbedError::Timeout(after)
    }
}

/// Timeout and retry budget for one external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    /// Run `call`, bounding each attempt by the timeout
    ///
    /// Only rate-limit, timeout and transport errors are retried; a malformed
    /// payload fails immediately.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "Retrying external call");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Why an HTTP exchange with a provider did not yield a JSON body
enum Rejection {
    RateLimited,
    Status(reqwest::StatusCode, String),
    Transport(reqwest::Error),
    Malformed(serde_json::Error),
}

impl From<Rejection> for LLMError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::RateLimited => LLMError::RateLimitExceeded,
            Rejection::Status(status, body) => LLMError::ApiError(format!("{status}: {body}")),
            Rejection::Transport(e) => LLMError::Http(e),
            Rejection::Malformed(e) => LLMError::Json(e),
        }
    }
}

impl From<Rejection> for EmbedError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::RateLimited => EmbedError::RateLimitExceeded,
            Rejection::Status(status, body) => EmbedError::ApiError(format!("{status}: {body}")),
            Rejection::Transport(e) => EmbedError::Http(e),
            Rejection::Malformed(e) => EmbedError::Json(e),
        }
    }
}

/// POST a JSON body and decode the JSON reply
///
/// The body is read as text first so an undecodable payload surfaces as a
/// JSON error rather than a transport one.
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, Rejection> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(Rejection::Transport)?;

    let status = response.status();
    let text = response.text().await.map_err(Rejection::Transport)?;
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(Rejection::RateLimited);
    }
    if !status.is_success() {
        return Err(Rejection::Status(status, text));
    }
    serde_json::from_str(&text).map_err(Rejection::Malformed)
}

fn token_count(value: &serde_json::Value) -> u32 {
    value.as_u64().unwrap_or(0) as u32
}

fn usage_from(usage: &serde_json::Value, prompt_key: &str, completion_key: &str) -> TokenUsage {
    let prompt_tokens = token_count(&usage[prompt_key]);
    let completion_tokens = token_count(&usage[completion_key]);
    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

/// Pull `items[*][field]` out as float vectors, one per requested text
///
/// Every element must be a number; a missing or non-numeric value rejects
/// the whole payload.
fn vectors_from(
    items: &serde_json::Value,
    field: &str,
    expected: usize,
) -> Result<Vec<Vec<f64>>, EmbedError> {
    let items = items
        .as_array()
        .ok_or_else(|| EmbedError::Malformed("Missing embedding list".to_string()))?;
    if items.len() != expected {
        return Err(EmbedError::ApiError(format!(
            "Expected {} embeddings, got {}",
            expected,
            items.len()
        )));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let values = item[field].as_array().ok_or_else(|| {
                EmbedError::Malformed(format!("Embedding {index} has no `{field}` array"))
            })?;
            values
                .iter()
                .map(|value| {
                    value.as_f64().ok_or_else(|| {
                        EmbedError::Malformed(format!(
                            "Embedding {index} has a non-numeric value: {value}"
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

async fn embed_one<C: EmbeddingClient + ?Sized>(
    client: &C,
    text: &str,
) -> Result<Vec<f64>, EmbedError> {
    client
        .embed_batch(&[text.to_string()])
        .await?
        .pop()
        .ok_or_else(|| EmbedError::ApiError("No embedding returned".to_string()))
}

/// Google Gemini client (`generateContent` / `batchEmbedContents`)
pub struct GeminiClient {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            embedding_model: "text-embedding-004".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_embedding_model(mut self, model: String) -> Self {
        self.embedding_model = model;
        self
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{}", self.base_url, endpoint))
            .header("x-goog-api-key", &self.api_key)
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.0 }
        });
        let reply = post_json(
            self.post(&format!("models/{}:generateContent", self.model)),
            &body,
        )
        .await?;

        // A candidate may split its text across several parts
        let parts = reply["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LLMError::InvalidResponse("Missing candidate content".to_string()))?;
        let content: String = parts.iter().filter_map(|part| part["text"].as_str()).collect();

        Ok(LLMResponse {
            content,
            usage: usage_from(
                &reply["usageMetadata"],
                "promptTokenCount",
                "candidatesTokenCount",
            ),
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            m if m.starts_with("gemini-1.5-pro") => (0.00000125, 0.000005), // $1.25/$5 per 1M
            m if m.starts_with("gemini-1.5-flash") => (0.000000075, 0.0000003), // $0.075/$0.30 per 1M
            _ => (0.0000005, 0.0000015),
        }
    }
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        embed_one(self, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        let model_path = format!("models/{}", self.embedding_model);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": model_path,
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();

        let reply = post_json(
            self.post(&format!("{model_path}:batchEmbedContents")),
            &serde_json::json!({ "requests": requests }),
        )
        .await?;

        vectors_from(&reply["embeddings"], "values", texts.len())
    }
}

/// OpenAI client (chat completions and `/embeddings`)
pub struct OpenAIClient {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_embedding_model(mut self, model: String) -> Self {
        self.embedding_model = model;
        self
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        embed_one(self, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        let body = serde_json::json!({ "model": self.embedding_model, "input": texts });
        let reply = post_json(self.post("embeddings"), &body).await?;
        vectors_from(&reply["data"], "embedding", texts.len())
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.0
        });
        let reply = post_json(self.post("chat/completions"), &body).await?;

        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("Missing message content".to_string()))?
            .to_string();

        Ok(LLMResponse {
            content,
            usage: usage_from(&reply["usage"], "prompt_tokens", "completion_tokens"),
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "gpt-4o" => (0.0000025, 0.000010),        // $2.50/$10 per 1M
            "gpt-4o-mini" => (0.00000015, 0.0000006), // $0.15/$0.60 per 1M
            _ => (0.00000015, 0.0000006),
        }
    }
}

/// Anthropic client (messages API, text only)
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 2048,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.0
        });
        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let reply = post_json(request, &body).await?;

        let content: String = reply["content"]
            .as_array()
            .ok_or_else(|| LLMError::InvalidResponse("Missing content blocks".to_string()))?
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();

        Ok(LLMResponse {
            content,
            usage: usage_from(&reply["usage"], "input_tokens", "output_tokens"),
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            m if m.starts_with("claude-3-5-haiku") => (0.0000008, 0.000004), // $0.80/$4 per 1M
            _ => (0.000003, 0.000015),                                        // $3/$15 per 1M
        }
    }
}
