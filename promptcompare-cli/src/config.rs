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

use anyhow::Result;
use promptcompare_evals::{EvalConfig, FailurePolicy, ScoringWeights};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Promptcompare CLI Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub evaluation: EvalConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Debug logging
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAI,
    Anthropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Gemini,
    OpenAI,
    /// Offline hashed bag-of-words embeddings
    #[default]
    Local,
    /// No embeddings; similarity falls back to the placeholder
    None,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LLMConfig {
    /// Text-generation provider
    #[serde(default)]
    pub provider: Provider,

    /// Model name (provider default if unset)
    pub model: Option<String>,

    #[serde(default)]
    pub embedding_provider: EmbeddingProvider,

    /// Embedding model name (provider default if unset)
    pub embedding_model: Option<String>,

    /// Override the provider API base URL
    pub base_url: Option<String>,

    /// Google Gemini API key
    pub gemini_api_key: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,
}

impl LLMConfig {
    pub fn model(&self) -> &str {
        if let Some(model) = &self.model {
            return model;
        }
        match self.provider {
            Provider::Gemini => "gemini-pro-latest",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-haiku-20241022",
        }
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Where to write the plain-text report
    pub report_path: Option<PathBuf>,

    /// Directory for per-run JSON records
    pub json_dir: Option<PathBuf>,
}

/// The config file as written: every value it omits stays `None`
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    llm: LLMConfig,

    #[serde(default)]
    evaluation: EvalOverrides,

    #[serde(default)]
    output: OutputConfig,

    debug: Option<bool>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct EvalOverrides {
    max_concurrent: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    enable_cache: Option<bool>,
    cache_ttl_secs: Option<u64>,
    failure_policy: Option<FailurePolicy>,
    weights: Option<ScoringWeights>,
}

impl EvalOverrides {
    fn apply(self, base: EvalConfig) -> EvalConfig {
        EvalConfig {
            max_concurrent: self.max_concurrent.unwrap_or(base.max_concurrent),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            enable_cache: self.enable_cache.unwrap_or(base.enable_cache),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(base.cache_ttl_secs),
            failure_policy: self.failure_policy.unwrap_or(base.failure_policy),
            weights: self.weights.unwrap_or(base.weights),
        }
    }
}

impl CliConfig {
    /// Load configuration with priority: file > env > defaults
    ///
    /// Supported environment variables:
    /// - GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY: provider API keys
    /// - PROMPTCOMPARE_MODEL: model name
    /// - PROMPTCOMPARE_TIMEOUT_SECS: timeout per external call (default: 30)
    /// - PROMPTCOMPARE_DEBUG: debug logging (default: false)
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, |name| std::env::var(name).ok())
    }

    fn load_with(
        config_file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file_config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Some(FileConfig::read(path)?)
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                None
            }
            None => None,
        };

        let mut config = Self::default();
        config.apply_env(&lookup);
        if let Some(file_config) = file_config {
            config = config.merge_file(file_config);
        }
        Ok(config)
    }

    /// Overlay values the file sets on top of env and defaults
    ///
    /// Anything the file leaves out keeps its env or default value.
    fn merge_file(self, file: FileConfig) -> Self {
        let llm = LLMConfig {
            provider: file.llm.provider,
            model: file.llm.model.or(self.llm.model),
            embedding_provider: file.llm.embedding_provider,
            embedding_model: file.llm.embedding_model.or(self.llm.embedding_model),
            base_url: file.llm.base_url.or(self.llm.base_url),
            gemini_api_key: file.llm.gemini_api_key.or(self.llm.gemini_api_key),
            openai_api_key: file.llm.openai_api_key.or(self.llm.openai_api_key),
            anthropic_api_key: file.llm.anthropic_api_key.or(self.llm.anthropic_api_key),
        };

        Self {
            llm,
            evaluation: file.evaluation.apply(self.evaluation),
            output: OutputConfig {
                report_path: file.output.report_path.or(self.output.report_path),
                json_dir: file.output.json_dir.or(self.output.json_dir),
            },
            debug: file.debug.unwrap_or(self.debug),
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }

        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }

        if let Some(model) = lookup("PROMPTCOMPARE_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(timeout) = lookup("PROMPTCOMPARE_TIMEOUT_SECS") {
            if let Ok(val) = timeout.parse() {
                self.evaluation.timeout_secs = val;
            }
        }

        if let Some(debug) = lookup("PROMPTCOMPARE_DEBUG") {
            self.debug = matches!(debug.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let eval = &self.evaluation;
        if eval.max_concurrent == 0 {
            anyhow::bail!("evaluation.max_concurrent must be at least 1");
        }
        if eval.timeout_secs == 0 {
            anyhow::bail!("evaluation.timeout_secs must be positive");
        }

        let w = &eval.weights;
        for (name, value) in [
            ("relevance_weight", w.relevance_weight),
            ("readability_weight", w.readability_weight),
            ("bundle_max", w.bundle_max),
            ("judge_weight", w.judge_weight),
            ("similarity_scale", w.similarity_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("evaluation.weights.{} must be positive, got {}", name, value);
            }
        }
        if !(-1.0..=1.0).contains(&w.similarity_placeholder) {
            anyhow::bail!(
                "evaluation.weights.similarity_placeholder must be in [-1, 1], got {}",
                w.similarity_placeholder
            );
        }

        if self.llm.api_key(self.llm.provider).is_none() {
            anyhow::bail!("No API key configured for provider {:?}", self.llm.provider);
        }
        let embedding_key = match self.llm.embedding_provider {
            EmbeddingProvider::Gemini => Some(Provider::Gemini),
            EmbeddingProvider::OpenAI => Some(Provider::OpenAI),
            EmbeddingProvider::Local | EmbeddingProvider::None => None,
        };
        if let Some(provider) = embedding_key {
            if self.llm.api_key(provider).is_none() {
                anyhow::bail!("No API key configured for embedding provider {:?}", provider);
            }
        }

        Ok(())
    }
}
