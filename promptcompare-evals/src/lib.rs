// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Promptcompare Evaluation Core
//!
//! Scores generated financial summaries against a reference news digest.
//!
//! ## Features
//!
//! - **Heuristic scorer**: six pattern/statistics based dimensions, each 0-5 with a note
//! - **Composite aggregator**: relevance and readability totals plus a weighted 0-100 score
//! - **Semantic relevance blend**: model-judged score combined with embedding cosine similarity
//! - **Metrics orchestration**: one flat record per summary, with per-stage failure tags
//! - **Embedding cache**: a shared reference digest is embedded once per batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptcompare_evals::{EvalConfig, MetricsOrchestrator};
//! use promptcompare_evals::llm_client::GeminiClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(GeminiClient::new(
//!         std::env::var("GEMINI_API_KEY").unwrap(),
//!         "gemini-pro-latest".to_string(),
//!     ));
//!
//!     let orchestrator = MetricsOrchestrator::new(client.clone(), EvalConfig::default())
//!         .with_embedding_client(client);
//!
//!     let record = orchestrator
//!         .evaluate("Summary text...", "News digest...", "baseline")
//!         .await
//!         .unwrap();
//!     println!("composite = {}", record.evaluation.composite_score);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod cache;
pub mod evaluators;
pub mod llm_client;
pub mod metrics;
pub mod prompts;
pub mod report;

pub use cache::{CacheStats, CachedEmbeddingClient};
pub use evaluators::composite::{
    evaluate_summary_text, CompositeAggregator, EvaluationResult, ReadabilityBundle,
    RelevanceBundle, ScoringWeights,
};
pub use evaluators::heuristics::{HeuristicScorer, ScoredDimension};
pub use evaluators::local::LocalEmbeddingClient;
pub use evaluators::readability::{word_count, FleschReadingEase, ReadabilityFormula};
pub use evaluators::relevance::{
    blend_relevance, cosine_similarity, Judgement, JudgementError, JudgementStatus,
    SemanticRelevanceBlender, SimilarityScore, SimilaritySource,
};
pub use metrics::{
    BatchError, BatchRun, MetricsOrchestrator, MetricsRecord, StageFailure, SummaryVariant,
};
pub use report::render_report;

/// Pipeline stage an evaluation failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading the generated text
    Input,
    ReadingLevel,
    /// Model-judged relevance (text-generation collaborator)
    ModelJudgement,
    /// Vector similarity (embedding collaborator)
    Similarity,
    Heuristics,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::ReadingLevel => "reading_level",
            Stage::ModelJudgement => "model_judgement",
            Stage::Similarity => "similarity",
            Stage::Heuristics => "heuristics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvalError {
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        EvalError::Stage {
            stage,
            message: message.into(),
        }
    }

    /// Stage this error is attributed to, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            EvalError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// What the orchestrator does when an external stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return `EvalError::Stage` for the first failing stage
    #[default]
    Strict,
    /// Substitute the sentinel values and record the failure on the record
    Degrade,
}

/// Configuration for evaluation execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Maximum number of summaries evaluated concurrently in a batch
    pub max_concurrent: usize,

    /// Timeout per external call in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt of an external call
    pub max_retries: u32,

    /// Whether to cache embeddings
    pub enable_cache: bool,

    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,

    pub failure_policy: FailurePolicy,

    pub weights: ScoringWeights,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            timeout_secs: 30,
            max_retries: 1,
            enable_cache: true,
            cache_ttl_secs: 3600, // 1 hour
            failure_policy: FailurePolicy::Strict,
            weights: ScoringWeights::default(),
        }
    }
}

impl EvalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn call_policy(&self) -> llm_client::CallPolicy {
        llm_client::CallPolicy::new(self.timeout(), self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_config_default() {
        let config = EvalConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert!(config.enable_cache);
    }

    #[test]
    fn test_eval_config_partial_json() {
        let config: EvalConfig =
            serde_json::from_str(r#"{"timeout_secs": 5, "failure_policy": "degrade"}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.failure_policy, FailurePolicy::Degrade);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.weights, ScoringWeights::default());
    }

    #[test]
    fn test_stage_error_display() {
        let err = EvalError::stage(Stage::ModelJudgement, "missing Score: marker");
        assert_eq!(err.failed_stage(), Some(Stage::ModelJudgement));
        assert_eq!(
            err.to_string(),
            "model_judgement stage failed: missing Score: marker"
        );
    }
}
