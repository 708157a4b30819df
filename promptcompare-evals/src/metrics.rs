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

//! Metrics orchestration
//!
//! Runs every scoring stage for one generated summary and assembles the flat
//! record handed to storage. The two external stages (model judgement and
//! embedding similarity) run concurrently; the pure stages run inline.
//!
//! What happens when an external stage fails is decided by
//! [`FailurePolicy`]: `Strict` returns the failing [`Stage`], `Degrade`
//! substitutes the sentinel values and records a [`StageFailure`].

use crate::cache::{CacheStats, CachedEmbeddingClient};
use crate::evaluators::composite::{CompositeAggregator, EvaluationResult};
use crate::evaluators::heuristics::HeuristicScorer;
use crate::evaluators::readability::{word_count, FleschReadingEase, ReadabilityFormula};
use crate::evaluators::relevance::{
    Judgement, JudgementStatus, SemanticRelevanceBlender, SimilaritySource,
};
use crate::llm_client::{EmbeddingClient, LLMClient};
use crate::{EvalConfig, EvalError, FailurePolicy, Stage};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One generated summary and the prompt variant that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryVariant {
    pub label: String,
    pub text: String,
}

impl SummaryVariant {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A stage that failed and was replaced by its sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Everything measured for one summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub summary_type: String,
    pub reading_level: f64,
    pub word_count: usize,
    pub relevance_justification: String,
    pub llm_relevance_score: f64,
    pub cosine_similarity_score: f64,
    pub final_relevance_score: f64,
    pub judgement_status: JudgementStatus,
    pub similarity_source: SimilaritySource,
    pub evaluation: EvaluationResult,
    pub failures: Vec<StageFailure>,
    pub evaluated_at: DateTime<Utc>,
}

impl MetricsRecord {
    /// True if any stage was replaced by a sentinel
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Flat column map, one entry per persisted column
    pub fn flatten(&self) -> Map<String, Value> {
        let rel = &self.evaluation.relevance;
        let read = &self.evaluation.readability;
        let judgement_status = match &self.judgement_status {
            JudgementStatus::Judged => "judged",
            JudgementStatus::Failed { .. } => "failed",
        };
        let similarity_source = match self.similarity_source {
            SimilaritySource::Computed => "computed",
            SimilaritySource::Estimated => "estimated",
        };

        let mut row = Map::new();
        row.insert("summary_type".into(), json!(self.summary_type));
        row.insert("reading_level".into(), json!(self.reading_level));
        row.insert("word_count".into(), json!(self.word_count));
        row.insert(
            "relevance_justification".into(),
            json!(self.relevance_justification),
        );
        row.insert("llm_relevance_score".into(), json!(self.llm_relevance_score));
        row.insert(
            "cosine_similarity_score".into(),
            json!(self.cosine_similarity_score),
        );
        row.insert(
            "final_relevance_score".into(),
            json!(self.final_relevance_score),
        );

        let dimensions = [
            ("metric_alignment", &rel.metric_alignment),
            ("data_relevance", &rel.data_relevance),
            ("primer_consistency", &rel.primer_consistency),
            ("structure", &read.structure),
            ("clarity", &read.clarity),
            ("writing_quality", &read.writing_quality),
        ];
        for (name, dimension) in dimensions {
            row.insert(format!("{name}_score"), json!(dimension.score));
            row.insert(format!("{name}_note"), json!(dimension.note));
        }

        row.insert(
            "composite_score".into(),
            json!(self.evaluation.composite_score),
        );
        row.insert("judgement_status".into(), json!(judgement_status));
        row.insert("similarity_source".into(), json!(similarity_source));
        row
    }
}

/// A variant that produced no record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    pub label: String,
    pub stage: Option<Stage>,
    pub message: String,
}

/// Result of evaluating a set of variants against one reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub records: Vec<MetricsRecord>,
    pub errors: Vec<BatchError>,
}

/// Runs every stage for a summary and assembles a [`MetricsRecord`]
pub struct MetricsOrchestrator {
    blender: SemanticRelevanceBlender,
    aggregator: CompositeAggregator,
    readability: Arc<dyn ReadabilityFormula>,
    embedding_cache: Option<Arc<CachedEmbeddingClient>>,
    config: EvalConfig,
}

impl MetricsOrchestrator {
    pub fn new(llm_client: Arc<dyn LLMClient>, config: EvalConfig) -> Self {
        let blender = SemanticRelevanceBlender::new(llm_client)
            .with_weights(config.weights)
            .with_call_policy(config.call_policy());

        Self {
            blender,
            aggregator: CompositeAggregator::new(config.weights),
            readability: Arc::new(FleschReadingEase::new()),
            embedding_cache: None,
            config,
        }
    }

    /// Enable the similarity stage
    ///
    /// The client is wrapped in a [`CachedEmbeddingClient`] when caching is
    /// enabled in the config.
    pub fn with_embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        let client = if self.config.enable_cache {
            let cached = Arc::new(CachedEmbeddingClient::new(
                client,
                self.config.cache_ttl_secs,
            ));
            self.embedding_cache = Some(cached.clone());
            cached as Arc<dyn EmbeddingClient>
        } else {
            client
        };
        self.blender = self.blender.with_embedding_client(client);
        self
    }

    pub fn with_readability(mut self, formula: Arc<dyn ReadabilityFormula>) -> Self {
        self.readability = formula;
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.embedding_cache.as_ref().map(|cache| cache.stats())
    }

    /// Evaluate one generated text against the reference digest
    pub async fn evaluate(
        &self,
        generated: &str,
        reference: &str,
        label: &str,
    ) -> Result<MetricsRecord, EvalError> {
        if label.trim().is_empty() {
            return Err(EvalError::InvalidInput(
                "summary label must not be empty".to_string(),
            ));
        }
        debug!(label, words = word_count(generated), "Evaluating summary");

        let (judgement, similarity) = futures::join!(
            self.blender.judge(generated, reference),
            self.blender.similarity(generated, reference),
        );

        let mut failures = Vec::new();

        let mut reading_level = self.readability.reading_ease(generated);
        if !reading_level.is_finite() {
            let message = format!("{} returned {reading_level}", self.readability.name());
            self.stage_failed(label, Stage::ReadingLevel, message, &mut failures)?;
            reading_level = 0.0;
        }

        let (judgement, judgement_status) = match judgement {
            Ok(judgement) => (judgement, JudgementStatus::Judged),
            Err(e) => {
                let reason = e.to_string();
                self.stage_failed(label, Stage::ModelJudgement, reason.clone(), &mut failures)?;
                (Judgement::sentinel(), JudgementStatus::Failed { reason })
            }
        };

        let similarity = match similarity {
            Ok(similarity) => similarity,
            Err(e) => {
                self.stage_failed(label, Stage::Similarity, e.to_string(), &mut failures)?;
                self.blender.placeholder()
            }
        };
        if similarity.is_estimated() {
            debug!(label, value = similarity.value, "Using placeholder similarity");
        }

        let mut evaluation = self.aggregator.evaluate(HeuristicScorer::shared(), generated);
        if !evaluation.composite_score.is_finite() {
            let message = format!("composite score is {}", evaluation.composite_score);
            self.stage_failed(label, Stage::Heuristics, message, &mut failures)?;
            evaluation.composite_score = 0.0;
        }

        let final_relevance_score = self.blender.blend(&judgement, &similarity);

        info!(
            label,
            composite = evaluation.composite_score,
            final_relevance = final_relevance_score,
            degraded = !failures.is_empty(),
            "Summary evaluated"
        );

        Ok(MetricsRecord {
            summary_type: label.to_string(),
            reading_level,
            word_count: word_count(generated),
            relevance_justification: judgement.justification,
            llm_relevance_score: judgement.score,
            cosine_similarity_score: similarity.value,
            final_relevance_score,
            judgement_status,
            similarity_source: similarity.source,
            evaluation,
            failures,
            evaluated_at: Utc::now(),
        })
    }

    /// Read the generated text from `path` and evaluate it
    pub async fn evaluate_path(
        &self,
        path: impl AsRef<Path>,
        label: &str,
        reference: &str,
    ) -> Result<MetricsRecord, EvalError> {
        let path = path.as_ref();
        let generated = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EvalError::stage(Stage::Input, format!("{}: {e}", path.display())))?;

        self.evaluate(&generated, reference, label).await
    }

    /// Evaluate every variant against the same reference
    ///
    /// At most `max_concurrent` variants are in flight; records keep the
    /// input order. A variant that fails lands in `errors` and does not
    /// affect the others.
    pub async fn evaluate_batch(&self, variants: &[SummaryVariant], reference: &str) -> BatchRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, variants = variants.len(), "Starting batch evaluation");

        let results: Vec<Result<MetricsRecord, EvalError>> = stream::iter(
            variants
                .iter()
                .map(|variant| self.evaluate(&variant.text, reference, &variant.label)),
        )
        .buffered(self.config.max_concurrent.max(1))
        .collect()
        .await;

        let mut records = Vec::new();
        let mut errors = Vec::new();
        for (variant, result) in variants.iter().zip(results) {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%run_id, label = %variant.label, error = %e, "Variant failed");
                    errors.push(BatchError {
                        label: variant.label.clone(),
                        stage: e.failed_stage(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(stats) = self.cache_stats() {
            debug!(hits = stats.hits, misses = stats.misses, "Embedding cache");
        }
        info!(
            %run_id,
            records = records.len(),
            errors = errors.len(),
            "Batch evaluation complete"
        );

        BatchRun {
            run_id,
            started_at,
            records,
            errors,
        }
    }

    fn stage_failed(
        &self,
        label: &str,
        stage: Stage,
        message: String,
        failures: &mut Vec<StageFailure>,
    ) -> Result<(), EvalError> {
        match self.config.failure_policy {
            FailurePolicy::Strict => Err(EvalError::stage(stage, message)),
            FailurePolicy::Degrade => {
                warn!(label, %stage, error = %message, "Stage failed; substituting sentinel");
                failures.push(StageFailure { stage, message });
                Ok(())
            }
        }
    }
}
