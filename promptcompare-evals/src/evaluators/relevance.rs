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

//! Semantic relevance: model-judged score blended with embedding similarity
//!
//! ```text
//! final_relevance = llm_score * 0.6 + cosine * 4
//! ```
//!
//! The multiplier on the cosine term assumes a similarity in [0, 1] and lifts
//! it to a nominal 0-4 contribution so both terms sit on a rough 0-10 scale.
//! The blend is uncalibrated.

use super::composite::ScoringWeights;
use crate::llm_client::{CallPolicy, EmbedError, EmbeddingClient, LLMClient, LLMError};
use crate::prompts::relevance_judgement_prompt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const SCORE_MARKER: &str = "Score:";
const JUSTIFICATION_LABEL: &str = "Justification:";

/// Lowest and highest score the judgement contract allows
pub const JUDGEMENT_RANGE: (f64, f64) = (1.0, 10.0);

/// Why a model-judged score could not be produced
#[derive(Debug, Error)]
pub enum JudgementError {
    #[error("Model call failed: {0}")]
    Collaborator(#[from] LLMError),

    #[error("Response has no `Score:` marker")]
    MissingMarker,

    #[error("Score is not a number: {0:?}")]
    NonNumeric(String),

    #[error("Score {0} is outside 1-10")]
    OutOfRange(f64),
}

/// Parsed model response: justification text and a score in [1, 10]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    pub justification: String,
    pub score: f64,
}

impl Judgement {
    /// Justification recorded when judging failed
    pub const FAILED_JUSTIFICATION: &'static str = "Error generating justification.";

    /// Stand-in used under a degrading failure policy
    ///
    /// Always paired with [`JudgementStatus::Failed`] so it is never read as
    /// a genuine score of zero.
    pub fn sentinel() -> Self {
        Self {
            justification: Self::FAILED_JUSTIFICATION.to_string(),
            score: 0.0,
        }
    }

    /// Parse `Justification: ... Score: <n>`
    ///
    /// The justification is everything before the first marker with the
    /// label removed; the score is the text between the first marker and the
    /// next one (or the end), trimmed.
    pub fn parse(response: &str) -> Result<Self, JudgementError> {
        let mut parts = response.split(SCORE_MARKER);
        let head = parts.next().unwrap_or_default();
        let tail = parts.next().ok_or(JudgementError::MissingMarker)?;

        let raw = tail.trim();
        let score: f64 = raw
            .parse()
            .map_err(|_| JudgementError::NonNumeric(raw.to_string()))?;
        if !score.is_finite() {
            return Err(JudgementError::NonNumeric(raw.to_string()));
        }
        if score < JUDGEMENT_RANGE.0 || score > JUDGEMENT_RANGE.1 {
            return Err(JudgementError::OutOfRange(score));
        }

        Ok(Self {
            justification: head.replace(JUSTIFICATION_LABEL, "").trim().to_string(),
            score,
        })
    }
}

/// Whether the model-judged channel produced a real score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgementStatus {
    Judged,
    Failed { reason: String },
}

impl JudgementStatus {
    pub fn is_judged(&self) -> bool {
        matches!(self, JudgementStatus::Judged)
    }
}

/// Where a similarity value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilaritySource {
    /// Cosine of two real embeddings
    Computed,
    /// Neutral placeholder; no embedding was available
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub value: f64,
    pub source: SimilaritySource,
}

impl SimilarityScore {
    pub fn computed(value: f64) -> Self {
        Self {
            value,
            source: SimilaritySource::Computed,
        }
    }

    pub fn estimated(value: f64) -> Self {
        Self {
            value,
            source: SimilaritySource::Estimated,
        }
    }

    pub fn is_estimated(&self) -> bool {
        self.source == SimilaritySource::Estimated
    }
}

/// Cosine similarity of two vectors
///
/// A zero-norm vector yields 0.0. Vectors of different length are an error.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, EmbedError> {
    if a.len() != b.len() {
        return Err(EmbedError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

/// `llm_score * judge_weight + similarity * similarity_scale`
pub fn blend_relevance(llm_score: f64, similarity: f64, weights: &ScoringWeights) -> f64 {
    llm_score * weights.judge_weight + similarity * weights.similarity_scale
}

/// Obtains both relevance signals and blends them
pub struct SemanticRelevanceBlender {
    llm_client: Arc<dyn LLMClient>,
    embedding_client: Option<Arc<dyn EmbeddingClient>>,
    weights: ScoringWeights,
    policy: CallPolicy,
}

impl SemanticRelevanceBlender {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            embedding_client: None,
            weights: ScoringWeights::default(),
            policy: CallPolicy::default(),
        }
    }

    pub fn with_embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding_client = Some(client);
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_call_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn has_embedding_client(&self) -> bool {
        self.embedding_client.is_some()
    }

    /// Ask the text-generation collaborator to judge relevance
    pub async fn judge(&self, summary: &str, reference: &str) -> Result<Judgement, JudgementError> {
        let prompt = relevance_judgement_prompt(summary, reference);
        let response = self
            .policy
            .run("relevance_judgement", || self.llm_client.generate(prompt.clone()))
            .await?;

        let judgement = Judgement::parse(&response.content)?;
        let (input_cost, output_cost) = self.llm_client.cost_per_token();
        debug!(
            score = judgement.score,
            model = %response.model,
            cost_usd = response.usage.calculate_cost(input_cost, output_cost),
            "Relevance judged"
        );
        Ok(judgement)
    }

    /// Cosine similarity between summary and reference embeddings
    ///
    /// Without an embedding collaborator this returns the placeholder tagged
    /// as [`SimilaritySource::Estimated`].
    pub async fn similarity(
        &self,
        summary: &str,
        reference: &str,
    ) -> Result<SimilarityScore, EmbedError> {
        let Some(client) = &self.embedding_client else {
            return Ok(self.placeholder());
        };

        // Embedded one at a time so a caching client can reuse the reference.
        let (summary_vec, reference_vec) = futures::try_join!(
            self.policy.run("embed_summary", || client.embed(summary)),
            self.policy.run("embed_reference", || client.embed(reference)),
        )?;

        let value = cosine_similarity(&summary_vec, &reference_vec)?;
        debug!(similarity = value, "Similarity computed");
        Ok(SimilarityScore::computed(value))
    }

    pub fn placeholder(&self) -> SimilarityScore {
        SimilarityScore::estimated(self.weights.similarity_placeholder)
    }

    pub fn blend(&self, judgement: &Judgement, similarity: &SimilarityScore) -> f64 {
        blend_relevance(judgement.score, similarity.value, &self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct ScriptedLLM {
        reply: Result<&'static str, ()>,
        calls: AtomicU32,
    }

    impl ScriptedLLM {
        fn replying(text: &'static str) -> Self {
            Self {
                reply: Ok(text),
                calls: AtomicU32::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                reply: Err(()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLLM {
        async fn generate(&self, _prompt: String) -> Result<LLMResponse, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(LLMResponse {
                    content: text.to_string(),
                    usage: TokenUsage::default(),
                    model: "scripted".to_string(),
                }),
                Err(()) => Err(LLMError::RateLimitExceeded),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn cost_per_token(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
    }

    #[test]
    fn test_parse_judgement() {
        let judgement =
            Judgement::parse("Justification:\n- Mentions AAPL\n- Cites the rally\n\nScore: 8\n")
                .unwrap();
        assert_eq!(judgement.justification, "- Mentions AAPL\n- Cites the rally");
        assert_eq!(judgement.score, 8.0);

        let judgement = Judgement::parse("Score: 7.5").unwrap();
        assert_eq!(judgement.justification, "");
        assert_eq!(judgement.score, 7.5);
    }

    #[test]
    fn test_parse_judgement_failures() {
        assert!(matches!(
            Judgement::parse("Justification: looks fine. 9/10"),
            Err(JudgementError::MissingMarker)
        ));
        assert!(matches!(
            Judgement::parse("Score: high"),
            Err(JudgementError::NonNumeric(s)) if s == "high"
        ));
        assert!(matches!(
            Judgement::parse("Score: NaN"),
            Err(JudgementError::NonNumeric(_))
        ));
        assert!(matches!(
            Judgement::parse("Score: 42"),
            Err(JudgementError::OutOfRange(s)) if s == 42.0
        ));
        assert!(matches!(
            Judgement::parse("Score: 0"),
            Err(JudgementError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_sentinel() {
        let sentinel = Judgement::sentinel();
        assert_eq!(sentinel.justification, "Error generating justification.");
        assert_eq!(sentinel.score, 0.0);
    }

    #[test]
    fn test_blend_relevance() {
        // 8.0 * 0.6 + 0.5 * 4 = 4.8 + 2.0
        let blended = blend_relevance(8.0, 0.5, &ScoringWeights::default());
        assert!((blended - 6.8).abs() < 1e-9);

        let blended = blend_relevance(10.0, 1.0, &ScoringWeights::default());
        assert!((blended - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 2.0]),
            Err(EmbedError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[tokio::test]
    async fn test_judge_parses_collaborator_response() {
        let llm = Arc::new(ScriptedLLM::replying("Justification:\n- on topic\n\nScore: 9"));
        let blender = SemanticRelevanceBlender::new(llm.clone());

        let judgement = blender.judge("summary", "news").await.unwrap();
        assert_eq!(judgement.score, 9.0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_judge_retries_once_then_fails() {
        let llm = Arc::new(ScriptedLLM::unavailable());
        let blender = SemanticRelevanceBlender::new(llm.clone())
            .with_call_policy(CallPolicy::new(Duration::from_secs(1), 1));

        let err = blender.judge("summary", "news").await.unwrap_err();
        assert!(matches!(err, JudgementError::Collaborator(LLMError::RateLimitExceeded)));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_similarity_without_embedder_is_estimated() {
        let blender = SemanticRelevanceBlender::new(Arc::new(ScriptedLLM::replying("Score: 5")));
        assert!(!blender.has_embedding_client());

        let similarity = blender.similarity("a", "b").await.unwrap();
        assert_eq!(similarity, SimilarityScore::estimated(0.5));
        assert!(similarity.is_estimated());
    }

    #[tokio::test]
    async fn test_blend_uses_judgement_and_similarity() {
        let blender = SemanticRelevanceBlender::new(Arc::new(ScriptedLLM::replying("Score: 5")));
        let judgement = Judgement {
            justification: String::new(),
            score: 8.0,
        };
        let blended = blender.blend(&judgement, &SimilarityScore::computed(0.5));
        assert!((blended - 6.8).abs() < 1e-9);
    }
}
