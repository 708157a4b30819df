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

//! Composite scoring over the six heuristic dimensions
//!
//! ```text
//! relevance_total   = metric + data + primer            (max 15)
//! readability_total = structure + clarity + writing     (max 15)
//! composite         = round((rel/15 * 0.6 + read/15 * 0.4) * 100, 2)
//! ```
//!
//! The weights are heuristic and have never been calibrated against human
//! judgement. They are exposed through [`ScoringWeights`] for tuning.

use super::heuristics::{HeuristicScorer, ScoredDimension, DIMENSION_MAX};
use serde::{Deserialize, Serialize};

/// Weight of the relevance bundle in the composite score
pub const RELEVANCE_WEIGHT: f64 = 0.6;
/// Weight of the readability bundle in the composite score
pub const READABILITY_WEIGHT: f64 = 0.4;
/// Normalization denominator: three dimensions times a maximum of 5
pub const BUNDLE_MAX: f64 = 15.0;
/// Weight of the model-judged relevance score in the relevance blend
pub const JUDGE_WEIGHT: f64 = 0.6;
/// Multiplier that lifts a 0-1 cosine similarity to a nominal 0-4 contribution
pub const SIMILARITY_SCALE: f64 = 4.0;
/// Similarity used when no embedding collaborator is available
pub const SIMILARITY_PLACEHOLDER: f64 = 0.5;

/// Tunable constants for the composite score and the relevance blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub relevance_weight: f64,
    pub readability_weight: f64,
    pub bundle_max: f64,
    pub judge_weight: f64,
    pub similarity_scale: f64,
    pub similarity_placeholder: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance_weight: RELEVANCE_WEIGHT,
            readability_weight: READABILITY_WEIGHT,
            bundle_max: BUNDLE_MAX,
            judge_weight: JUDGE_WEIGHT,
            similarity_scale: SIMILARITY_SCALE,
            similarity_placeholder: SIMILARITY_PLACEHOLDER,
        }
    }
}

/// Is the text substantively tied to the source data and news?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceBundle {
    pub metric_alignment: ScoredDimension,
    pub data_relevance: ScoredDimension,
    pub primer_consistency: ScoredDimension,
}

impl RelevanceBundle {
    pub fn score(scorer: &HeuristicScorer, text: &str) -> Self {
        Self {
            metric_alignment: scorer.metric_alignment(text),
            data_relevance: scorer.data_relevance(text),
            primer_consistency: scorer.primer_consistency(text),
        }
    }

    pub fn total(&self) -> u8 {
        clamped_sum([
            self.metric_alignment.score,
            self.data_relevance.score,
            self.primer_consistency.score,
        ])
    }
}

/// Is the text well organized and well written?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadabilityBundle {
    pub structure: ScoredDimension,
    pub clarity: ScoredDimension,
    pub writing_quality: ScoredDimension,
}

impl ReadabilityBundle {
    pub fn score(scorer: &HeuristicScorer, text: &str) -> Self {
        Self {
            structure: scorer.structure(text),
            clarity: scorer.clarity(text),
            writing_quality: scorer.writing_quality(text),
        }
    }

    pub fn total(&self) -> u8 {
        clamped_sum([
            self.structure.score,
            self.clarity.score,
            self.writing_quality.score,
        ])
    }
}

/// Full heuristic evaluation of one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub relevance: RelevanceBundle,
    pub readability: ReadabilityBundle,
    pub relevance_total: u8,
    pub readability_total: u8,
    pub composite_score: f64,
}

/// Combines the two bundles into totals and a weighted 0-100 score
#[derive(Debug, Clone, Default)]
pub struct CompositeAggregator {
    weights: ScoringWeights,
}

impl CompositeAggregator {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a text with the heuristic scorer and aggregate the result
    pub fn evaluate(&self, scorer: &HeuristicScorer, text: &str) -> EvaluationResult {
        self.aggregate(
            RelevanceBundle::score(scorer, text),
            ReadabilityBundle::score(scorer, text),
        )
    }

    /// Aggregate already-computed bundles
    ///
    /// Sub-scores above the dimension maximum are clamped before summing.
    pub fn aggregate(
        &self,
        relevance: RelevanceBundle,
        readability: ReadabilityBundle,
    ) -> EvaluationResult {
        let relevance_total = relevance.total();
        let readability_total = readability.total();
        let composite_score = self.composite_score(relevance_total, readability_total);

        EvaluationResult {
            relevance,
            readability,
            relevance_total,
            readability_total,
            composite_score,
        }
    }

    /// Weighted composite in [0, 100], rounded to two decimals
    pub fn composite_score(&self, relevance_total: u8, readability_total: u8) -> f64 {
        let w = &self.weights;
        if w.bundle_max <= 0.0 {
            return 0.0;
        }
        let relevance = (relevance_total as f64).min(w.bundle_max) / w.bundle_max;
        let readability = (readability_total as f64).min(w.bundle_max) / w.bundle_max;
        let weighted = (relevance * w.relevance_weight + readability * w.readability_weight) * 100.0;
        round2(weighted.clamp(0.0, 100.0))
    }
}

/// Evaluate a text with the default weights
pub fn evaluate_summary_text(text: &str) -> EvaluationResult {
    CompositeAggregator::default().evaluate(HeuristicScorer::shared(), text)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamped_sum(scores: [u8; 3]) -> u8 {
    scores.iter().map(|s| (*s).min(DIMENSION_MAX)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(score: u8) -> ScoredDimension {
        ScoredDimension::new(score, "test")
    }

    fn bundles(rel: [u8; 3], read: [u8; 3]) -> (RelevanceBundle, ReadabilityBundle) {
        (
            RelevanceBundle {
                metric_alignment: dim(rel[0]),
                data_relevance: dim(rel[1]),
                primer_consistency: dim(rel[2]),
            },
            ReadabilityBundle {
                structure: dim(read[0]),
                clarity: dim(read[1]),
                writing_quality: dim(read[2]),
            },
        )
    }

    #[test]
    fn test_composite_maximum() {
        let (rel, read) = bundles([5, 5, 5], [5, 5, 5]);
        let result = CompositeAggregator::default().aggregate(rel, read);
        assert_eq!(result.relevance_total, 15);
        assert_eq!(result.readability_total, 15);
        assert_eq!(result.composite_score, 100.0);
    }

    #[test]
    fn test_composite_floor() {
        let (rel, read) = bundles([1, 1, 1], [1, 1, 1]);
        let result = CompositeAggregator::default().aggregate(rel, read);
        assert_eq!(result.relevance_total, 3);
        assert_eq!(result.readability_total, 3);
        assert_eq!(result.composite_score, 20.0);
    }

    #[test]
    fn test_composite_weighting() {
        // relevance 15/15 * 0.6 + readability 0/15 * 0.4
        let aggregator = CompositeAggregator::default();
        assert_eq!(aggregator.composite_score(15, 0), 60.0);
        assert_eq!(aggregator.composite_score(0, 15), 40.0);
        // (9/15 * 0.6 + 11/15 * 0.4) * 100 = 36 + 29.333... = 65.33
        assert_eq!(aggregator.composite_score(9, 11), 65.33);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let (rel, read) = bundles([9, 9, 9], [0, 0, 0]);
        let result = CompositeAggregator::default().aggregate(rel, read);
        assert_eq!(result.relevance_total, 15);
        assert_eq!(result.readability_total, 0);
        assert_eq!(result.composite_score, 60.0);
    }

    #[test]
    fn test_custom_weights() {
        let aggregator = CompositeAggregator::new(ScoringWeights {
            relevance_weight: 0.5,
            readability_weight: 0.5,
            ..ScoringWeights::default()
        });
        assert_eq!(aggregator.composite_score(15, 0), 50.0);
    }

    #[test]
    fn test_evaluate_empty_text() {
        // metric 1, data 1, primer 1 | structure 1, clarity 5, writing 5
        let result = evaluate_summary_text("");
        assert_eq!(result.relevance_total, 3);
        assert_eq!(result.readability_total, 11);
        assert_eq!(result.composite_score, 41.33);
    }

    #[test]
    fn test_evaluate_well_formed_summary() {
        let text = "Quantitative Analysis: COR, COY, POR and POY all moved. \
                    Key Drivers: news flow and sentiment. Momentum was bullish early and bearish late. \
                    Correlation with the index was 80%. Summary: a 2% gain.";
        let result = evaluate_summary_text(text);
        assert_eq!(result.relevance.metric_alignment.score, 5);
        assert_eq!(result.relevance.primer_consistency.score, 5);
        assert_eq!(result.readability.structure.score, 5);
        assert!(result.composite_score >= 80.0);
        assert!(result.composite_score <= 100.0);
    }
}
