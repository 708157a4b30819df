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

//! Scoring components for generated summaries

pub mod composite;
pub mod heuristics;
pub mod local;
pub mod readability;
pub mod relevance;

#[cfg(test)]
mod test_embeddings;

pub use composite::{CompositeAggregator, EvaluationResult, ScoringWeights};
pub use heuristics::{HeuristicScorer, ScoredDimension};
pub use local::LocalEmbeddingClient;
pub use readability::{FleschReadingEase, ReadabilityFormula};
pub use relevance::{Judgement, SemanticRelevanceBlender, SimilarityScore};
