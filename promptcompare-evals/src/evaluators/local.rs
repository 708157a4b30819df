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

//! Offline embeddings
//!
//! Lets the similarity stage run without an embedding API. Vectors are hashed
//! bag-of-words counts, so they capture lexical overlap rather than meaning.

use crate::llm_client::{EmbedError, EmbeddingClient};
use async_trait::async_trait;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Standard size for small sentence-embedding models
pub const LOCAL_EMBEDDING_DIM: usize = 384;

/// Deterministic embedding client that needs no network access
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets; the count vector is then L2-normalized. Text without any token
/// embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct LocalEmbeddingClient {
    dimensions: usize,
}

impl LocalEmbeddingClient {
    pub fn new() -> Self {
        Self {
            dimensions: LOCAL_EMBEDDING_DIM,
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.dimensions];

        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            vec[self.bucket(&token)] += 1.0;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        vec
    }
}

impl Default for LocalEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for LocalEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
