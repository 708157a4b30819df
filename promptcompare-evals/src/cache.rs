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

//! Caching layer for embeddings
//!
//! Every prompt variant in a batch is compared against the same reference
//! digest, so the reference is embedded once and served from the cache after.
//! Concurrent requests for the same text share a single upstream call.

use crate::llm_client::{EmbedError, EmbeddingClient};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use twox_hash::XxHash64;

/// Embedding client decorator backed by a TTL cache
pub struct CachedEmbeddingClient {
    inner: Arc<dyn EmbeddingClient>,
    cache: Cache<u64, Arc<Vec<f64>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbeddingClient {
    /// Create a new cache with specified TTL in seconds
    pub fn new(inner: Arc<dyn EmbeddingClient>, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn compute_key(text: &str) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(text.as_bytes());
        hasher.finish()
    }

    /// Hit/miss counters since construction
    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.cache.entry_count(),
        )
    }
}

#[async_trait]
impl EmbeddingClient for CachedEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        let key = Self::compute_key(text);
        let entry = self
            .cache
            .entry(key)
            .or_try_insert_with(async { self.inner.embed(text).await.map(Arc::new) })
            .await
            // Waiters on the same key share one error; the cache may still hold it.
            .map_err(|shared| shared.to_owned_kind())?;

        if entry.is_fresh() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(entry.into_value().as_ref().clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
        futures::future::try_join_all(texts.iter().map(|text| self.embed(text))).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entry_count: u64,
}

impl CacheStats {
    fn new(hits: u64, misses: u64, entry_count: u64) -> Self {
        let lookups = hits + misses;
        let hit_rate = match lookups {
            0 => 0.0,
            n => hits as f64 / n as f64,
        };
        Self {
            hits,
            misses,
            hit_rate,
            entry_count,
        }
    }
}
