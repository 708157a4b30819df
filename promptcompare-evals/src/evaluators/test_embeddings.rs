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

#[cfg(test)]
mod tests {
    use crate::evaluators::relevance::{SemanticRelevanceBlender, SimilaritySource};
    use crate::llm_client::{EmbedError, EmbeddingClient, LLMClient, LLMError, LLMResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MockEmbeddingClient {
        embeddings: HashMap<String, Vec<f64>>,
    }

    impl MockEmbeddingClient {
        fn new() -> Self {
            let mut embeddings = HashMap::new();
            // "rally"
            embeddings.insert("rally".to_string(), vec![1.0, 0.0]);
            // "surge" - similar to rally
            embeddings.insert("surge".to_string(), vec![0.9, 0.1]);
            // "weather" - dissimilar
            embeddings.insert("weather".to_string(), vec![0.0, 1.0]);
            // wrong dimensionality
            embeddings.insert("broken".to_string(), vec![1.0, 0.0, 0.0]);
            Self { embeddings }
        }
    }

    #[async_trait]
    impl EmbeddingClient for MockEmbeddingClient {
        async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
            self.embeddings
                .get(text)
                .cloned()
                .ok_or_else(|| EmbedError::ApiError("Text not found in mock".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, EmbedError> {
            let mut results = Vec::new();
            for text in texts {
                results.push(self.embed(text).await?);
            }
            Ok(results)
        }
    }

    struct SilentLLM;

    #[async_trait]
    impl LLMClient for SilentLLM {
        async fn generate(&self, _prompt: String) -> Result<LLMResponse, LLMError> {
            Err(LLMError::ApiError("not used".to_string()))
        }

        fn model_name(&self) -> &str {
            "silent"
        }

        fn cost_per_token(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
    }

    fn blender() -> SemanticRelevanceBlender {
        SemanticRelevanceBlender::new(Arc::new(SilentLLM))
            .with_embedding_client(Arc::new(MockEmbeddingClient::new()))
    }

    #[tokio::test]
    async fn test_semantic_similarity() {
        let blender = blender();

        // High similarity
        let high = blender.similarity("surge", "rally").await.unwrap();
        assert_eq!(high.source, SimilaritySource::Computed);
        assert!(high.value > 0.9);

        // Low similarity
        let low = blender.similarity("weather", "rally").await.unwrap();
        assert_eq!(low.source, SimilaritySource::Computed);
        assert!(low.value.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_similarity_dimension_mismatch() {
        let err = blender().similarity("broken", "rally").await.unwrap_err();
        assert!(matches!(err, EmbedError::DimensionMismatch { left: 3, right: 2 }));
    }

    #[tokio::test]
    async fn test_similarity_embedder_failure() {
        let err = blender().similarity("unknown", "rally").await.unwrap_err();
        assert!(matches!(err, EmbedError::ApiError(_)));
    }
}
