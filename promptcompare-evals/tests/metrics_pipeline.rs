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

// End-to-end tests for batch evaluation

use async_trait::async_trait;
use promptcompare_evals::llm_client::{GeminiClient, LLMClient, LLMError, LLMResponse, TokenUsage};
use promptcompare_evals::{
    render_report, EvalConfig, FailurePolicy, LocalEmbeddingClient, MetricsOrchestrator, Stage,
    SimilaritySource, SummaryVariant,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NEWS: &str = "Apple shares rallied 3% after earnings beat. Analysts cite strong iPhone \
                    sentiment and a positive correlation with the Nasdaq.";

const STRUCTURED: &str = "Quantitative Analysis: COR and COY rose while POR and POY held. \
                          Key Drivers: earnings news and bullish sentiment. \
                          Summary: a 3% gain for Apple.";

/// Judges by keyword: texts mentioning "Apple" score high, "broken" gets no marker
struct KeywordJudge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl KeywordJudge {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LLMClient for KeywordJudge {
    async fn generate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let summary = prompt
            .split("Summary:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nNews Articles:").next())
            .unwrap_or_default();
        let content = if summary.contains("broken") {
            "I cannot rate this.".to_string()
        } else if summary.contains("Apple") {
            "Justification:\n- Discusses Apple earnings\n\nScore: 9".to_string()
        } else {
            "Justification:\n- Off topic\n\nScore: 2".to_string()
        };

        Ok(LLMResponse {
            content,
            usage: TokenUsage::default(),
            model: "keyword-judge".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "keyword-judge"
    }

    fn cost_per_token(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

fn variants() -> Vec<SummaryVariant> {
    vec![
        SummaryVariant::new("structured", STRUCTURED),
        SummaryVariant::new("offtopic", "The weather was mild across the region."),
        SummaryVariant::new("broken", "broken output"),
        SummaryVariant::new("plain", "Apple stock went up after earnings."),
    ]
}

#[tokio::test]
async fn test_batch_strict_isolates_failures() {
    let judge = Arc::new(KeywordJudge::new());
    let config = EvalConfig {
        max_concurrent: 2,
        ..EvalConfig::default()
    };
    let orchestrator = MetricsOrchestrator::new(judge.clone(), config)
        .with_embedding_client(Arc::new(LocalEmbeddingClient::new()));

    let run = orchestrator.evaluate_batch(&variants(), NEWS).await;

    let labels: Vec<&str> = run.records.iter().map(|r| r.summary_type.as_str()).collect();
    assert_eq!(labels, vec!["structured", "offtopic", "plain"]);
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].label, "broken");
    assert_eq!(run.errors[0].stage, Some(Stage::ModelJudgement));

    assert!(judge.peak.load(Ordering::SeqCst) <= 2);

    let structured = &run.records[0];
    assert_eq!(structured.llm_relevance_score, 9.0);
    assert_eq!(structured.similarity_source, SimilaritySource::Computed);
    assert!(structured.cosine_similarity_score > 0.0);
    assert!(structured.evaluation.composite_score > run.records[1].evaluation.composite_score);

    // four summaries plus the shared reference, which is embedded once
    let stats = orchestrator.cache_stats().unwrap();
    assert_eq!(stats.misses, 5);
    assert_eq!(stats.hits, 3);
}

#[tokio::test]
async fn test_batch_degrade_keeps_every_variant() {
    let config = EvalConfig {
        failure_policy: FailurePolicy::Degrade,
        ..EvalConfig::default()
    };
    let orchestrator = MetricsOrchestrator::new(Arc::new(KeywordJudge::new()), config);

    let run = orchestrator.evaluate_batch(&variants(), NEWS).await;
    assert_eq!(run.records.len(), 4);
    assert!(run.errors.is_empty());

    let broken = &run.records[2];
    assert!(broken.is_degraded());
    assert!(!broken.judgement_status.is_judged());
    assert_eq!(broken.similarity_source, SimilaritySource::Estimated);

    let report = render_report(&[run]);
    assert!(report.contains("Summary broken:"));
    assert!(report.contains("[judgement failed] [similarity estimated]"));
}

#[tokio::test]
async fn test_gemini_backed_evaluation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro-latest:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates": [{"content": {"parts": [{"text": "Justification:\n- Relevant\n\nScore: 8"}]}}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let client = Arc::new(
        GeminiClient::new("test-key".to_string(), "gemini-pro-latest".to_string())
            .with_base_url(server.url()),
    );
    let orchestrator = MetricsOrchestrator::new(client, EvalConfig::default());

    let record = orchestrator
        .evaluate(STRUCTURED, NEWS, "structured")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.relevance_justification, "- Relevant");
    assert!((record.final_relevance_score - 6.8).abs() < 1e-9);
    assert_eq!(record.flatten()["final_relevance_score"], record.final_relevance_score);
}

#[tokio::test]
async fn test_gemini_outage_is_retried_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro-latest:generateContent")
        .with_status(429)
        .with_body("quota")
        .expect(2)
        .create_async()
        .await;

    let client = Arc::new(
        GeminiClient::new("test-key".to_string(), "gemini-pro-latest".to_string())
            .with_base_url(server.url()),
    );
    let orchestrator = MetricsOrchestrator::new(client, EvalConfig::default());

    let err = orchestrator
        .evaluate(STRUCTURED, NEWS, "structured")
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.failed_stage(), Some(Stage::ModelJudgement));
}
