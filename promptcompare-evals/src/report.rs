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

//! Plain-text comparison report

use crate::evaluators::heuristics::ScoredDimension;
use crate::evaluators::relevance::SimilaritySource;
use crate::metrics::{BatchRun, MetricsRecord};
use std::fmt::Write;

/// Render runs, most recent first as given, into a plain-text report
pub fn render_report(runs: &[BatchRun]) -> String {
    let mut report = format!("--- LATEST {} RUNS ---\n\n", runs.len());

    for run in runs {
        let _ = writeln!(
            report,
            "Run ID: {}, Date: {}",
            run.run_id,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        for record in &run.records {
            render_record(&mut report, record);
        }
        for error in &run.errors {
            let stage = error.stage.map(|s| s.as_str()).unwrap_or("unknown");
            let _ = writeln!(
                report,
                "  - Summary {}: FAILED at {} stage: {}",
                error.label, stage, error.message
            );
        }
        report.push('\n');
    }

    report
}

fn render_record(report: &mut String, record: &MetricsRecord) {
    let mut markers = String::new();
    if !record.judgement_status.is_judged() {
        markers.push_str(" [judgement failed]");
    }
    if record.similarity_source == SimilaritySource::Estimated {
        markers.push_str(" [similarity estimated]");
    }

    let _ = writeln!(
        report,
        "  - Summary {}: Reading Level={}, Word Count={}, Final Relevance={:.2}, Composite Score={:.2}{}",
        record.summary_type,
        record.reading_level,
        record.word_count,
        record.final_relevance_score,
        record.evaluation.composite_score,
        markers
    );
    let _ = writeln!(
        report,
        "    LLM Justification: {}",
        record.relevance_justification
    );
    let _ = writeln!(
        report,
        "    LLM Score: {}, Cosine Similarity: {}",
        record.llm_relevance_score, record.cosine_similarity_score
    );

    let rel = &record.evaluation.relevance;
    let read = &record.evaluation.readability;
    dimension_line(report, "Metric Alignment", &rel.metric_alignment);
    dimension_line(report, "Data Relevance", &rel.data_relevance);
    dimension_line(report, "Primer Consistency", &rel.primer_consistency);
    dimension_line(report, "Structure", &read.structure);
    dimension_line(report, "Clarity", &read.clarity);
    dimension_line(report, "Writing Quality", &read.writing_quality);
}

fn dimension_line(report: &mut String, name: &str, dimension: &ScoredDimension) {
    let _ = writeln!(report, "    {}: {}/5 ({})", name, dimension.score, dimension.note);
}
