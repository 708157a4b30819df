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

//! Pattern-based heuristics for summary quality
//!
//! Six independent dimensions, each a pure function of the text:
//!
//! | Dimension          | Signal                                              | Reachable scores |
//! |--------------------|-----------------------------------------------------|------------------|
//! | Metric alignment   | distinct PPCC metric abbreviations (whole word)     | 1, 3, 5          |
//! | Data relevance     | total `%`, news, sentiment, ... occurrences         | 1, 3, 4, 5       |
//! | Primer consistency | bullish and bearish vocabulary                      | 1, 3, 5          |
//! | Structure          | distinct section headers (whole phrase)             | 1, 3, 4, 5       |
//! | Clarity            | average words per `.`/`!`/`?` segment               | 1, 3, 4, 5       |
//! | Writing quality    | immediate word repetitions ("the the", ...)         | 2, 4, 5          |
//!
//! All matching is case-insensitive. No function fails for any input,
//! including the empty string.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Highest score any single dimension can reach
pub const DIMENSION_MAX: u8 = 5;

/// A score plus the human-readable justification for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredDimension {
    pub score: u8,
    pub note: String,
}

impl ScoredDimension {
    pub fn new(score: u8, note: impl Into<String>) -> Self {
        Self {
            score,
            note: note.into(),
        }
    }
}

/// Options-report metric abbreviations
const METRIC_TERMS: [&str; 4] = ["COR", "COY", "POR", "POY"];

const SECTION_HEADERS: [&str; 6] = [
    "Quantitative Analysis",
    "Key Drivers",
    "Momentum",
    "Sentiment",
    "Correlation",
    "Summary",
];

const DATA_MARKERS: &str = r"(?i)%|\b(?:news|correlation|sentiment|net change|article)\b";
const BULLISH_TERMS: &str = r"(?i)bullish|positive|optimistic";
const BEARISH_TERMS: &str = r"(?i)bearish|negative|pessimistic";
const REPEATED_WORDS: &str = r"(?i)\b(?:the the|and and|of of|to to)\b";

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Compiled patterns for the six heuristic dimensions
///
/// Construction compiles every pattern once; scoring never allocates a regex.
/// Use [`HeuristicScorer::shared`] unless a private instance is needed.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    metric_terms: Vec<Regex>,
    section_headers: Vec<Regex>,
    data_markers: Regex,
    bullish: Regex,
    bearish: Regex,
    repeated_words: Regex,
}

impl HeuristicScorer {
    pub fn new() -> Self {
        Self {
            metric_terms: METRIC_TERMS.iter().map(|t| whole_word(t)).collect(),
            section_headers: SECTION_HEADERS.iter().map(|t| whole_word(t)).collect(),
            data_markers: compile(DATA_MARKERS),
            bullish: compile(BULLISH_TERMS),
            bearish: compile(BEARISH_TERMS),
            repeated_words: compile(REPEATED_WORDS),
        }
    }

    /// Process-wide instance, built on first use
    pub fn shared() -> &'static HeuristicScorer {
        static SHARED: OnceLock<HeuristicScorer> = OnceLock::new();
        SHARED.get_or_init(HeuristicScorer::new)
    }

    /// Are the PPCC metrics used consistently?
    pub fn metric_alignment(&self, text: &str) -> ScoredDimension {
        match count_distinct(&self.metric_terms, text) {
            4 => ScoredDimension::new(5, "All PPCC metrics used consistently."),
            2 | 3 => ScoredDimension::new(
                3,
                "Partial metric coverage (some PPCC metrics missing).",
            ),
            _ => ScoredDimension::new(1, "Few or no PPCC metrics found."),
        }
    }

    /// Are stock movements supported by quantitative or news-based data?
    pub fn data_relevance(&self, text: &str) -> ScoredDimension {
        let count = self.data_markers.find_iter(text).count();
        if count >= 10 {
            ScoredDimension::new(5, "Strong quantitative and news-based justification.")
        } else if count >= 5 {
            ScoredDimension::new(4, "Moderate coverage of data-driven explanations.")
        } else if count >= 3 {
            ScoredDimension::new(3, "Partial data context present.")
        } else {
            ScoredDimension::new(1, "Weak or missing data-based explanations.")
        }
    }

    /// Is there bullish and bearish context alongside the metrics?
    pub fn primer_consistency(&self, text: &str) -> ScoredDimension {
        let bullish = self.bullish.is_match(text);
        let bearish = self.bearish.is_match(text);
        match (bullish, bearish) {
            (true, true) => ScoredDimension::new(5, "Consistent bullish/bearish context detected."),
            (true, false) | (false, true) => ScoredDimension::new(3, "Partial sentiment linkage."),
            (false, false) => ScoredDimension::new(1, "No clear sentiment alignment found."),
        }
    }

    /// Clear organization into the expected sections
    pub fn structure(&self, text: &str) -> ScoredDimension {
        let found = count_distinct(&self.section_headers, text);
        if found >= 5 {
            ScoredDimension::new(5, "Excellent structure with clear sections.")
        } else if found >= 3 {
            ScoredDimension::new(4, "Mostly well-structured.")
        } else if found >= 2 {
            ScoredDimension::new(3, "Some structure detected.")
        } else {
            ScoredDimension::new(1, "Unstructured text.")
        }
    }

    /// Clarity and accessibility, from average segment length
    pub fn clarity(&self, text: &str) -> ScoredDimension {
        let avg = average_segment_length(text);
        if avg < 22.0 {
            ScoredDimension::new(5, "Clear and concise language.")
        } else if avg < 28.0 {
            ScoredDimension::new(4, "Readable with minor complexity.")
        } else if avg < 35.0 {
            ScoredDimension::new(3, "Dense but understandable.")
        } else {
            ScoredDimension::new(1, "Verbose or unclear writing.")
        }
    }

    /// Writing tone and redundancy
    ///
    /// Only 5, 4 and 2 are reachable. Composite ranges downstream depend on
    /// this banding, so it is kept as is.
    pub fn writing_quality(&self, text: &str) -> ScoredDimension {
        let redundancy = self.repeated_words.find_iter(text).count();
        if redundancy == 0 {
            ScoredDimension::new(5, "Strong and consistent writing quality.")
        } else if redundancy < 3 {
            ScoredDimension::new(4, "Minor redundancies.")
        } else {
            ScoredDimension::new(2, "Frequent repetition or inconsistencies.")
        }
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn score_metric_alignment(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().metric_alignment(text)
}

pub fn score_data_relevance(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().data_relevance(text)
}

pub fn score_primer_consistency(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().primer_consistency(text)
}

pub fn score_structure(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().structure(text)
}

pub fn score_clarity(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().clarity(text)
}

pub fn score_writing_quality(text: &str) -> ScoredDimension {
    HeuristicScorer::shared().writing_quality(text)
}

/// Average word count per sentence segment.
///
/// The denominator is every segment produced by splitting on `.`, `!` and
/// `?`, empty ones included, so "Stocks rose." averages over two segments.
fn average_segment_length(text: &str) -> f64 {
    let segments: Vec<&str> = text.split(SENTENCE_TERMINATORS).collect();
    let words: usize = segments
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.split_whitespace().count())
        .sum();
    words as f64 / segments.len().max(1) as f64
}

fn count_distinct(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|p| p.is_match(text)).count()
}

fn whole_word(term: &str) -> Regex {
    compile(&format!(r"(?i)\b{}\b", regex::escape(term)))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex pattern")
}
