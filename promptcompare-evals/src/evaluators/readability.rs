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

//! Readability statistics

use super::composite::round2;

/// A readability formula: a pure function of the text
pub trait ReadabilityFormula: Send + Sync {
    /// Short identifier recorded alongside the score
    fn name(&self) -> &str;

    fn reading_ease(&self, text: &str) -> f64;
}

/// Flesch Reading Ease
///
/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`,
/// rounded to two decimals. Higher is easier; plain English lands around
/// 60-70 and dense financial prose often below 30. Empty text scores 0.0.
///
/// Syllables come from a vowel-group heuristic (a silent final "e" is
/// dropped, every word has at least one), so scores track dictionary-based
/// implementations closely but not exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FleschReadingEase;

impl FleschReadingEase {
    pub fn new() -> Self {
        Self
    }
}

impl ReadabilityFormula for FleschReadingEase {
    fn name(&self) -> &str {
        "flesch_reading_ease"
    }

    fn reading_ease(&self, text: &str) -> f64 {
        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .collect();
        if words.is_empty() {
            return 0.0;
        }

        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| s.chars().any(char::is_alphanumeric))
            .count()
            .max(1);
        let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

        let word_count = words.len() as f64;
        let score = 206.835
            - 1.015 * (word_count / sentences as f64)
            - 84.6 * (syllables as f64 / word_count);
        round2(score)
    }
}

/// Whitespace-delimited token count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if letters.is_empty() {
        // numbers and symbols read as one unit
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            groups += 1;
        }
        previous_vowel = vowel;
    }

    let n = letters.len();
    let silent_e = n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && !is_vowel(letters[n - 2]);
    if silent_e && groups > 1 {
        groups -= 1;
    }
    groups.max(1)
}
