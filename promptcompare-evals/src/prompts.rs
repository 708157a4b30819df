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

//! Prompt contracts for the text-generation collaborator

use crate::llm_client::{CallPolicy, LLMClient, LLMError};
use tracing::debug;

/// Prompt for the model-judged relevance score
///
/// The response must be a bulleted justification followed by a line that
/// starts with `Score:` and a number from 1 to 10.
pub fn relevance_judgement_prompt(summary: &str, reference: &str) -> String {
    format!(
        "First, provide a brief, bulleted justification explaining why the summary is relevant \
         to the news articles. Then, provide a relevance score from 1 to 10. Format your response \
         as: \n\nJustification:\n- [Justification point 1]\n- [Justification point 2]\n\n\
         Score: [score] \n\nSummary:\n{summary}\n\nNews Articles:\n{reference}"
    )
}

pub fn ticker_extraction_prompt(text: &str) -> String {
    format!(
        "Extract the stock ticker symbols from this text. Return them as a comma-separated list: {text}"
    )
}

/// Parse a comma-separated ticker list
///
/// Items are trimmed, empties dropped and duplicates removed, keeping the
/// first occurrence.
pub fn parse_ticker_list(response: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for item in response.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tickers.iter().any(|t| t == item) {
            tickers.push(item.to_string());
        }
    }
    tickers
}

/// Prompt that asks for one candidate summary under a given template
pub fn summary_generation_prompt(template: &str, report: &str, primer: &str, news: &str) -> String {
    format!(
        "{template}\n\nCOR Content:\n{report}\n\nPrimer Content:\n{primer}\n\nNews Summary:\n{news}"
    )
}

/// Generate one candidate summary from a template prompt
///
/// An empty completion is rejected so it never reaches the scorers.
pub async fn generate_summary(
    llm_client: &dyn LLMClient,
    template: &str,
    report: &str,
    primer: &str,
    news: &str,
    policy: CallPolicy,
) -> Result<String, LLMError> {
    let prompt = summary_generation_prompt(template, report, primer, news);
    let response = policy
        .run("summary_generation", || llm_client.generate(prompt.clone()))
        .await?;

    if response.content.trim().is_empty() {
        return Err(LLMError::InvalidResponse("Empty summary".to_string()));
    }
    debug!(
        words = response.content.split_whitespace().count(),
        model = %response.model,
        "Generated summary"
    );
    Ok(response.content)
}

/// Ask the collaborator for the ticker symbols mentioned in `text`
pub async fn extract_tickers(
    llm_client: &dyn LLMClient,
    text: &str,
    policy: CallPolicy,
) -> Result<Vec<String>, LLMError> {
    let prompt = ticker_extraction_prompt(text);
    let response = policy
        .run("ticker_extraction", || llm_client.generate(prompt.clone()))
        .await?;

    let tickers = parse_ticker_list(&response.content);
    debug!(count = tickers.len(), model = %response.model, "Extracted tickers");
    Ok(tickers)
}
