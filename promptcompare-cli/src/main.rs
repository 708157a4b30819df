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

//! Promptcompare CLI
//!
//! Scores generated financial summaries against a reference news digest and
//! prints a comparison report.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{CliConfig, EmbeddingProvider, Provider};
use promptcompare_evals::llm_client::{
    AnthropicClient, EmbeddingClient, GeminiClient, LLMClient, OpenAIClient,
};
use futures::stream::{self, StreamExt};
use promptcompare_evals::prompts::{extract_tickers, generate_summary};
use promptcompare_evals::{
    evaluate_summary_text, render_report, word_count, BatchRun, FleschReadingEase,
    LocalEmbeddingClient, MetricsOrchestrator, ReadabilityFormula, SummaryVariant,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "promptcompare")]
#[command(about = "Score and compare LLM-generated financial summaries", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate summaries against a reference digest
    Evaluate {
        /// Reference news digest
        #[arg(long)]
        reference: PathBuf,

        /// Summary to evaluate, as <label>=<file> (repeatable)
        #[arg(long = "summary", required = true, value_parser = parse_summary_arg)]
        summaries: Vec<(String, PathBuf)>,

        /// Write the batch as pretty JSON
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Write the report to a file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Generate one summary per template, then evaluate them against the news
    Generate {
        /// COR report
        #[arg(long)]
        cor: PathBuf,

        /// Primer document
        #[arg(long)]
        primer: PathBuf,

        /// News digest; also the reference for evaluation
        #[arg(long)]
        news: PathBuf,

        /// Template prompt, as <label>=<file> (repeatable)
        #[arg(long = "template", required = true, value_parser = parse_summary_arg)]
        templates: Vec<(String, PathBuf)>,

        /// Save each generated summary as <label>.txt in this directory
        #[arg(long)]
        summaries_dir: Option<PathBuf>,

        /// Write the batch as pretty JSON
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Write the report to a file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Score a text with the heuristics only (no network)
    Score {
        /// Text file to score
        file: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Extract ticker symbols from a text file
    Tickers {
        /// Text file to scan
        file: PathBuf,
    },
}

fn parse_summary_arg(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    let (label, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected <label>=<file>, got '{arg}'"))?;
    let label = label.trim();
    if label.is_empty() || path.trim().is_empty() {
        return Err(format!("expected <label>=<file>, got '{arg}'"));
    }
    Ok((label.to_string(), PathBuf::from(path.trim())))
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "promptcompare=debug,promptcompare_evals=debug"
    } else {
        "promptcompare=info,promptcompare_evals=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    init_logging(cli.verbose || config.debug);

    match cli.command {
        Commands::Evaluate {
            reference,
            summaries,
            json_out,
            report,
        } => {
            validate_config(&config)?;
            run_evaluate(&config, &reference, &summaries, json_out, report).await
        }
        Commands::Generate {
            cor,
            primer,
            news,
            templates,
            summaries_dir,
            json_out,
            report,
        } => {
            validate_config(&config)?;
            let sources = GenerationSources { cor, primer, news };
            run_generate(&config, &sources, &templates, summaries_dir, json_out, report).await
        }
        Commands::Score { file, json } => run_score(&file, json).await,
        Commands::Tickers { file } => {
            validate_config(&config)?;
            run_tickers(&config, &file).await
        }
    }
}

fn validate_config(config: &CliConfig) -> Result<()> {
    config.validate()?;
    debug!("Configuration: {:#?}", config.evaluation);
    Ok(())
}

fn build_llm_client(config: &CliConfig) -> Result<Arc<dyn LLMClient>> {
    let llm = &config.llm;
    let key = llm
        .api_key(llm.provider)
        .with_context(|| format!("No API key for {:?}", llm.provider))?
        .to_string();
    let model = llm.model().to_string();

    let client: Arc<dyn LLMClient> = match llm.provider {
        Provider::Gemini => {
            let mut client = GeminiClient::new(key, model);
            if let Some(url) = &llm.base_url {
                client = client.with_base_url(url.clone());
            }
            Arc::new(client)
        }
        Provider::OpenAI => {
            let mut client = OpenAIClient::new(key, model);
            if let Some(url) = &llm.base_url {
                client = client.with_base_url(url.clone());
            }
            Arc::new(client)
        }
        Provider::Anthropic => {
            let mut client = AnthropicClient::new(key, model);
            if let Some(url) = &llm.base_url {
                client = client.with_base_url(url.clone());
            }
            Arc::new(client)
        }
    };

    info!(provider = ?llm.provider, model = client.model_name(), "Using text-generation model");
    Ok(client)
}

fn build_embedding_client(config: &CliConfig) -> Result<Option<Arc<dyn EmbeddingClient>>> {
    let llm = &config.llm;
    let client: Option<Arc<dyn EmbeddingClient>> = match llm.embedding_provider {
        EmbeddingProvider::Gemini => {
            let key = llm
                .api_key(Provider::Gemini)
                .context("No API key for Gemini embeddings")?;
            let mut client = GeminiClient::new(key.to_string(), llm.model().to_string());
            if let Some(model) = &llm.embedding_model {
                client = client.with_embedding_model(model.clone());
            }
            Some(Arc::new(client))
        }
        EmbeddingProvider::OpenAI => {
            let key = llm
                .api_key(Provider::OpenAI)
                .context("No API key for OpenAI embeddings")?;
            let mut client = OpenAIClient::new(key.to_string(), llm.model().to_string());
            if let Some(model) = &llm.embedding_model {
                client = client.with_embedding_model(model.clone());
            }
            Some(Arc::new(client))
        }
        EmbeddingProvider::Local => Some(Arc::new(LocalEmbeddingClient::new())),
        EmbeddingProvider::None => None,
    };

    if client.is_none() {
        warn!("No embedding provider; similarity scores will be estimated");
    }
    Ok(client)
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_evaluate(
    config: &CliConfig,
    reference_path: &Path,
    summaries: &[(String, PathBuf)],
    json_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
) -> Result<()> {
    let reference = read_text(reference_path).await?;

    let mut variants = Vec::with_capacity(summaries.len());
    for (label, path) in summaries {
        variants.push(SummaryVariant::new(label.clone(), read_text(path).await?));
    }

    let llm = build_llm_client(config)?;
    evaluate_and_report(config, llm, &variants, &reference, json_out, report_out).await
}

/// Inputs every template is filled with
struct GenerationSources {
    cor: PathBuf,
    primer: PathBuf,
    news: PathBuf,
}

async fn run_generate(
    config: &CliConfig,
    sources: &GenerationSources,
    templates: &[(String, PathBuf)],
    summaries_dir: Option<PathBuf>,
    json_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
) -> Result<()> {
    let cor = read_text(&sources.cor).await?;
    let primer = read_text(&sources.primer).await?;
    let news = read_text(&sources.news).await?;

    let mut prompts = Vec::with_capacity(templates.len());
    for (label, path) in templates {
        prompts.push((label.clone(), read_text(path).await?));
    }

    let llm = build_llm_client(config)?;
    let variants = generate_variants(config, llm.as_ref(), &prompts, &cor, &primer, &news).await;
    if variants.is_empty() {
        anyhow::bail!("No summaries were generated");
    }

    if let Some(dir) = &summaries_dir {
        for variant in &variants {
            write_output(&dir.join(format!("{}.txt", variant.label)), &variant.text)?;
        }
        info!("Summaries saved to {}", dir.display());
    }

    evaluate_and_report(config, llm, &variants, &news, json_out, report_out).await
}

/// Generate a summary per template, keeping template order
///
/// A template whose generation fails is logged and left out.
async fn generate_variants(
    config: &CliConfig,
    llm: &dyn LLMClient,
    prompts: &[(String, String)],
    cor: &str,
    primer: &str,
    news: &str,
) -> Vec<SummaryVariant> {
    let policy = config.evaluation.call_policy();
    let results: Vec<_> = stream::iter(prompts.iter().map(|(label, template)| async move {
        let summary = generate_summary(llm, template, cor, primer, news, policy).await;
        (label, summary)
    }))
    .buffered(config.evaluation.max_concurrent.max(1))
    .collect()
    .await;

    let mut variants = Vec::with_capacity(results.len());
    for (label, summary) in results {
        match summary {
            Ok(text) => variants.push(SummaryVariant::new(label.clone(), text)),
            Err(e) => warn!(label = %label, error = %e, "Summary generation failed"),
        }
    }
    variants
}

async fn evaluate_and_report(
    config: &CliConfig,
    llm: Arc<dyn LLMClient>,
    variants: &[SummaryVariant],
    reference: &str,
    json_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
) -> Result<()> {
    let mut orchestrator = MetricsOrchestrator::new(llm, config.evaluation.clone());
    if let Some(embedder) = build_embedding_client(config)? {
        orchestrator = orchestrator.with_embedding_client(embedder);
    }

    let run = orchestrator.evaluate_batch(variants, reference).await;
    let report = render_report(std::slice::from_ref(&run));
    println!("{}", report);
    save_run(config, &run, &report, json_out, report_out)?;

    if run.records.is_empty() && !run.errors.is_empty() {
        anyhow::bail!("All {} summaries failed to evaluate", run.errors.len());
    }
    Ok(())
}

fn save_run(
    config: &CliConfig,
    run: &BatchRun,
    report: &str,
    json_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
) -> Result<()> {
    let json_out = json_out.or_else(|| {
        config
            .output
            .json_dir
            .as_ref()
            .map(|dir| dir.join(format!("run-{}.json", run.run_id)))
    });
    if let Some(path) = json_out {
        write_output(&path, &serde_json::to_string_pretty(run)?)?;
        info!("Records saved to {}", path.display());
    }

    if let Some(path) = report_out.or_else(|| config.output.report_path.clone()) {
        write_output(&path, report)?;
        info!("Report saved to {}", path.display());
    }
    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

async fn run_score(path: &Path, json: bool) -> Result<()> {
    let text = read_text(path).await?;
    let result = evaluate_summary_text(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let reading_level = FleschReadingEase::new().reading_ease(&text);
    println!("File: {}", path.display());
    println!("Reading Level: {}, Word Count: {}", reading_level, word_count(&text));

    let rel = &result.relevance;
    let read = &result.readability;
    for (name, dimension) in [
        ("Metric Alignment", &rel.metric_alignment),
        ("Data Relevance", &rel.data_relevance),
        ("Primer Consistency", &rel.primer_consistency),
        ("Structure", &read.structure),
        ("Clarity", &read.clarity),
        ("Writing Quality", &read.writing_quality),
    ] {
        println!("  {}: {}/5 ({})", name, dimension.score, dimension.note);
    }
    println!(
        "Relevance: {}/15, Readability: {}/15, Composite Score: {:.2}",
        result.relevance_total, result.readability_total, result.composite_score
    );
    Ok(())
}

async fn run_tickers(config: &CliConfig, path: &Path) -> Result<()> {
    let text = read_text(path).await?;
    let client = build_llm_client(config)?;

    let tickers = extract_tickers(client.as_ref(), &text, config.evaluation.call_policy())
        .await
        .context("Ticker extraction failed")?;

    if tickers.is_empty() {
        println!("No tickers found");
    }
    for ticker in tickers {
        println!("{}", ticker);
    }
    Ok(())
}
