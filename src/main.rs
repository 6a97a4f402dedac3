use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chirality_core::clients::OpenAiBackend;
use chirality_core::config::{Config, RuntimeConfig};
use chirality_core::engine::GenerationEngine;
use chirality_core::rag::{CorpusRetriever, HttpRetriever, NoRetriever, Retriever};
use chirality_core::rounds::{RoundOptions, produce_bounded, run_rounds};
use chirality_core::synthesis::{diff_w, synthesize_u};
use chirality_core::{DocKind, Finals, Orchestrator, Problem};

#[derive(Parser)]
#[command(name = "chirality")]
#[command(about = "Evidence-grounded structured document generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run generation rounds over the primary documents
    Run {
        /// Problem file (JSON or TOML)
        #[arg(long)]
        problem: PathBuf,
        /// Finals from an earlier run (JSON)
        #[arg(long)]
        finals: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        rounds: u32,
        /// Local evidence corpus, used when no retrieval URL is configured
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Keep going after a Closed round
        #[arg(long)]
        no_stop: bool,
    },
    /// Produce a single document
    Produce {
        /// Document kind (DS, SP, X, Z, M, W, U, N)
        #[arg(long)]
        kind: DocKind,
        #[arg(long)]
        problem: PathBuf,
        #[arg(long)]
        finals: Option<PathBuf>,
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Field-level diff between two document payloads
    Diff { prev: PathBuf, next: PathBuf },
    /// Convergence verdict for a round
    Converge {
        #[arg(long)]
        round: u32,
        #[arg(long)]
        finals: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    chirality_core::load_env();

    let runtime = RuntimeConfig::load_from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&runtime.log_level))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            problem,
            finals,
            rounds,
            corpus,
            no_stop,
        } => {
            let config = Config::load()?;
            let problem: Problem = read_file(&problem)?;
            let finals = load_finals(finals.as_deref())?;
            let orchestrator = build_orchestrator(&config, corpus.as_deref())?;
            let options = RoundOptions {
                max_rounds: rounds,
                produce_timeout: Duration::from_millis(config.runtime.produce_timeout_ms),
                stop_on_closed: !no_stop,
            };
            info!("Running up to {} rounds for '{}'", rounds, problem.title);
            let report = run_rounds(&orchestrator, &problem, finals, &options).await;
            print_json(&report)?;
        }
        Commands::Produce {
            kind,
            problem,
            finals,
            corpus,
        } => {
            let config = Config::load()?;
            let problem: Problem = read_file(&problem)?;
            let finals = load_finals(finals.as_deref())?;
            let orchestrator = build_orchestrator(&config, corpus.as_deref())?;
            let timeout = Duration::from_millis(config.runtime.produce_timeout_ms);
            let triple = produce_bounded(&orchestrator, kind, &problem, &finals, timeout).await;
            print_json(&triple)?;
        }
        Commands::Diff { prev, next } => {
            let prev: Value = read_file(&prev)?;
            let next: Value = read_file(&next)?;
            print_json(&diff_w(&prev, &next))?;
        }
        Commands::Converge { round, finals } => {
            let finals: Finals = read_file(&finals)?;
            print_json(&synthesize_u(round, &finals))?;
        }
    }

    Ok(())
}

fn build_orchestrator(config: &Config, corpus: Option<&Path>) -> Result<Orchestrator> {
    let backend = OpenAiBackend::new(&config.generation, config.runtime.api_key.clone())
        .context("build generation backend")?;
    let engine = GenerationEngine::from_config(Arc::new(backend), &config.generation);

    let retriever: Arc<dyn Retriever> = match (&config.retrieval.url, corpus) {
        (Some(url), _) => Arc::new(HttpRetriever::new(url, config.retrieval.timeout_ms)?),
        (None, Some(path)) => {
            let corpus = CorpusRetriever::from_path(path)
                .with_context(|| format!("load corpus {}", path.display()))?
                .with_min_score(config.retrieval.min_score);
            info!("Loaded {} evidence snippets from corpus", corpus.len());
            Arc::new(corpus)
        }
        (None, None) => Arc::new(NoRetriever),
    };

    Ok(Orchestrator::new(retriever, engine, config.retrieval.top_k)
        .with_snippet_max_chars(config.retrieval.snippet_max_chars))
}

fn load_finals(path: Option<&Path>) -> Result<Finals> {
    match path {
        Some(p) => read_file(p),
        None => Ok(Finals::default()),
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let parsed = if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str(&content).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?
    };
    Ok(parsed)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
