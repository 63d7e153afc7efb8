use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use docqa_ai::embeddings::ollama_embed::OllamaEmbedder;
use docqa_ai::index::SqliteIndex;
use docqa_ai::llm::ollama_llm::OllamaLlm;
use docqa_ai::llm::openai_compat::OpenAiCompatLlm;
use docqa_ai::llm::Llm;
use docqa_ai::ollama::OllamaClient;
use docqa_ai::pipeline::{answer_question, build_index, IndexBuildInput, QueryInput};
use docqa_core::config::{AppConfig, LlmProvider};
use docqa_core::demo::sample_evaluation_input;
use docqa_core::error::AppError;
use docqa_core::eval::{evaluate, EvaluationInput};
use docqa_core::metrics::append_metrics_csv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "docqa=info,docqa_cli=info,docqa_ai=info,docqa_core=info";

#[derive(Debug, Parser)]
#[command(name = "docqa", version)]
#[command(about = "Index a document, answer questions over it, and grade the answers")]
pub struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chunk a text file, embed the chunks and store them in the vector index.
    BuildIndex(BuildIndexArgs),
    /// Answer a question from the indexed chunks.
    Query(QueryArgs),
    /// Grade a saved query outcome, or the built-in sample.
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args)]
pub struct BuildIndexArgs {
    #[arg(long, short = 'i')]
    pub input: PathBuf,
    #[arg(long, short = 'p')]
    pub persist_dir: Option<PathBuf>,
    #[arg(long, short = 'c')]
    pub collection: Option<String>,
    /// Embedding model served by the local Ollama.
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub approx_chars: Option<usize>,
    #[arg(long)]
    pub overlap_chars: Option<usize>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Prompted for on stdin when omitted.
    #[arg(long, short = 'q')]
    pub question: Option<String>,
    #[arg(long, short = 'p')]
    pub persist_dir: Option<PathBuf>,
    #[arg(long, short = 'c')]
    pub collection: Option<String>,
    #[arg(long)]
    pub k: Option<usize>,
    #[arg(long)]
    pub no_evaluate: bool,
    /// Also save the outcome JSON here (readable by `evaluate --input`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    #[arg(long, short = 'i', conflicts_with = "demo", required_unless_present = "demo")]
    pub input: Option<PathBuf>,
    #[arg(long)]
    pub demo: bool,
}

impl BuildIndexArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.persist_dir {
            config.index.persist_dir = dir.clone();
        }
        if let Some(c) = &self.collection {
            config.index.collection = c.clone();
        }
        if let Some(m) = &self.model {
            config.embeddings.model = m.clone();
        }
        if let Some(n) = self.approx_chars {
            config.chunking.approx_chars = n;
        }
        if let Some(n) = self.overlap_chars {
            config.chunking.overlap_chars = n;
        }
    }
}

impl QueryArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.persist_dir {
            config.index.persist_dir = dir.clone();
        }
        if let Some(c) = &self.collection {
            config.index.collection = c.clone();
        }
        if let Some(k) = self.k {
            config.index.top_k = k;
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    // Logs go to stderr; stdout carries JSON only.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::BuildIndex(args) => {
            args.apply(&mut config);
            config.validate()?;
            cmd_build_index(&config, &args.input, &mut out)
        }
        Command::Query(args) => {
            args.apply(&mut config);
            config.validate()?;
            cmd_query(&config, &args, &mut out)
        }
        Command::Evaluate(args) => cmd_evaluate(&args, &mut out),
    }
}

fn write_json<T: serde::Serialize>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode JSON output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

fn ollama_client(config: &AppConfig) -> Result<OllamaClient, AppError> {
    let client = OllamaClient::new(&config.embeddings.base_url)?;
    client.health_check()?;
    Ok(client)
}

fn make_llm(config: &AppConfig, ollama: &OllamaClient) -> Result<Box<dyn Llm>, AppError> {
    let llm = &config.llm;
    match llm.provider {
        LlmProvider::OpenaiCompat => {
            let key = llm.api_key().ok_or_else(|| {
                AppError::new("LLM_API_KEY_MISSING", "API key environment variable is not set")
                    .with_details(format!("env={}", llm.api_key_env))
            })?;
            Ok(Box::new(OpenAiCompatLlm::new(llm, key)?))
        }
        // Generation shares the local Ollama used for embeddings.
        LlmProvider::Ollama => Ok(Box::new(OllamaLlm::new(
            ollama.clone(),
            llm.model.clone(),
            llm.temperature,
            llm.max_output_tokens,
        ))),
    }
}

pub fn cmd_build_index(
    config: &AppConfig,
    input: &Path,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let client = ollama_client(config)?;
    let embedder = OllamaEmbedder::new(client);
    let mut index = SqliteIndex::open(&config.index.persist_dir)?;
    let manifest = build_index(
        &mut index,
        &embedder,
        IndexBuildInput {
            input_path: input.to_path_buf(),
            persist_dir: config.index.persist_dir.clone(),
            collection_name: config.index.collection.clone(),
            model: config.embeddings.model.clone(),
            approx_chars: config.chunking.approx_chars,
            overlap_chars: config.chunking.overlap_chars,
            batch_size: config.embeddings.batch_size,
            min_chunks: config.chunking.min_chunks,
        },
    )?;
    tracing::info!(
        n_chunks = manifest.n_chunks,
        persist_dir = %config.index.persist_dir.display(),
        "index build complete"
    );
    write_json(out, &manifest)
}

fn prompt_question() -> anyhow::Result<String> {
    eprint!("Enter your question: ");
    io::stderr().flush().context("failed to flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read question from stdin")?;
    Ok(line.trim().to_string())
}

pub fn cmd_query(config: &AppConfig, args: &QueryArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let question = match args.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => prompt_question()?,
    };
    if question.is_empty() {
        eprintln!("No question provided. Exiting.");
        return Ok(());
    }

    let index = SqliteIndex::open_existing(&config.index.persist_dir)?;
    let client = ollama_client(config)?;
    let llm = make_llm(config, &client)?;
    let embedder = OllamaEmbedder::new(client);

    let outcome = answer_question(
        &index,
        &embedder,
        llm.as_ref(),
        &config.llm.pricing,
        QueryInput {
            question,
            collection_name: config.index.collection.clone(),
            embed_model: config.embeddings.model.clone(),
            top_k: config.index.top_k,
        },
    )?;
    tracing::info!(
        latency_ms = %outcome.metrics.latency_ms,
        tokens_total = outcome.metrics.tokens_total,
        "request metrics"
    );
    append_metrics_csv(&config.metrics.csv_path, &outcome.metrics)?;

    write_json(out, &outcome)?;
    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&outcome).context("failed to encode outcome")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write outcome to {}", path.display()))?;
    }

    if !args.no_evaluate {
        let result = evaluate(
            &outcome.user_question,
            &outcome.system_answer,
            &outcome.chunks_related,
        );
        tracing::info!(final_score = result.final_score, "answer evaluated");
        write_json(out, &result)?;
    }
    Ok(())
}

fn read_evaluation_input(path: &Path) -> Result<EvaluationInput, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::at_path("INPUT_READ_FAILED", "Failed to read evaluation input", path, e)
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::at_path("INPUT_INVALID", "Evaluation input is not valid JSON", path, e)
    })
}

pub fn cmd_evaluate(args: &EvaluateArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let input = match &args.input {
        Some(path) if !args.demo => read_evaluation_input(path)?,
        _ => sample_evaluation_input(),
    };
    let result = input.evaluate();
    write_json(out, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[test]
    fn flags_override_config_values() {
        let cli = parse(&[
            "docqa",
            "build-index",
            "--input",
            "faq.txt",
            "--persist-dir",
            "/tmp/store",
            "--collection",
            "benefits",
            "--approx-chars",
            "400",
        ]);
        let Command::BuildIndex(args) = cli.command else {
            panic!("expected build-index");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.index.persist_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.index.collection, "benefits");
        assert_eq!(config.chunking.approx_chars, 400);
        assert_eq!(config.chunking.overlap_chars, 200);
        assert_eq!(config.embeddings.model, "nomic-embed-text");
    }

    #[test]
    fn query_flags_parse() {
        let cli = parse(&[
            "docqa",
            "--config",
            "docqa.toml",
            "query",
            "-q",
            "What is the notice period?",
            "--k",
            "3",
            "--no-evaluate",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("docqa.toml")));
        let Command::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.question.as_deref(), Some("What is the notice period?"));
        assert!(args.no_evaluate);
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.index.top_k, 3);
    }

    #[test]
    fn evaluate_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["docqa", "evaluate"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "evaluate", "--demo", "--input", "x.json"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "evaluate", "--demo"]).is_ok());
    }

    #[test]
    fn evaluate_demo_prints_result_json() {
        let mut buf = Vec::new();
        cmd_evaluate(
            &EvaluateArgs {
                input: None,
                demo: true,
            },
            &mut buf,
        )
        .expect("evaluate");
        let v: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(v["final_score"], 6.5);
        assert_eq!(v["components"]["citation_score"], 2.0);
    }

    #[test]
    fn evaluate_reads_saved_outcome_with_nulls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outcome.json");
        fs::write(
            &path,
            r#"{
              "user_question": "How long is probation?",
              "system_answer": null,
              "chunks_related": [{ "document": "Probation lasts ninety days.", "metadata": null }],
              "metrics": { "ignored": true }
            }"#,
        )
        .expect("write");

        let mut buf = Vec::new();
        cmd_evaluate(
            &EvaluateArgs {
                input: Some(path),
                demo: false,
            },
            &mut buf,
        )
        .expect("evaluate");
        let v: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(v["final_score"], 0.0);
        assert_eq!(v["metadata"]["sentences"], 0);
    }

    #[test]
    fn evaluate_reports_unreadable_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");
        let err = read_evaluation_input(&path).unwrap_err();
        assert_eq!(err.code, "INPUT_INVALID");

        let err = read_evaluation_input(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code, "INPUT_READ_FAILED");
    }

    #[test]
    fn openai_provider_requires_key_env() {
        let mut config = AppConfig::default();
        config.llm.api_key_env = "DOCQA_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let client = OllamaClient::new("http://127.0.0.1:11434").expect("client");
        let err = make_llm(&config, &client).err().expect("missing key");
        assert_eq!(err.code, "LLM_API_KEY_MISSING");

        config.llm.provider = LlmProvider::Ollama;
        assert!(make_llm(&config, &client).is_ok());
    }
}
