//! kwrank: command-line entry point for the keyword pipeline.
//!
//! Subcommands:
//! - `run`: validate, filter and classify candidates, then export JSON
//! - `expand`: generate long-tail candidates for a theme
//! - `learn`: record which generated phrases were collected
//! - `train`: fit the relevance classifier from labeled JSONL

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kwrank_core::{Competition, PipelineConfig, PipelineRun, ValidatorMode};
use kwrank_inference::{load_examples, FeatureExtractor, LocalNlpBackend, Trainer, TrainingConfig};
use kwrank_pipeline::{
    build_handoff, generate_long_tail, run_pipeline, LongTailOptions, PatternStore,
    PipelineOptions,
};

#[derive(Parser)]
#[command(name = "kwrank")]
#[command(author, version, about = "Keyword scoring, validation and relevance classification")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run candidates through validation, filtering and the relevance gate
    Run(RunArgs),

    /// Generate long-tail candidates for a theme
    Expand {
        /// Theme to expand
        theme: String,

        /// Minimum words per phrase
        #[arg(long, default_value_t = kwrank_core::defaults::LONG_TAIL_MIN_WORDS)]
        min_words: usize,

        /// Keep generation order instead of sorting by length
        #[arg(long)]
        no_sort: bool,

        /// Ignore learned patterns
        #[arg(long)]
        no_learning: bool,

        /// Learned-pattern store (default: KWRANK_PATTERNS_PATH)
        #[arg(long)]
        patterns: Option<PathBuf>,
    },

    /// Record which generated phrases were collected for a theme
    Learn {
        /// Theme the phrases were generated for
        theme: String,

        /// File with the generated phrases, one per line
        #[arg(long)]
        generated: PathBuf,

        /// File with the collected phrases, one per line
        #[arg(long)]
        collected: PathBuf,

        /// Learned-pattern store (default: KWRANK_PATTERNS_PATH)
        #[arg(long)]
        patterns: Option<PathBuf>,
    },

    /// Train the relevance classifier from labeled JSONL
    Train {
        /// Labeled examples, one JSON object per line
        #[arg(short, long)]
        data: PathBuf,

        /// Where to write the model (default: KWRANK_MODEL_PATH)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the evaluation report
        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long, default_value_t = 500)]
        epochs: usize,

        #[arg(long, default_value_t = 0.1)]
        learning_rate: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Candidate keywords
    keywords: Vec<String>,

    /// File with candidates, one per line (`#` starts a comment)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Theme candidates are judged against
    #[arg(long, default_value = "")]
    theme: String,

    /// Origin label of the candidates
    #[arg(long, default_value = kwrank_core::defaults::ORIGIN)]
    origin: String,

    /// Validator mode: mock or api
    #[arg(long)]
    mode: Option<ValidatorMode>,

    #[arg(long)]
    min_volume: Option<u64>,

    #[arg(long)]
    min_score: Option<f64>,

    /// Relevance probability threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Excluded term (repeatable)
    #[arg(long = "exclude")]
    excluded_terms: Vec<String>,

    /// Allowed competition tiers, comma-separated
    #[arg(long)]
    competition: Option<String>,

    /// Correlation id for the run (default: new UUIDv7)
    #[arg(long)]
    trace_id: Option<String>,

    /// Classify without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Directory for exported JSON
    #[arg(short, long, env = "KWRANK_OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// Niche for the hand-off payload; writes handoff_<trace>.json when set
    #[arg(long)]
    niche: Option<String>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "kwrank=info,kwrank_pipeline=info,kwrank_inference=info")
///
/// Console logs go to stderr so stdout stays machine-readable.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kwrank=info,kwrank_pipeline=info,kwrank_inference=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("kwrank.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::from_env();
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Run(args) => cmd_run(&config, args),
        Commands::Expand {
            theme,
            min_words,
            no_sort,
            no_learning,
            patterns,
        } => cmd_expand(
            &theme,
            min_words,
            !no_sort,
            (!no_learning).then(|| patterns.unwrap_or_else(|| config.patterns_path.clone())),
        ),
        Commands::Learn {
            theme,
            generated,
            collected,
            patterns,
        } => cmd_learn(
            &theme,
            &generated,
            &collected,
            &patterns.unwrap_or_else(|| config.patterns_path.clone()),
        ),
        Commands::Train {
            data,
            output,
            report,
            epochs,
            learning_rate,
            seed,
        } => cmd_train(
            &config,
            &data,
            &output.unwrap_or_else(|| config.model_path.clone()),
            report.as_deref(),
            TrainingConfig {
                epochs,
                learning_rate,
                seed,
                ..TrainingConfig::default()
            },
        ),
    }
}

/// Read non-blank, non-comment lines.
fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn cmd_run(config: &PipelineConfig, args: RunArgs) -> anyhow::Result<()> {
    let mut candidates = args.keywords;
    if let Some(path) = &args.input {
        candidates.extend(read_lines(path)?);
    }
    if candidates.is_empty() {
        bail!("no candidates given (pass keywords or --input)");
    }

    let mut options = PipelineOptions {
        theme: args.theme,
        origin: args.origin,
        dry_run: args.dry_run,
        trace_id: args.trace_id,
        ..PipelineOptions::from_config(config)
    };
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    if let Some(v) = args.min_volume {
        options.min_volume = v;
    }
    if let Some(v) = args.min_score {
        options.min_score = v;
    }
    if let Some(v) = args.threshold {
        options.threshold = v;
    }
    if !args.excluded_terms.is_empty() {
        options.excluded_terms = args.excluded_terms;
    }
    if let Some(list) = &args.competition {
        options.competition_allowed = Competition::parse_list(list)?;
    }

    let run = run_pipeline(&candidates, config, &options)?;

    if run.dry_run {
        info!(trace_id = %run.trace_id, "Dry run: skipping export");
    } else {
        export_run(&run, &args.output)?;
        if let Some(niche) = &args.niche {
            let payload = build_handoff(&run.approved, &options.theme, niche);
            let path = args.output.join(format!("handoff_{}.json", run.trace_id));
            write_json(&path, &payload)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&RunSummary::from(&run))?);
    Ok(())
}

#[derive(Serialize)]
struct RunSummary<'a> {
    trace_id: &'a str,
    dry_run: bool,
    metrics: &'a kwrank_core::RunMetrics,
    approved: Vec<&'a str>,
    rejected: Vec<&'a str>,
}

impl<'a> From<&'a PipelineRun> for RunSummary<'a> {
    fn from(run: &'a PipelineRun) -> Self {
        Self {
            trace_id: &run.trace_id,
            dry_run: run.dry_run,
            metrics: &run.metrics,
            approved: run.approved.iter().map(|k| k.keyword.as_str()).collect(),
            rejected: run.rejected_keywords(),
        }
    }
}

/// Write `approved_<trace>.json`, `rejected_<trace>.json` and `run_<trace>.json`.
fn export_run(run: &PipelineRun, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    write_json(&dir.join(format!("approved_{}.json", run.trace_id)), &run.approved)?;
    write_json(&dir.join(format!("rejected_{}.json", run.trace_id)), &run.rejected)?;
    write_json(&dir.join(format!("run_{}.json", run.trace_id)), run)?;

    info!(trace_id = %run.trace_id, dir = %dir.display(), "Run exported");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn cmd_expand(
    theme: &str,
    min_words: usize,
    sort: bool,
    patterns: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = patterns.map(PatternStore::load);
    let options = LongTailOptions {
        min_words,
        sort,
        ..LongTailOptions::default()
    };

    for phrase in generate_long_tail(theme, &options, store.as_ref()) {
        println!("{}", phrase);
    }
    Ok(())
}

fn cmd_learn(
    theme: &str,
    generated: &Path,
    collected: &Path,
    patterns: &Path,
) -> anyhow::Result<()> {
    let generated = read_lines(generated)?;
    let collected = read_lines(collected)?;

    let store = PatternStore::load(patterns);
    let counted = store.record_effective(theme, &generated, &collected)?;

    let learned = store.patterns(theme);
    let output = serde_json::json!({
        "theme": theme,
        "counted": counted,
        "operators": learned.ranked_operators(),
        "modifiers": learned.ranked_modifiers(),
        "store": patterns.to_string_lossy(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_train(
    config: &PipelineConfig,
    data: &Path,
    output: &Path,
    report_path: Option<&Path>,
    training: TrainingConfig,
) -> anyhow::Result<()> {
    let examples = load_examples(data)
        .with_context(|| format!("failed to load examples from {}", data.display()))?;
    info!(examples = examples.len(), data = %data.display(), "Training data loaded");

    let nlp = Arc::new(LocalNlpBackend::new().with_dimension(config.embedding_dim));
    let extractor = FeatureExtractor::new(nlp).with_embedding_dim(config.embedding_dim);

    let (model, report) = Trainer::new(&extractor).with_config(training).train(&examples)?;
    model.save(output)?;
    if let Some(path) = report_path {
        report.save(path)?;
    }

    info!(model_path = %output.display(), accuracy = report.accuracy, "Model written");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
