//! evalsense - course evaluation scoring
//!
//! Command-line entry point: trains the sentiment model, classifies
//! feedback, scans rating maps and scores whole submissions.

mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use evalsense_core::ScoringConfig;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "evalsense")]
#[command(about = "Sentiment and rating-anomaly scoring for course evaluations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (TOML); EVALSENSE__SECTION__KEY variables override it
    #[arg(short, long, env = "EVALSENSE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the sentiment model from a labeled corpus
    Train {
        /// Corpus file: JSON array or JSON lines of {"text", "label"}
        #[arg(long)]
        corpus: PathBuf,

        /// Where to write the model (defaults to the configured model dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify feedback text (arguments, or one text per stdin line)
    Classify {
        texts: Vec<String>,

        /// Sentiment model path
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Check one rating map for suspicious patterns
    Detect {
        /// Inline JSON object, e.g. '{"teaching_1": 4, "teaching_2": 3}'
        #[arg(long, conflicts_with = "input")]
        ratings: Option<String>,

        /// File holding the JSON object (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Scan many rating maps, optionally clustering the cohort
    Batch {
        /// JSON array or JSON lines of rating maps (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also run density-based clustering and report outliers
        #[arg(long)]
        cluster: bool,

        /// Save the fitted cohort model (to the configured path when no value is given)
        #[arg(long, num_args = 0..=1)]
        save_model: Option<Option<PathBuf>>,
    },

    /// Score submissions ({"ratings": {...}, "feedback": "..."})
    Score {
        /// JSON array or JSON lines of submissions (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Sentiment model path
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "evalsense={0},evalsense_core={0}",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("evalsense v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ScoringConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Train { corpus, output, json } => cli::train::handle(corpus, output, json, &config),
        Commands::Classify { texts, model } => cli::classify::handle(texts, model, &config),
        Commands::Detect { ratings, input } => cli::detect::handle(ratings, input, &config),
        Commands::Batch {
            input,
            cluster,
            save_model,
        } => cli::batch::handle(input, cluster, save_model, &config),
        Commands::Score { input, model } => cli::score::handle(input, model, &config),
    }
}
