use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ratetag_ai::{CategoryModelSet, Predictor, default_loader};
use ratetag_core::{ErrorPolicy, TaggerConfig, VocabularyStore, sparse_weights};
use tracing::Level;

mod input;
mod output;

use output::OutputFormat;

/// Tag hotel rate names with per-category labels.
#[derive(Parser)]
#[command(name = "ratetag", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "RATETAG_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the vocabulary, models, and label files
    #[arg(long, global = true, env = "RATETAG_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// More logging (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict categories for a CSV file or a single rate name
    Predict {
        /// CSV file with a header row, or a literal rate name
        #[arg(short, long)]
        input: String,

        /// CSV column holding the rate names
        #[arg(long)]
        column: Option<String>,

        /// Category to predict (repeatable); defaults to the configured list
        #[arg(short, long = "category")]
        categories: Vec<String>,

        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Write results here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort on the first category failure
        #[arg(long)]
        fail_fast: bool,

        /// Vectorizer threads
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Show the non-zero TF-IDF features of a rate name
    Vectorize { text: String },
    /// List categories with a model in the models directory
    Categories,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("ratetag v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => TaggerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TaggerConfig::default(),
    };
    if let Some(dir) = cli.models_dir {
        config.models_dir = dir;
    }

    match cli.command {
        Command::Predict {
            input,
            column,
            categories,
            format,
            output,
            fail_fast,
            workers,
        } => {
            if let Some(column) = column {
                config.input_col = column;
            }
            if fail_fast {
                config.error_policy = ErrorPolicy::FailFast;
            }
            if workers.is_some() {
                config.workers = workers;
            }
            cmd_predict(config, &input, &categories, format, output)
        }
        Command::Vectorize { text } => cmd_vectorize(&config, &text),
        Command::Categories => cmd_categories(&config),
    }
}

fn cmd_predict(
    config: TaggerConfig,
    input: &str,
    categories: &[String],
    format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let inputs = input::read_inputs(input, &config.input_col)?;
    let predictor = Predictor::open(config, default_loader()).context("opening predictor")?;
    let report = predictor.predict_all(&inputs, categories)?;

    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    output::write_results(
        format,
        &predictor.config().input_col,
        &inputs,
        &report.categories,
        &report.table,
        out.as_mut(),
    )?;
    if let Some(path) = output {
        eprintln!("Wrote {} rows to {}", inputs.len(), path.display());
    }
    Ok(())
}

fn cmd_vectorize(config: &TaggerConfig, text: &str) -> anyhow::Result<()> {
    let store = VocabularyStore::load(&config.vocabulary_path())?;
    let weights = sparse_weights(text, &store);
    println!("{} non-zero of {} features", weights.len(), store.len());
    for (index, weight) in weights {
        let term = store.term_at(index).unwrap_or("?");
        println!("  {index:>7}  {:<5} {weight:.6}", format!("{term:?}"));
    }
    Ok(())
}

fn cmd_categories(config: &TaggerConfig) -> anyhow::Result<()> {
    let models = CategoryModelSet::new(
        config.models_dir.clone(),
        config.layout.clone(),
        default_loader(),
    );
    let names = models.available_categories()?;
    if names.is_empty() {
        eprintln!("no models found under {}", config.models_dir.display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
