//! cosecha - crop yield dataset cleaning and grouped evaluation CLI
//!
//! Usage:
//!   cosecha clean --input raw.csv --output clean.csv   # Clean a survey export
//!   cosecha audit clean.csv                            # Re-check a clean dataset
//!   cosecha evaluate clean.csv --drop clay,sand,silt   # Random-forest baseline
//!   cosecha tune clean.csv --output model.json         # Search booster settings
//!   cosecha predict model.json --min-temp 21 ...       # Score one field

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::{audit, clean, evaluate, predict, tune};
use cosecha::artifact::FieldParameters;

/// cosecha - leakage-free crop yield datasets and district-grouped evaluation
#[derive(Parser)]
#[command(name = "cosecha")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pipeline configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw survey CSV into a leakage-free dataset
    Clean {
        /// Raw survey CSV
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Destination of the clean dataset CSV
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Audit a persisted clean dataset (non-zero exit on failure)
    Audit {
        /// Clean dataset CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Yield ceiling for the spike check (defaults to the configured efficiency ceiling)
        #[arg(long)]
        ceiling: Option<f64>,
    },

    /// Random-forest baseline with district-grouped cross-validation
    Evaluate {
        /// Clean dataset CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of folds
        #[arg(short = 'k', long)]
        folds: Option<usize>,

        /// Feature columns to drop, comma separated
        #[arg(long, value_delimiter = ',')]
        drop: Vec<String>,

        /// Trees in the forest
        #[arg(long, default_value_t = cosecha::experiment::BASELINE_TREES)]
        trees: usize,

        /// Forest seed
        #[arg(long, default_value_t = cosecha::experiment::BASELINE_SEED)]
        seed: u64,
    },

    /// Hyperparameter search for the gradient-boosted model
    Tune {
        /// Clean dataset CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Destination of the model artifact (JSON)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Trial budget
        #[arg(short = 'n', long)]
        trials: Option<usize>,

        /// Number of folds
        #[arg(short = 'k', long)]
        folds: Option<usize>,

        /// Search seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict yield for one field with an exported model
    Predict {
        /// Model artifact (JSON)
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Average minimum temperature (°C)
        #[arg(long, allow_negative_numbers = true)]
        min_temp: f64,

        /// Average maximum temperature (°C)
        #[arg(long, allow_negative_numbers = true)]
        max_temp: f64,

        /// Average temperature (°C); midpoint of min and max when omitted
        #[arg(long, allow_negative_numbers = true)]
        avg_temp: Option<f64>,

        /// Average precipitation
        #[arg(long)]
        precipitation: f64,

        /// Average wind speed
        #[arg(long)]
        wind: f64,

        /// Soil pH
        #[arg(long)]
        ph: f64,

        /// Clay (%)
        #[arg(long)]
        clay: f64,

        /// Sand (%)
        #[arg(long)]
        sand: f64,

        /// Silt (%)
        #[arg(long)]
        silt: f64,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Clean { input, output } => clean::run(&input, &output, config, cli.json),

        Commands::Audit { file, ceiling } => audit::run(&file, ceiling, config, cli.json),

        Commands::Evaluate {
            file,
            folds,
            drop,
            trees,
            seed,
        } => evaluate::run(
            &file,
            &evaluate::EvaluateOptions {
                folds,
                drop: &drop,
                trees,
                seed,
                config,
                json: cli.json,
            },
        ),

        Commands::Tune {
            file,
            output,
            trials,
            folds,
            seed,
        } => tune::run(
            &file,
            &output,
            &tune::TuneOptions {
                trials,
                folds,
                seed,
                config,
                json: cli.json,
            },
        ),

        Commands::Predict {
            model,
            min_temp,
            max_temp,
            avg_temp,
            precipitation,
            wind,
            ph,
            clay,
            sand,
            silt,
        } => predict::run(
            &model,
            &FieldParameters {
                min_temp,
                max_temp,
                avg_temp,
                precipitation,
                wind_speed: wind,
                ph,
                clay,
                sand,
                silt,
            },
            cli.json,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            e.exit_code()
        }
    }
}
