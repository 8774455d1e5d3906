//! Arvak QCL Command-Line Interface
//!
//! Train, validate and inspect circuit-centric binary classifiers.
//!
//! ```text
//! arvak-qcl train    --data samples.json --circuit circuit.yaml --output model.json
//! arvak-qcl validate --data samples.json --model model.json
//! arvak-qcl inspect  --circuit circuit.yaml
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{inspect, train, validate, version};

/// Arvak QCL - circuit-centric quantum classifier training
#[derive(Parser)]
#[command(name = "arvak-qcl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a classifier from several random starts
    Train {
        /// Dataset file (JSON)
        #[arg(short, long)]
        data: String,

        /// Circuit geometry (YAML or JSON)
        #[arg(short, long)]
        circuit: String,

        /// Training options (YAML); ARVAK_QCL_* variables override it
        #[arg(long)]
        config: Option<String>,

        /// Number of random initial parameter vectors
        #[arg(short, long, default_value = "4")]
        starts: usize,

        /// Base seed (overrides the configured one)
        #[arg(long)]
        seed: Option<u64>,

        /// Samples per training batch
        #[arg(short, long, default_value = "16")]
        batch_size: usize,

        /// Where to write the trained model (JSON)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Measure a trained model's miss rate on a dataset
    Validate {
        /// Dataset file (JSON)
        #[arg(short, long)]
        data: String,

        /// Trained model (JSON)
        #[arg(short, long)]
        model: String,

        /// Monte Carlo trials per sample
        #[arg(long, default_value = "10000")]
        measurements: usize,

        /// Use exact probabilities instead of sampling
        #[arg(long)]
        exact: bool,
    },

    /// Show a circuit's gates and parameter layout
    Inspect {
        /// Circuit geometry (YAML or JSON)
        #[arg(short, long)]
        circuit: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Train {
            data,
            circuit,
            config,
            starts,
            seed,
            batch_size,
            output,
        } => train::execute(
            &data,
            &circuit,
            config.as_deref(),
            starts,
            seed,
            batch_size,
            output.as_deref(),
        ),

        Commands::Validate {
            data,
            model,
            measurements,
            exact,
        } => validate::execute(&data, &model, measurements, exact),

        Commands::Inspect { circuit } => inspect::execute(&circuit),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
