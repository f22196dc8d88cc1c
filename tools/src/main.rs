mod batch_loader;
mod build_dataset;
mod info;

use batch_loader::{batch_loader, BatchLoaderCommand};
use build_dataset::{build_dataset, BuildDatasetCommand};
use clap::{Parser, Subcommand};
use info::{info, InfoCommand};
use rand::{rngs::StdRng, SeedableRng};
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Samples positions from a PGN file and writes them, encoded and labeled, to a dataset file
    BuildDataset(BuildDatasetCommand),
    /// Displays the encoding of a FEN and/or the shape of a dataset
    Info(InfoCommand),
    /// Streams batches of a dataset to stdout (e.g. for training)
    BatchLoader(BatchLoaderCommand),
}

/// Seeded generator if a seed is given, random otherwise
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::BuildDataset(cmd) => build_dataset(cmd),
        Commands::Info(cmd) => info(cmd),
        Commands::BatchLoader(cmd) => batch_loader(cmd),
    }
}
