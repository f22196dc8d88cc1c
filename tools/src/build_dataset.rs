use crate::make_rng;
use bitboards::game::{GameReader, VisitorConfig};
use bitboards::ingest::{IngestConfig, Ingestor};
use bitboards::sampler::SamplerConfig;
use bitboards::storage::FileStorage;
use bitboards::writer::DEFAULT_FLUSH_THRESHOLD;
use clap::Args;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::error::Error;
use std::fs::File;
use std::io;

#[derive(Args)]
pub struct BuildDatasetCommand {
    /// Path or URL of a .pgn or .pgn.zst file to read games
    #[arg(long, value_name = "input")]
    input: String,

    /// Dataset file to write the samples
    #[arg(long, value_name = "output")]
    output: String,

    /// Append to an existing dataset instead of creating a new one
    #[arg(long, default_value = "false")]
    append: bool,

    /// Number of rows kept in memory before they are written
    #[arg(long, default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    flush_threshold: usize,

    /// Plies at the start of each game that are never sampled
    #[arg(long, default_value = "5")]
    exclude_starting: usize,

    /// Maximum number of positions sampled from each game
    #[arg(long, default_value = "10")]
    positions_per_game: usize,

    /// Only accept games where both player have at least this elo
    #[arg(long, value_name = "min-elo")]
    min_elo: Option<u32>,

    /// Only accept games that ended normally (Lichess `Termination` header)
    #[arg(long, default_value = "false")]
    normal_termination: bool,

    /// Seed for position sampling
    #[arg(long)]
    seed: Option<u64>,
}

pub fn build_dataset(cmd: BuildDatasetCommand) -> Result<(), Box<dyn Error>> {
    // raw data stream (may be compressed)
    let raw_reader: Box<dyn io::Read> = if cmd.input.starts_with("http") {
        Box::new(reqwest::blocking::get(cmd.input.clone())?.error_for_status()?)
    } else {
        Box::new(File::open(&cmd.input)?)
    };

    // decompress if necessary
    let reader: Box<dyn io::Read> = if cmd.input.ends_with(".zst") {
        Box::new(zstd::Decoder::new(raw_reader)?)
    } else {
        raw_reader
    };

    println!("Input: {}", cmd.input);
    println!("Output: {}", cmd.output);
    println!("Append: {}", cmd.append);

    let config = IngestConfig {
        sampler: SamplerConfig {
            exclude_starting: cmd.exclude_starting,
            max_positions: cmd.positions_per_game,
        },
        flush_threshold: cmd.flush_threshold,
    };
    let rng = make_rng(cmd.seed);
    let mut ingestor = if cmd.append {
        Ingestor::resume(FileStorage, &cmd.output, config, rng)?
    } else {
        Ingestor::create(FileStorage, &cmd.output, config, rng)?
    };

    let visitor_config = VisitorConfig {
        min_elo: cmd.min_elo,
        normal_termination_only: cmd.normal_termination,
    };
    let mut games = GameReader::new(reader, visitor_config);

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [Elapsed {elapsed_precise}] [Games {human_pos} @ {per_sec}] {msg}")?,
    );

    while let Some(game) = games.next_game()? {
        ingestor.process_game(&game)?;

        bar.set_position(games.games_read() as u64);
        bar.set_message(format!(
            "[Samples {}]",
            HumanCount(ingestor.stats().positions as u64)
        ));
    }
    bar.finish();

    let (shape, stats) = ingestor.finish()?;

    println!(
        "Done. Games read: {}, skipped: {}, decisive: {}",
        games.games_read(),
        games.games_skipped(),
        stats.decisive_games
    );
    println!(
        "Positions written: {} (dataset now holds {} rows)",
        stats.positions, shape.rows
    );

    Ok(())
}
