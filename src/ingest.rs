use crate::encoding::encode;
use crate::error::Result;
use crate::game::{Game, Ply};
use crate::outcome::Outcome;
use crate::sampler::{choose_positions, SamplerConfig};
use crate::storage::{Rows, Shape, Storage};
use crate::writer::{DatasetWriter, DEFAULT_FLUSH_THRESHOLD};
use rand::Rng;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub sampler: SamplerConfig,
    /// Rows kept in memory before they are appended to the container
    pub flush_threshold: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            sampler: SamplerConfig::default(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Games seen
    pub games: usize,
    /// Games with a winner, the only ones that produce rows
    pub decisive_games: usize,
    pub positions: usize,
}

/// Samples, encodes and labels the positions of one game.
/// Drawn games produce no rows.
pub fn samples_for_game<R: Rng + ?Sized>(
    game: &Game,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<Rows> {
    let outcome = Outcome::from_result_tag(&game.result);
    if outcome == Outcome::Draw {
        return Ok(Rows::default());
    }

    let moves: Vec<&str> = game.moves().collect();
    let chosen: Vec<&Ply> = choose_positions(&game.plies, &moves, config, rng);

    let mut rows = Rows::with_capacity(chosen.len());
    for ply in chosen {
        if let Some(label) = outcome.label_for(ply.mover) {
            rows.push(encode(&ply.fen)?, label);
        }
    }

    Ok(rows)
}

/// Turns games into rows of a dataset
pub struct Ingestor<S: Storage, R: Rng> {
    writer: DatasetWriter<S>,
    sampler: SamplerConfig,
    rng: R,
    stats: IngestStats,
}

impl<S: Storage, R: Rng> Ingestor<S, R> {
    /// Ingests into a new container at `path`
    pub fn create<P: Into<PathBuf>>(
        storage: S,
        path: P,
        config: IngestConfig,
        rng: R,
    ) -> Result<Self> {
        let writer = DatasetWriter::create(storage, path, config.flush_threshold)?;
        Ok(Self::new(writer, config.sampler, rng))
    }

    /// Ingests into the existing container at `path`, after its rows
    pub fn resume<P: Into<PathBuf>>(
        storage: S,
        path: P,
        config: IngestConfig,
        rng: R,
    ) -> Result<Self> {
        let writer = DatasetWriter::resume(storage, path, config.flush_threshold)?;
        Ok(Self::new(writer, config.sampler, rng))
    }

    pub fn new(writer: DatasetWriter<S>, sampler: SamplerConfig, rng: R) -> Self {
        Ingestor {
            writer,
            sampler,
            rng,
            stats: IngestStats::default(),
        }
    }

    /// Processes a game and returns the number of rows it produced
    pub fn process_game(&mut self, game: &Game) -> Result<usize> {
        let rows = samples_for_game(game, &self.sampler, &mut self.rng)?;
        let count = rows.len();

        self.stats.games += 1;
        if Outcome::from_result_tag(&game.result) != Outcome::Draw {
            self.stats.decisive_games += 1;
        }
        self.stats.positions += count;

        self.writer.extend(rows)?;
        Ok(count)
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Flushes the remaining rows and returns the final dataset shape
    pub fn finish(self) -> Result<(Shape, IngestStats)> {
        let path = self.writer.path().display().to_string();
        let shape = self.writer.finish()?;

        info!(
            path = %path,
            rows = shape.rows,
            games = self.stats.games,
            decisive = self.stats.decisive_games,
            "dataset written"
        );
        Ok((shape, self.stats))
    }
}
