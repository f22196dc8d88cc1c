use crate::make_rng;
use bitboards::batch_loader::{BatchLoader, BatchLoaderConfig};
use bitboards::storage::MappedContainer;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::io::{self, BufWriter, Write};

#[derive(Args, Clone)]
pub struct BatchLoaderCommand {
    /// Dataset file to read samples from
    #[arg(long, required = true)]
    input: String,

    // First row to serve
    #[arg(long, default_value = "0")]
    first: usize,

    // Number of rows to serve.
    // If not given, it will serve until the end of the dataset
    #[arg(long)]
    size: Option<usize>,

    /// Number of samples in one batch
    #[arg(long, default_value = "64")]
    batch_size: usize,

    /// Serve rows in file order instead of shuffling every epoch
    #[arg(long, default_value = "false")]
    no_shuffle: bool,

    /// Number of epochs to serve
    #[arg(long, default_value = "1")]
    epochs: usize,

    /// Seed for shuffling
    #[arg(long)]
    seed: Option<u64>,
}

/// Writes every batch to stdout: `batch_size × 773` feature bytes, then `batch_size` label bytes
pub fn batch_loader(cmd: BatchLoaderCommand) -> Result<(), Box<dyn Error>> {
    let config = BatchLoaderConfig {
        first: cmd.first,
        size: cmd.size,
        batch_size: cmd.batch_size,
        shuffle: !cmd.no_shuffle,
    };
    let container = MappedContainer::open(&cmd.input)?;
    let mut loader = BatchLoader::new(container, config, make_rng(cmd.seed))?;

    eprintln!(
        "Serving {} batches of {} rows per epoch, {} epochs",
        loader.len(),
        loader.batch_size(),
        cmd.epochs
    );

    let bar = ProgressBar::new((loader.len() * cmd.epochs) as u64).with_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} [Batches {human_pos}/{human_len} @ {per_sec}] {msg}")?,
    );

    let mut out = BufWriter::new(io::stdout().lock());

    for epoch in 0..cmd.epochs {
        bar.set_message(format!("[Epoch {}]", epoch + 1));

        for batch in loader.epoch() {
            let batch = batch?;
            out.write_all(&batch.features)?;
            out.write_all(&batch.labels)?;
            bar.inc(1);
        }
        out.flush()?;

        loader.on_epoch_end();
    }
    bar.finish();

    Ok(())
}
