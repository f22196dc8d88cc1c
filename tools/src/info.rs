use bitboards::encoding::{encode, PLACEMENT_FEATURES};
use bitboards::storage::{Container, MappedContainer};
use clap::Args;
use std::error::Error;

#[derive(Args)]
pub struct InfoCommand {
    /// If provided, it will print the active features of the given FEN
    #[arg(long, value_name = "fen")]
    fen: Option<String>,

    /// If provided, it will print the shape and label balance of the given dataset
    #[arg(long, value_name = "dataset")]
    dataset: Option<String>,
}

pub fn info(cmd: InfoCommand) -> Result<(), Box<dyn Error>> {
    if let Some(fen) = cmd.fen {
        let bitboard = encode(&fen)?;

        // print placement features
        for index in bitboard
            .active_features()
            .into_iter()
            .filter(|&i| i < PLACEMENT_FEATURES)
        {
            print!("{} ", index);
        }
        println!();

        let [wk, wq, bk, bq] = bitboard.castling();
        println!(
            "pieces: {} white to move: {} castling: K={} Q={} k={} q={}",
            bitboard.piece_count(),
            bitboard.white_to_move(),
            wk,
            wq,
            bk,
            bq
        );
    }

    if let Some(path) = cmd.dataset {
        let mut container = MappedContainer::open(&path)?;
        let shape = container.shape();

        println!(
            "bitboards: [{}, {}] labels: [{}, {}]",
            shape.rows, shape.feature_width, shape.rows, shape.label_width
        );

        if shape.rows > 0 {
            const CHUNK: usize = 8192;

            let mut wins = 0;
            for start in (0..shape.rows).step_by(CHUNK) {
                let count = CHUNK.min(shape.rows - start);
                let rows = container.read_slice(start, count)?;
                wins += rows.labels.iter().filter(|&&label| label == 1).count();
            }
            println!(
                "wins: {} ({:.1}%)",
                wins,
                100.0 * wins as f64 / shape.rows as f64
            );
        }
    }

    Ok(())
}
