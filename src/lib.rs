//! Builds supervised-learning datasets from chess games.
//!
//! Games are read from PGN, a few quiet positions are sampled from each decisive game,
//! encoded into 773-element bitboards and appended, with a win/loss label, to a
//! container file. [`batch_loader::BatchLoader`] serves the container back in batches.

pub mod batch_loader;
pub mod encoding;
pub mod error;
pub mod game;
pub mod ingest;
pub mod outcome;
pub mod sampler;
pub mod storage;
pub mod writer;

pub use encoding::{encode, Bitboard, BITBOARD_SIZE};
pub use error::{Error, Result};
pub use outcome::{Label, Outcome};
