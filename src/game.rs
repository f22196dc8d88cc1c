use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use shakmaty::{fen::Fen, CastlingMode, Chess, Color, EnPassantMode, Position};
use std::io;
use tracing::warn;

/// A single half-move of the main line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ply {
    /// Position reached by the move (FEN)
    pub fen: String,
    /// The move itself (SAN)
    pub san: String,
    /// Side that played the move
    pub mover: Color,
}

#[derive(Debug, Clone, Default)]
pub struct Game {
    /// Raw `Result` tag, e.g. "1-0"
    pub result: String,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub plies: Vec<Ply>,
}

impl Game {
    pub fn moves(&self) -> impl Iterator<Item = &str> {
        self.plies.iter().map(|ply| ply.san.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisitorConfig {
    /// Only accept games where both players have at least this elo
    pub min_elo: Option<u32>,
    /// Only accept games with `[Termination "Normal"]` (excl. Abandoned, Time forfeit, Rules infraction)
    pub normal_termination_only: bool,
}

/// Replays the main line of each game and records every ply
pub struct GameVisitor {
    config: VisitorConfig,

    /// Position before the next move
    position: Chess,
    game: Game,
    termination: String,

    skipped: bool,
    /// Set when a move or the FEN header can't be applied
    invalid: bool,
}

impl GameVisitor {
    pub fn new(config: VisitorConfig) -> Self {
        GameVisitor {
            config,
            position: Chess::default(),
            game: Game::default(),
            termination: String::new(),
            skipped: false,
            invalid: false,
        }
    }

    fn accepts_headers(&self) -> bool {
        let min_elo = self.config.min_elo.unwrap_or(0);

        let normal = !self.config.normal_termination_only || self.termination == "Normal";
        let good_elo = min_elo == 0
            || (self.game.white_elo.unwrap_or(0) >= min_elo
                && self.game.black_elo.unwrap_or(0) >= min_elo);

        normal && good_elo
    }
}

impl Visitor for GameVisitor {
    type Result = Option<Game>;

    fn begin_game(&mut self) {
        self.position = Chess::default();
        self.game = Game::default();
        self.termination.clear();
        self.skipped = false;
        self.invalid = false;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let value = String::from_utf8_lossy(value.as_bytes());

        match key {
            b"Result" => self.game.result = value.to_string(),
            b"WhiteElo" => self.game.white_elo = value.parse().ok(),
            b"BlackElo" => self.game.black_elo = value.parse().ok(),
            b"Termination" => self.termination = value.to_string(),
            b"FEN" => {
                let position = Fen::from_ascii(value.as_bytes())
                    .ok()
                    .and_then(|fen| fen.into_position(CastlingMode::Standard).ok());

                match position {
                    Some(position) => self.position = position,
                    None => {
                        warn!(fen = %value, "invalid FEN header, skipping game");
                        self.invalid = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn end_headers(&mut self) -> Skip {
        self.skipped = !self.accepts_headers();
        Skip(self.skipped || self.invalid)
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true) // main line only
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.invalid {
            return;
        }

        let Ok(mov) = san_plus.san.to_move(&self.position) else {
            warn!(san = %san_plus, ply = self.game.plies.len(), "illegal move, skipping game");
            self.invalid = true;
            return;
        };

        let mover = self.position.turn();
        // regenerate the SAN so captures are always marked
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &mov);
        let fen = Fen(self.position.clone().into_setup(EnPassantMode::Legal)).to_string();

        self.game.plies.push(Ply {
            fen,
            san: san.to_string(),
            mover,
        });
    }

    fn end_game(&mut self) -> Self::Result {
        // note: skipped games go through here too
        if self.skipped || self.invalid {
            return None;
        }

        Some(std::mem::take(&mut self.game))
    }
}

/// Reads games one by one from a PGN stream
pub struct GameReader<R: io::Read> {
    reader: BufferedReader<R>,
    visitor: GameVisitor,

    games_read: usize,
    games_skipped: usize,
}

impl<R: io::Read> GameReader<R> {
    pub fn new(read: R, config: VisitorConfig) -> Self {
        GameReader {
            reader: BufferedReader::new(read),
            visitor: GameVisitor::new(config),
            games_read: 0,
            games_skipped: 0,
        }
    }

    /// Next accepted game, `None` at the end of the archive
    pub fn next_game(&mut self) -> io::Result<Option<Game>> {
        while let Some(result) = self.reader.read_game(&mut self.visitor)? {
            self.games_read += 1;

            match result {
                Some(game) => return Ok(Some(game)),
                None => self.games_skipped += 1,
            }
        }

        Ok(None)
    }

    /// Games parsed so far, including skipped ones
    pub fn games_read(&self) -> usize {
        self.games_read
    }

    pub fn games_skipped(&self) -> usize {
        self.games_skipped
    }
}

impl<R: io::Read> Iterator for GameReader<R> {
    type Item = io::Result<Game>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_game().transpose()
    }
}
