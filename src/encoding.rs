use std::fmt;

/// Number of squares on the board
pub const NUM_SQUARES: usize = 64;
/// 6 roles × 2 colors
pub const NUM_CHANNELS: usize = 12;
/// One-hot block: square × channel
pub const PLACEMENT_FEATURES: usize = NUM_SQUARES * NUM_CHANNELS; // 768

pub const SIDE_TO_MOVE: usize = 768;
pub const WHITE_KINGSIDE: usize = 769;
pub const WHITE_QUEENSIDE: usize = 770;
pub const BLACK_KINGSIDE: usize = 771;
pub const BLACK_QUEENSIDE: usize = 772;

/// Total length of an encoded position
pub const BITBOARD_SIZE: usize = 773;

/// A position encoded as 773 0/1 values.
///
/// Elements `0..768` hold one bit per (square, piece channel), squares in FEN order
/// (a8, b8, ..., h1) and channels in the order `p n b r q k P N B R Q K`.
/// Element 768 is set when white is to move and 769..773 are the `K Q k q` castling rights.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bitboard([u8; BITBOARD_SIZE]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    MissingField(&'static str),
    UnknownPiece(char),
    /// The placement describes more than 64 squares
    TooManySquares,
    /// The placement describes fewer than 64 squares
    TooFewSquares(usize),
    InvalidTurn(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MissingField(field) => write!(f, "missing {} field", field),
            EncodeError::UnknownPiece(ch) => write!(f, "unknown piece '{}'", ch),
            EncodeError::TooManySquares => write!(f, "placement has more than 64 squares"),
            EncodeError::TooFewSquares(n) => write!(f, "placement has only {} squares", n),
            EncodeError::InvalidTurn(turn) => write!(f, "invalid side to move '{}'", turn),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Channel of a FEN piece letter, lowercase (black) first
fn piece_channel(ch: char) -> Option<usize> {
    let channel = match ch {
        'p' => 0,
        'n' => 1,
        'b' => 2,
        'r' => 3,
        'q' => 4,
        'k' => 5,
        'P' => 6,
        'N' => 7,
        'B' => 8,
        'R' => 9,
        'Q' => 10,
        'K' => 11,
        _ => return None,
    };
    Some(channel)
}

/// Encodes a FEN string into a bitboard.
///
/// Only the placement, side to move and castling fields are read,
/// the remaining fields may be missing.
pub fn encode(fen: &str) -> Result<Bitboard, EncodeError> {
    let mut fields = fen.split_whitespace();
    let placement = fields.next().ok_or(EncodeError::MissingField("placement"))?;
    let turn = fields.next().ok_or(EncodeError::MissingField("side to move"))?;
    let castling = fields.next().ok_or(EncodeError::MissingField("castling"))?;

    let mut bitboard = Bitboard::zeroed();
    let mut cursor = 0;

    for ch in placement.chars() {
        match ch {
            '/' => continue,
            '1'..='8' => {
                cursor += (ch as usize - '0' as usize) * NUM_CHANNELS;
                if cursor > PLACEMENT_FEATURES {
                    return Err(EncodeError::TooManySquares);
                }
            }
            _ => {
                let channel = piece_channel(ch).ok_or(EncodeError::UnknownPiece(ch))?;
                if cursor >= PLACEMENT_FEATURES {
                    return Err(EncodeError::TooManySquares);
                }
                bitboard.0[cursor + channel] = 1;
                cursor += NUM_CHANNELS;
            }
        }
    }

    if cursor != PLACEMENT_FEATURES {
        return Err(EncodeError::TooFewSquares(cursor / NUM_CHANNELS));
    }

    bitboard.0[SIDE_TO_MOVE] = match turn {
        "w" => 1,
        "b" => 0,
        _ => return Err(EncodeError::InvalidTurn(turn.to_string())),
    };

    bitboard.0[WHITE_KINGSIDE] = castling.contains('K') as u8;
    bitboard.0[WHITE_QUEENSIDE] = castling.contains('Q') as u8;
    bitboard.0[BLACK_KINGSIDE] = castling.contains('k') as u8;
    bitboard.0[BLACK_QUEENSIDE] = castling.contains('q') as u8;

    Ok(bitboard)
}

impl Bitboard {
    pub fn zeroed() -> Self {
        Bitboard([0; BITBOARD_SIZE])
    }

    /// Builds a bitboard from a stored row, `None` if the row has the wrong width
    /// or holds anything but 0 and 1
    pub fn from_slice(row: &[u8]) -> Option<Self> {
        let array: [u8; BITBOARD_SIZE] = row.try_into().ok()?;
        if array.iter().any(|&v| v > 1) {
            return None;
        }
        Some(Bitboard(array))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Element at `index`, `None` past the end
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Indices of all set elements
    pub fn active_features(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of set bits in the placement block, i.e. occupied squares
    pub fn piece_count(&self) -> usize {
        self.0[..PLACEMENT_FEATURES]
            .iter()
            .filter(|&&v| v != 0)
            .count()
    }

    pub fn white_to_move(&self) -> bool {
        self.0[SIDE_TO_MOVE] == 1
    }

    /// Castling rights in `K Q k q` order
    pub fn castling(&self) -> [bool; 4] {
        [
            self.0[WHITE_KINGSIDE] == 1,
            self.0[WHITE_QUEENSIDE] == 1,
            self.0[BLACK_KINGSIDE] == 1,
            self.0[BLACK_QUEENSIDE] == 1,
        ]
    }
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bitboard")
            .field(&self.active_features())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn starting_position() {
        let bitboard = encode(START_FEN).unwrap();

        assert_eq!(bitboard.piece_count(), 32);
        assert!(bitboard.white_to_move());
        assert_eq!(bitboard.castling(), [true; 4]);

        // a8 black rook, e8 black king, e1 white king
        assert_eq!(bitboard.get(3), Some(1));
        assert_eq!(bitboard.get(4 * NUM_CHANNELS + 5), Some(1));
        assert_eq!(bitboard.get(60 * NUM_CHANNELS + 11), Some(1));
        assert_eq!(bitboard.get(BITBOARD_SIZE), None);
    }

    #[test]
    fn bare_kings() {
        let bitboard = encode("8/8/8/8/8/8/8/4K2k b - - 0 1").unwrap();

        assert_eq!(bitboard.active_features(), vec![60 * 12 + 11, 63 * 12 + 5]);
        assert!(!bitboard.white_to_move());
        assert_eq!(bitboard.castling(), [false; 4]);
    }

    #[test]
    fn one_bit_per_occupied_square() {
        let fens = [
            START_FEN,
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
            "8/5k2/3p4/1p1Pp2p/pP2Pp1P/P4P1K/8/8 b - - 99 50",
            "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1",
        ];

        for fen in fens {
            let bitboard = encode(fen).unwrap();
            let placement = fen.split(' ').next().unwrap();
            let occupied = placement.chars().filter(|c| c.is_ascii_alphabetic()).count();

            assert_eq!(bitboard.piece_count(), occupied, "{}", fen);
            for square in 0..NUM_SQUARES {
                let bits = &bitboard.as_slice()[square * NUM_CHANNELS..(square + 1) * NUM_CHANNELS];
                assert!(bits.iter().map(|&b| b as usize).sum::<usize>() <= 1);
            }
        }
    }

    #[test]
    fn partial_castling_rights() {
        let bitboard = encode("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        assert_eq!(bitboard.castling(), [true, false, false, true]);
    }

    #[test]
    fn deterministic() {
        assert_eq!(encode(START_FEN).unwrap(), encode(START_FEN).unwrap());
    }

    #[test]
    fn trailing_fields_are_optional() {
        let full = encode(START_FEN).unwrap();
        let short = encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq").unwrap();
        assert_eq!(full, short);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            encode("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(EncodeError::UnknownPiece('x'))
        );
        assert_eq!(
            encode("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(EncodeError::UnknownPiece('9'))
        );
        assert_eq!(
            encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"),
            Err(EncodeError::MissingField("side to move"))
        );
        assert_eq!(
            encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1"),
            Err(EncodeError::TooFewSquares(56))
        );
        assert_eq!(
            encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNRK w KQkq - 0 1"),
            Err(EncodeError::TooManySquares)
        );
        assert_eq!(
            encode("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(EncodeError::InvalidTurn("x".to_string()))
        );
    }

    #[test]
    fn slice_round_trip_checks_width() {
        let bitboard = encode(START_FEN).unwrap();
        assert_eq!(Bitboard::from_slice(bitboard.as_slice()), Some(bitboard));
        assert_eq!(Bitboard::from_slice(&[0; 10]), None);

        let mut row = bitboard.as_slice().to_vec();
        row[100] = 2;
        assert_eq!(Bitboard::from_slice(&row), None);
    }
}
