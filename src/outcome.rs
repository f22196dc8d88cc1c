use shakmaty::Color;

/// Training label: 1 if the side that made the move won, 0 if it lost
pub type Label = u8;

/// Outcome of a game, as recorded in its `Result` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WhiteWin,
    BlackWin,
    Draw,
}

impl Outcome {
    /// Unknown or missing results (`*`, empty) count as draws
    pub fn from_result_tag(tag: &str) -> Self {
        match tag.trim() {
            "1-0" => Outcome::WhiteWin,
            "0-1" => Outcome::BlackWin,
            _ => Outcome::Draw,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWin => Some(Color::White),
            Outcome::BlackWin => Some(Color::Black),
            Outcome::Draw => None,
        }
    }

    /// Label of a position reached by a move of `mover`. Draws have no label
    pub fn label_for(self, mover: Color) -> Option<Label> {
        self.winner().map(|winner| (winner == mover) as Label)
    }
}
