use rand::{seq::index, Rng};

/// SAN marker of a capture
pub const CAPTURE_MARKER: char = 'x';

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Plies at the start of the game that are never picked
    pub exclude_starting: usize,
    /// Maximum number of positions picked from a single game
    pub max_positions: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            exclude_starting: 5,
            max_positions: 10,
        }
    }
}

/// Picks the positions of a game worth training on.
///
/// `positions[i]` must be the position reached by `moves[i]`. Openings and positions
/// reached by a capture are skipped, then at most `max_positions` are drawn without replacement.
pub fn choose_positions<'a, T, M, R>(
    positions: &'a [T],
    moves: &[M],
    config: &SamplerConfig,
    rng: &mut R,
) -> Vec<&'a T>
where
    M: AsRef<str>,
    R: Rng + ?Sized,
{
    let candidates: Vec<&T> = positions
        .iter()
        .zip(moves)
        .skip(config.exclude_starting)
        .filter(|&(_, mov)| !is_capture(mov))
        .map(|(position, _)| position)
        .collect();

    if candidates.len() <= config.max_positions {
        return candidates;
    }

    index::sample(rng, candidates.len(), config.max_positions)
        .into_iter()
        .map(|i| candidates[i])
        .collect()
}

/// Whether a SAN move captures a piece
pub fn is_capture<M: AsRef<str>>(mov: &M) -> bool {
    let san: &str = mov.as_ref();
    san.contains(CAPTURE_MARKER)
}
