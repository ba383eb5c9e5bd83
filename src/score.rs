//! Search scores and scored move sequences.
//!
//! Scores are always from the point of view of the side to move at the node
//! that produced them. Mate scores encode the ply distance to the mate so
//! that ordinary integer comparison prefers quicker mates and slower losses.

use std::fmt;
use std::ops::Neg;

use crate::board::Move;
use crate::error::SearchError;

/// Largest score magnitude; a mate on the board right now.
pub const MATE_VALUE: i32 = 1_000_000_000;

/// Scores within this many plies of `MATE_VALUE` are mate scores.
pub const MAX_MATE_PLY: i32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EvaluationScore(i32);

impl EvaluationScore {
    pub const ZERO: EvaluationScore = EvaluationScore(0);
    pub const MAX: EvaluationScore = EvaluationScore(MATE_VALUE);
    pub const MIN: EvaluationScore = EvaluationScore(-MATE_VALUE);

    /// Clamps into [-MATE_VALUE, MATE_VALUE].
    pub fn new(value: i32) -> Self {
        EvaluationScore(value.clamp(-MATE_VALUE, MATE_VALUE))
    }

    /// Score for the side that mates at `ply` plies from the root.
    pub fn mate_in(ply: u32) -> Self {
        EvaluationScore(MATE_VALUE - ply as i32)
    }

    /// Score for the side that is mated at `ply` plies from the root.
    pub fn mated_in(ply: u32) -> Self {
        EvaluationScore(-(MATE_VALUE - ply as i32))
    }

    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_mate(self) -> bool {
        self.0.abs() > MATE_VALUE - MAX_MATE_PLY
    }

    /// Full moves until mate: positive when the side to move mates,
    /// negative when it gets mated, `None` for ordinary scores.
    pub fn mate_moves(self) -> Option<i32> {
        if !self.is_mate() {
            return None;
        }
        let plies = MATE_VALUE - self.0.abs();
        let moves = (plies + 1) / 2;
        Some(if self.0 > 0 { moves } else { -moves })
    }

    /// Shift by `delta`, saturating at the score bounds.
    pub fn offset(self, delta: i32) -> Self {
        EvaluationScore::new(self.0.saturating_add(delta))
    }

    /// Re-base a root-relative mate score to be relative to a node at `ply`.
    pub fn to_table(self, ply: u32) -> Self {
        match self.0 {
            v if v > MATE_VALUE - MAX_MATE_PLY => EvaluationScore::new(v + ply as i32),
            v if v < -(MATE_VALUE - MAX_MATE_PLY) => EvaluationScore::new(v - ply as i32),
            _ => self,
        }
    }

    /// Inverse of [`to_table`](Self::to_table).
    pub fn from_table(self, ply: u32) -> Self {
        match self.0 {
            v if v > MATE_VALUE - MAX_MATE_PLY => EvaluationScore(v - ply as i32),
            v if v < -(MATE_VALUE - MAX_MATE_PLY) => EvaluationScore(v + ply as i32),
            _ => self,
        }
    }
}

impl Neg for EvaluationScore {
    type Output = EvaluationScore;

    fn neg(self) -> Self::Output {
        EvaluationScore(-self.0)
    }
}

impl fmt::Display for EvaluationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_moves() {
            Some(moves) => write!(f, "mate {}", moves),
            None => write!(f, "cp {}", self.0),
        }
    }
}

/// A score with the line of moves that produced it.
///
/// The optional local value is the static evaluation right after the first
/// move; it is set once, by the root search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariationLine {
    score: EvaluationScore,
    moves: Vec<Move>,
    local_value: Option<EvaluationScore>,
}

impl VariationLine {
    pub fn new(score: EvaluationScore, moves: Vec<Move>) -> Self {
        VariationLine {
            score,
            moves,
            local_value: None,
        }
    }

    /// A line with no moves, e.g. a leaf or a draw.
    pub fn leaf(score: EvaluationScore) -> Self {
        VariationLine::new(score, Vec::new())
    }

    pub fn zero() -> Self {
        VariationLine::leaf(EvaluationScore::ZERO)
    }

    pub fn score(&self) -> EvaluationScore {
        self.score
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn first_move(&self) -> Option<Move> {
        self.moves.first().copied()
    }

    pub fn local_value(&self) -> Option<EvaluationScore> {
        self.local_value
    }

    pub fn with_local_value(mut self, value: EvaluationScore) -> Result<Self, SearchError> {
        if let Some(existing) = self.local_value {
            return Err(SearchError::InvariantViolation(format!(
                "local value already set to {existing}, refusing {value}"
            )));
        }
        self.local_value = Some(value);
        Ok(self)
    }

    /// The line extended backwards by `mv`.
    pub fn prepend(mut self, mv: Move) -> Self {
        self.moves.insert(0, mv);
        self
    }

    pub fn add_score(mut self, delta: i32) -> Self {
        self.score = self.score.offset(delta);
        self
    }

    pub fn sub_score(self, delta: i32) -> Self {
        self.add_score(delta.saturating_neg())
    }
}

impl fmt::Display for VariationLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.score)?;
        if let Some(local) = self.local_value {
            write!(f, " (local {})", local)?;
        }
        for mv in &self.moves {
            write!(f, " {}", mv)?;
        }
        Ok(())
    }
}

/// The same line seen from the other side: score and local value flip, the
/// moves stay in order.
pub fn negate(line: VariationLine) -> VariationLine {
    VariationLine {
        score: -line.score,
        moves: line.moves,
        local_value: line.local_value.map(|v| -v),
    }
}
