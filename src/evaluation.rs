//! Static evaluation of positions.
//!
//! This module provides the leaf score used by the search, considering:
//! - Material, with separate middlegame and endgame weights
//! - Piece positioning (piece-square tables, king table by game phase)
//! - King tropism (how close enemy pieces are to each king)
//! - Pawn structure (doubled and isolated pawns)
//!
//! It also implements the static exchange evaluation used to prune losing
//! captures in quiescence search.

use once_cell::sync::Lazy;

use crate::board::{Board, Move};
use crate::control::GameControlInfo;
use crate::error::SearchError;
use crate::position::{AutoDrawType, GameState, Position};
use crate::score::EvaluationScore;
use crate::types::*;

// ============================================================================
// PIECE VALUES
// ============================================================================

/// Nominal piece values, used for exchanges and move ordering.
pub const PIECE_VALUES: [i32; 7] = [
    0,      // EMPTY
    100,    // PAWN
    320,    // KNIGHT
    330,    // BISHOP
    500,    // ROOK
    900,    // QUEEN
    20000,  // KING
];

const MIDDLEGAME_VALUES: [i32; 7] = [0, 100, 320, 330, 500, 900, 0];
const ENDGAME_VALUES: [i32; 7] = [0, 120, 300, 320, 530, 950, 0];

/// A side with at most this much non-pawn material is in the endgame.
pub const ENDGAME_MATERIAL_THRESHOLD: i32 = 1300;

/// Value of a piece code (colour bits ignored).
#[inline]
pub fn piece_value(piece: u8) -> i32 {
    PIECE_VALUES[piece_type(piece) as usize]
}

// ============================================================================
// PIECE-SQUARE TABLES (white's point of view, a1 first)
// ============================================================================

const PAWN_PST: [i32; 64] = [
    0,   0,   0,   0,   0,   0,   0,   0,   // Rank 1
    5,  10,  10, -20, -20,  10,  10,   5,   // Rank 2
    5,  -5, -10,   0,   0, -10,  -5,   5,   // Rank 3
    0,   0,   0,  20,  20,   0,   0,   0,   // Rank 4
    5,   5,  10,  25,  25,  10,   5,   5,   // Rank 5
   10,  10,  20,  30,  30,  20,  10,  10,   // Rank 6
   50,  50,  50,  50,  50,  50,  50,  50,   // Rank 7
    0,   0,   0,   0,   0,   0,   0,   0,   // Rank 8
];

const KNIGHT_PST: [i32; 64] = [
   -50, -40, -30, -30, -30, -30, -40, -50,
   -40, -20,   0,   5,   5,   0, -20, -40,
   -30,   5,  10,  15,  15,  10,   5, -30,
   -30,   0,  15,  20,  20,  15,   0, -30,
   -30,   5,  15,  20,  20,  15,   5, -30,
   -30,   0,  10,  15,  15,  10,   0, -30,
   -40, -20,   0,   0,   0,   0, -20, -40,
   -50, -40, -30, -30, -30, -30, -40, -50,
];

const BISHOP_PST: [i32; 64] = [
   -20, -10, -10, -10, -10, -10, -10, -20,
   -10,   5,   0,   0,   0,   0,   5, -10,
   -10,  10,  10,  10,  10,  10,  10, -10,
   -10,   0,  10,  10,  10,  10,   0, -10,
   -10,   5,   5,  10,  10,   5,   5, -10,
   -10,   0,   5,  10,  10,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10, -10, -10, -10, -10, -20,
];

const ROOK_PST: [i32; 64] = [
    0,   0,   0,   5,   5,   0,   0,   0,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
    5,  10,  10,  10,  10,  10,  10,   5,
    0,   0,   0,   0,   0,   0,   0,   0,
];

const QUEEN_PST: [i32; 64] = [
   -20, -10, -10,  -5,  -5, -10, -10, -20,
   -10,   0,   5,   0,   0,   0,   0, -10,
   -10,   5,   5,   5,   5,   5,   0, -10,
     0,   0,   5,   5,   5,   5,   0,  -5,
    -5,   0,   5,   5,   5,   5,   0,  -5,
   -10,   0,   5,   5,   5,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10,  -5,  -5, -10, -10, -20,
];

const KING_MIDDLEGAME_PST: [i32; 64] = [
    20,  30,  10,   0,   0,  10,  30,  20,
    20,  20,   0,   0,   0,   0,  20,  20,
   -10, -20, -20, -20, -20, -20, -20, -10,
   -20, -30, -30, -40, -40, -30, -30, -20,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
];

const KING_ENDGAME_PST: [i32; 64] = [
   -50, -30, -30, -30, -30, -30, -30, -50,
   -30, -30,   0,   0,   0,   0, -30, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -20, -10,   0,   0, -10, -20, -30,
   -50, -40, -30, -20, -20, -30, -40, -50,
];

// ============================================================================
// PAWN STRUCTURE AND KING TROPISM
// ============================================================================

// Per-file penalties, a-file first. Central weaknesses cost more.
const DOUBLED_PAWN_MG: [i32; 8] = [-10, -12, -15, -18, -18, -15, -12, -10];
const DOUBLED_PAWN_EG: [i32; 8] = [-20, -22, -25, -28, -28, -25, -22, -20];
const ISOLATED_PAWN_MG: [i32; 8] = [-8, -12, -16, -20, -20, -16, -12, -8];
const ISOLATED_PAWN_EG: [i32; 8] = [-12, -16, -20, -24, -24, -20, -16, -12];

/// Tropism weight per piece type; pawns and kings don't count.
const TROPISM_WEIGHTS: [i32; 7] = [0, 0, 3, 2, 2, 5, 0];
const MAX_MANHATTAN_DISTANCE: i32 = 14;
const TROPISM_SCALE: i32 = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Middlegame = 0,
    Endgame = 1,
}

/// Piece-square tables indexed by [phase][piece code][square], with black's
/// entries already mirrored.
static PIECE_SQUARE_TABLES: Lazy<Box<[[[i32; 64]; PIECE_CODES]; 2]>> = Lazy::new(|| {
    let mut tables = Box::new([[[0i32; 64]; PIECE_CODES]; 2]);
    for (phase, phase_tables) in tables.iter_mut().enumerate() {
        for kind in PAWN..=KING {
            let base = match kind {
                PAWN => &PAWN_PST,
                KNIGHT => &KNIGHT_PST,
                BISHOP => &BISHOP_PST,
                ROOK => &ROOK_PST,
                QUEEN => &QUEEN_PST,
                _ if phase == Phase::Endgame as usize => &KING_ENDGAME_PST,
                _ => &KING_MIDDLEGAME_PST,
            };
            for sq in 0..64 {
                let mirrored = (7 - rank_of(sq)) * 8 + file_of(sq);
                phase_tables[(WHITE | kind) as usize][sq] = base[sq];
                phase_tables[(BLACK | kind) as usize][sq] = base[mirrored];
            }
        }
    }
    tables
});

// ============================================================================
// EVALUATOR
// ============================================================================

/// Deterministic static evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Score of `position` for the side to move, `ply` plies from the root.
    pub fn score(&self, position: &Position, ply: u32) -> EvaluationScore {
        match position.state() {
            GameState::Checkmate => return EvaluationScore::mated_in(ply),
            GameState::Stalemate => return EvaluationScore::ZERO,
            _ => {}
        }
        if position.auto_draw_type() != AutoDrawType::None {
            return EvaluationScore::ZERO;
        }
        let white_score = evaluate_board(position.board());
        EvaluationScore::new(if position.white_to_move() { white_score } else { -white_score })
    }

    /// Material won by `mv` once the exchange on its target square has
    /// played out with each side recapturing with its cheapest piece.
    ///
    /// Negative means the move loses material.
    pub fn static_exchange(
        &self,
        position: &Position,
        mv: Move,
        control: &GameControlInfo,
    ) -> Result<i32, SearchError> {
        control.check()?;
        let flags = position.valid_moves().get(&mv).ok_or_else(|| {
            SearchError::InvariantViolation(format!("exchange of illegal move {mv} in {}", position.to_fen()))
        })?;
        let gain = capture_gain(flags.captured, flags.promotion);
        let child = position.make_move(mv);
        Ok(gain - self.exchange_on(&child, mv.to_sq(), control)?)
    }

    /// Best result for the side to move of continuing the exchange on `sq`;
    /// never below zero because that side may stop capturing.
    fn exchange_on(&self, position: &Position, sq: usize, control: &GameControlInfo) -> Result<i32, SearchError> {
        control.check()?;
        let cheapest = position
            .valid_moves()
            .iter()
            .filter(|(mv, flags)| mv.to_sq() == sq && flags.is_capture())
            .min_by_key(|(mv, flags)| (piece_value(flags.piece), -piece_value(mv.promotion), *mv));
        let Some((mv, flags)) = cheapest else {
            return Ok(0);
        };
        let gain = capture_gain(flags.captured, flags.promotion);
        let child = position.make_move(mv);
        Ok((gain - self.exchange_on(&child, sq, control)?).max(0))
    }
}

fn capture_gain(captured: u8, promotion: u8) -> i32 {
    let mut gain = piece_value(captured);
    if promotion != EMPTY {
        gain += piece_value(promotion) - PIECE_VALUES[PAWN as usize];
    }
    gain
}

// ============================================================================
// EVALUATION TERMS (white's perspective)
// ============================================================================

fn non_pawn_material(board: &Board, color: u8) -> i32 {
    board
        .squares
        .iter()
        .filter(|&&p| p != EMPTY && piece_color(p) == color)
        .map(|&p| piece_type(p))
        .filter(|&kind| kind != PAWN && kind != KING)
        .map(|kind| PIECE_VALUES[kind as usize])
        .sum()
}

fn game_phase(board: &Board) -> Phase {
    if non_pawn_material(board, WHITE) <= ENDGAME_MATERIAL_THRESHOLD
        && non_pawn_material(board, BLACK) <= ENDGAME_MATERIAL_THRESHOLD
    {
        Phase::Endgame
    } else {
        Phase::Middlegame
    }
}

/// Full static evaluation from white's perspective.
pub fn evaluate_board(board: &Board) -> i32 {
    let phase = game_phase(board);
    let values = match phase {
        Phase::Middlegame => &MIDDLEGAME_VALUES,
        Phase::Endgame => &ENDGAME_VALUES,
    };
    let pst = &PIECE_SQUARE_TABLES[phase as usize];

    let mut score = 0;
    for (sq, &piece) in board.squares.iter().enumerate() {
        if piece == EMPTY {
            continue;
        }
        let value = values[piece_type(piece) as usize] + pst[piece as usize][sq];
        if piece_color(piece) == WHITE {
            score += value;
        } else {
            score -= value;
        }
    }

    score += king_tropism(board, WHITE) - king_tropism(board, BLACK);
    score += pawn_structure(board, WHITE, phase) - pawn_structure(board, BLACK, phase);
    score
}

/// Pressure of `attacker`'s pieces on the enemy king.
fn king_tropism(board: &Board, attacker: u8) -> i32 {
    let defender_white = attacker == BLACK;
    let Some(king) = board.find_king(defender_white) else {
        return 0;
    };
    let weighted: i32 = board
        .squares
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p != EMPTY && piece_color(p) == attacker)
        .map(|(sq, &p)| {
            let distance = (file_of(sq) as i32 - file_of(king) as i32).abs()
                + (rank_of(sq) as i32 - rank_of(king) as i32).abs();
            TROPISM_WEIGHTS[piece_type(p) as usize] * (MAX_MANHATTAN_DISTANCE - distance)
        })
        .sum();
    weighted * TROPISM_SCALE / MAX_MANHATTAN_DISTANCE
}

fn pawn_structure(board: &Board, color: u8, phase: Phase) -> i32 {
    let pawn = color | PAWN;
    let mut files = [0i32; 8];
    for (sq, &p) in board.squares.iter().enumerate() {
        if p == pawn {
            files[file_of(sq)] += 1;
        }
    }

    let (doubled, isolated) = match phase {
        Phase::Middlegame => (&DOUBLED_PAWN_MG, &ISOLATED_PAWN_MG),
        Phase::Endgame => (&DOUBLED_PAWN_EG, &ISOLATED_PAWN_EG),
    };

    let mut score = 0;
    for file in 0..8 {
        let count = files[file];
        if count == 0 {
            continue;
        }
        if count > 1 {
            score += doubled[file] * (count - 1);
        }
        let left = file > 0 && files[file - 1] > 0;
        let right = file < 7 && files[file + 1] > 0;
        if !left && !right {
            score += isolated[file] * count;
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::InterruptionStatus;

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn symmetric_start_is_level() {
        let start = Position::starting();
        assert_eq!(Evaluator::new().score(&start, 0), EvaluationScore::ZERO);
        let black = position("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1");
        assert_eq!(Evaluator::new().score(&black, 0), EvaluationScore::ZERO);
    }

    #[test]
    fn score_is_from_the_side_to_move() {
        let white = position("4k3/8/8/8/8/8/8/3QK3 w - - 0 1");
        let black = position("4k3/8/8/8/8/8/8/3QK3 b - - 0 1");
        let evaluator = Evaluator::new();
        assert!(evaluator.score(&white, 0).value() > 800);
        assert_eq!(evaluator.score(&black, 0), -evaluator.score(&white, 0));
    }

    #[test]
    fn terminal_positions() {
        let evaluator = Evaluator::new();
        let mated = position("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1");
        assert_eq!(evaluator.score(&mated, 3), EvaluationScore::mated_in(3));
        let stalemate = position("7k/5Q2/8/8/8/8/8/6K1 b - - 0 1");
        assert_eq!(evaluator.score(&stalemate, 2), EvaluationScore::ZERO);
        let bare_kings = position("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(evaluator.score(&bare_kings, 0), EvaluationScore::ZERO);
    }

    #[test]
    fn black_tables_mirror_white() {
        let tables = &PIECE_SQUARE_TABLES[Phase::Middlegame as usize];
        // e2 for white matches e7 for black.
        assert_eq!(tables[WHITE_PAWN as usize][12], tables[BLACK_PAWN as usize][52]);
        assert_eq!(tables[WHITE_KING as usize][6], tables[BLACK_KING as usize][62]);
    }

    #[test]
    fn doubled_and_isolated_pawns_are_penalised() {
        let healthy = position("4k3/8/8/8/8/8/3PP3/4K3 w - - 0 1");
        let doubled = position("4k3/8/8/8/8/4P3/4P3/4K3 w - - 0 1");
        assert!(pawn_structure(healthy.board(), WHITE, Phase::Endgame) == 0);
        assert!(pawn_structure(doubled.board(), WHITE, Phase::Endgame) < 0);
    }

    #[test]
    fn exchange_on_defended_knight() {
        // dxe5, dxe5: pawn for knight.
        let pos = position("4k3/8/3p4/4n3/3P4/8/8/4K3 w - - 0 1");
        let control = GameControlInfo::new();
        let see = Evaluator::new().static_exchange(&pos, Move::new(27, 36), &control).unwrap();
        assert_eq!(see, 220);
    }

    #[test]
    fn exchange_losing_the_queen_is_negative() {
        let pos = position("4k3/8/3p4/4p3/8/8/8/4QK2 w - - 0 1");
        let control = GameControlInfo::new();
        let see = Evaluator::new().static_exchange(&pos, Move::new(4, 36), &control).unwrap();
        assert_eq!(see, -800);
    }

    #[test]
    fn exchange_polls_the_control_block() {
        let pos = position("4k3/8/3p4/4n3/3P4/8/8/4K3 w - - 0 1");
        let control = GameControlInfo::new();
        control.cancel();
        assert_eq!(
            Evaluator::new().static_exchange(&pos, Move::new(27, 36), &control),
            Err(SearchError::Interrupted(InterruptionStatus::Cancelled))
        );
    }
}
