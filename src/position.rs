//! Immutable game positions.
//!
//! `Position` is the value the search walks: making a move returns a new
//! position and never mutates the parent. Legal moves are generated lazily on
//! first use and cached, so a position that is only scored statically never
//! pays for move generation it doesn't need.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::board::{Board, Move, MoveFlags, STARTING_FEN};
use crate::error::PositionError;
use crate::move_generator::MoveGenerator;
use crate::zobrist::hash_board;

/// Terminal-state classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Default,
    Check,
    DoubleCheck,
    Checkmate,
    Stalemate,
}

impl GameState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Checkmate | GameState::Stalemate)
    }

    pub fn is_check(self) -> bool {
        matches!(self, GameState::Check | GameState::DoubleCheck | GameState::Checkmate)
    }
}

/// Draws that apply without either side claiming them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoDrawType {
    None,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

/// Legal moves of a position with their flags, in generation order.
#[derive(Debug, Clone, Default)]
pub struct ValidMoves {
    moves: Vec<(Move, MoveFlags)>,
}

impl ValidMoves {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn get(&self, mv: &Move) -> Option<MoveFlags> {
        self.moves.iter().find(|(m, _)| m == mv).map(|(_, f)| *f)
    }

    pub fn contains(&self, mv: &Move) -> bool {
        self.get(mv).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Move, MoveFlags)> + '_ {
        self.moves.iter().copied()
    }

    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.moves.iter().map(|(m, _)| *m)
    }
}

#[derive(Clone)]
pub struct Position {
    board: Board,
    key: u64,
    /// Keys of earlier positions since the last irreversible move, oldest first.
    history: Vec<u64>,
    valid_moves: OnceCell<ValidMoves>,
    checkers: OnceCell<u32>,
}

impl Position {
    fn from_board(board: Board, history: Vec<u64>) -> Self {
        let key = hash_board(&board);
        Position {
            board,
            key,
            history,
            valid_moves: OnceCell::new(),
            checkers: OnceCell::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        Ok(Self::from_board(Board::from_fen(fen)?, Vec::new()))
    }

    pub fn starting() -> Self {
        // The built-in FEN is known to be valid.
        match Self::from_fen(STARTING_FEN) {
            Ok(position) => position,
            Err(err) => unreachable!("starting FEN rejected: {err}"),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_fen(&self) -> String {
        self.board.to_fen()
    }

    #[inline]
    pub fn zobrist_key(&self) -> u64 {
        self.key
    }

    #[inline]
    pub fn white_to_move(&self) -> bool {
        self.board.white_to_move
    }

    pub fn valid_moves(&self) -> &ValidMoves {
        self.valid_moves.get_or_init(|| ValidMoves {
            moves: MoveGenerator::new().generate_legal_moves(&self.board),
        })
    }

    fn checkers(&self) -> u32 {
        *self.checkers.get_or_init(|| MoveGenerator::new().checkers(&self.board))
    }

    pub fn is_in_check(&self) -> bool {
        self.checkers() > 0
    }

    pub fn state(&self) -> GameState {
        let checkers = self.checkers();
        let no_moves = self.valid_moves().is_empty();
        match (checkers, no_moves) {
            (0, true) => GameState::Stalemate,
            (_, true) => GameState::Checkmate,
            (0, false) => GameState::Default,
            (1, false) => GameState::Check,
            _ => GameState::DoubleCheck,
        }
    }

    pub fn auto_draw_type(&self) -> AutoDrawType {
        if self.board.has_insufficient_material() {
            AutoDrawType::InsufficientMaterial
        } else if self.board.halfmove_clock >= 100 {
            AutoDrawType::FiftyMoveRule
        } else if self.history.iter().filter(|&&k| k == self.key).count() >= 2 {
            AutoDrawType::ThreefoldRepetition
        } else {
            AutoDrawType::None
        }
    }

    /// The position after `mv`. `mv` must be one of `valid_moves()`.
    pub fn make_move(&self, mv: Move) -> Position {
        debug_assert!(self.valid_moves().contains(&mv), "illegal move {mv} in {}", self.to_fen());
        let mut board = self.board.clone();
        board.apply_move(mv);
        let history = if board.halfmove_clock == 0 {
            Vec::new()
        } else {
            let mut history = Vec::with_capacity(self.history.len() + 1);
            history.extend_from_slice(&self.history);
            history.push(self.key);
            history
        };
        Position::from_board(board, history)
    }

    /// The position with the turn passed to the opponent.
    pub fn make_null_move(&self) -> Position {
        let mut board = self.board.clone();
        board.apply_null_move();
        let mut history = self.history.clone();
        history.push(self.key);
        Position::from_board(board, history)
    }

    /// Apply a move given in UCI notation, checking legality.
    pub fn try_make_uci_move(&self, uci: &str) -> Result<Position, PositionError> {
        let mv = self
            .valid_moves()
            .moves()
            .find(|m| m.to_uci() == uci)
            .ok_or_else(|| PositionError::IllegalMove(uci.to_string()))?;
        Ok(self.make_move(mv))
    }

    /// Leaf count of the legal move tree to `depth`.
    pub fn perft(&self, depth: u32) -> u64 {
        match depth {
            0 => 1,
            1 => self.valid_moves().len() as u64,
            _ => self
                .valid_moves()
                .moves()
                .map(|mv| self.make_move(mv).perft(depth - 1))
                .sum(),
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("key", &format_args!("{:#018x}", self.key))
            .finish()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::starting()
    }
}
