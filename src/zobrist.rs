//! Zobrist key tables.
//!
//! The tables are generated once per process from a fixed seed, so keys are
//! stable across runs and threads.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::board::Board;
use crate::types::{EMPTY, PIECE_CODES};

pub struct ZobristKeys {
    piece_keys: [[u64; 64]; PIECE_CODES],
    side_key: u64,
    castling_keys: [u64; 16],
    /// Indexed by en passant file; slot 8 means "no en passant square".
    ep_keys: [u64; 9],
}

static KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::generate);

impl ZobristKeys {
    fn generate() -> Self {
        let mut rng = StdRng::seed_from_u64(12345);

        let mut piece_keys = [[0u64; 64]; PIECE_CODES];
        for piece in piece_keys.iter_mut() {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }
        let side_key = rng.gen();
        let mut castling_keys = [0u64; 16];
        for key in castling_keys.iter_mut() {
            *key = rng.gen();
        }
        let mut ep_keys = [0u64; 9];
        for key in ep_keys.iter_mut() {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            side_key,
            castling_keys,
            ep_keys,
        }
    }

    /// Shared process-wide tables.
    pub fn shared() -> &'static ZobristKeys {
        &KEYS
    }

    pub fn hash(&self, board: &Board) -> u64 {
        let mut h = 0u64;
        for (sq, &piece) in board.squares.iter().enumerate() {
            if piece != EMPTY {
                h ^= self.piece_keys[piece as usize][sq];
            }
        }
        if !board.white_to_move {
            h ^= self.side_key;
        }
        h ^= self.castling_keys[(board.castling_rights & 0xf) as usize];
        let ep_index = board.en_passant_square.map_or(8, |sq| (sq % 8) as usize);
        h ^ self.ep_keys[ep_index]
    }
}

/// Zobrist key of a board using the shared tables.
pub fn hash_board(board: &Board) -> u64 {
    ZobristKeys::shared().hash(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Move, STARTING_FEN};

    #[test]
    fn transposed_move_orders_reach_the_same_key() {
        let start = Board::from_fen(STARTING_FEN).unwrap();
        let mut a = start.clone();
        for mv in [Move::new(6, 21), Move::new(62, 45), Move::new(1, 18), Move::new(57, 42)] {
            a.apply_move(mv);
        }
        let mut b = start.clone();
        for mv in [Move::new(1, 18), Move::new(57, 42), Move::new(6, 21), Move::new(62, 45)] {
            b.apply_move(mv);
        }
        assert_eq!(hash_board(&a), hash_board(&b));
        assert_ne!(hash_board(&a), hash_board(&start));
    }

    #[test]
    fn side_to_move_changes_the_key() {
        let white = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let black = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(hash_board(&white), hash_board(&black));
    }
}
