//! Legal move generation and attack detection on the mailbox board.
//!
//! Moves are generated pseudo-legally per piece, then filtered by applying
//! each one to a scratch board and testing the mover's king. The same scratch
//! board tells us whether the move gives check, so `MoveFlags` come for free.

use crate::board::{Board, Move, MoveFlags};
use crate::types::*;

const ROOK_DIRECTIONS: [i32; 4] = [8, -8, -1, 1];
const BISHOP_DIRECTIONS: [i32; 4] = [7, 9, -7, -9];
const QUEEN_DIRECTIONS: [i32; 8] = [8, -8, -1, 1, 7, 9, -7, -9];
const KNIGHT_OFFSETS: [i32; 8] = [17, 15, 10, 6, -6, -10, -15, -17];
const PROMOTION_PIECES: [u8; 4] = [QUEEN, ROOK, BISHOP, KNIGHT];

/// One step along a ray; `None` when the step leaves the board or wraps a file edge.
#[inline]
fn step(sq: usize, direction: i32) -> Option<usize> {
    let next = sq as i32 + direction;
    if !(0..64).contains(&next) {
        return None;
    }
    let expected_file_delta = match direction.rem_euclid(8) {
        1 => 1,
        7 => -1,
        _ => 0,
    };
    let next = next as usize;
    (file_of(next) as i32 - file_of(sq) as i32 == expected_file_delta).then_some(next)
}

/// A non-sliding jump (knight or king) bounded by `max_file_delta`.
#[inline]
fn leap(sq: usize, offset: i32, max_file_delta: i32) -> Option<usize> {
    let next = sq as i32 + offset;
    if !(0..64).contains(&next) {
        return None;
    }
    let next = next as usize;
    ((file_of(next) as i32 - file_of(sq) as i32).abs() <= max_file_delta).then_some(next)
}

/// Move generator for mailbox boards
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        MoveGenerator
    }

    /// All legal moves in generation order, each with its flags.
    pub fn generate_legal_moves(&self, board: &Board) -> Vec<(Move, MoveFlags)> {
        let pseudo_legal = self.generate_pseudo_legal_moves(board);
        let mut legal = Vec::with_capacity(pseudo_legal.len());
        let mover_white = board.white_to_move;

        for mv in pseudo_legal {
            let mut scratch = board.clone();
            let is_castling = board.is_castling_move(mv);
            let is_en_passant = board.is_en_passant_move(mv);
            scratch.apply_move(mv);

            let own_king_safe = scratch
                .find_king(mover_white)
                .map_or(false, |king| !self.is_square_attacked(&scratch, king, !mover_white));
            if !own_king_safe {
                continue;
            }

            let gives_check = scratch
                .find_king(!mover_white)
                .map_or(false, |king| self.is_square_attacked(&scratch, king, mover_white));

            let captured = if is_en_passant {
                color_of_side(!mover_white) | PAWN
            } else {
                board.squares[mv.to_sq()]
            };

            legal.push((
                mv,
                MoveFlags {
                    piece: board.squares[mv.from_sq()],
                    captured,
                    promotion: mv.promotion,
                    is_castling,
                    is_en_passant,
                    gives_check,
                },
            ));
        }

        legal
    }

    /// Pseudo-legal moves (may leave the own king in check).
    pub fn generate_pseudo_legal_moves(&self, board: &Board) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        let color = board.side_color();

        for sq in 0..64 {
            let piece = board.squares[sq];
            if piece == EMPTY || piece_color(piece) != color {
                continue;
            }
            match piece_type(piece) {
                PAWN => self.generate_pawn_moves(board, sq, &mut moves),
                KNIGHT => self.generate_knight_moves(board, sq, &mut moves),
                BISHOP => self.generate_sliding_moves(board, sq, &BISHOP_DIRECTIONS, &mut moves),
                ROOK => self.generate_sliding_moves(board, sq, &ROOK_DIRECTIONS, &mut moves),
                QUEEN => self.generate_sliding_moves(board, sq, &QUEEN_DIRECTIONS, &mut moves),
                KING => self.generate_king_moves(board, sq, &mut moves),
                _ => {}
            }
        }

        moves
    }

    fn push_pawn_move(moves: &mut Vec<Move>, from: usize, to: usize, promotes: bool) {
        if promotes {
            moves.extend(PROMOTION_PIECES.iter().map(|&p| Move::with_promotion(from, to, p)));
        } else {
            moves.push(Move::new(from, to));
        }
    }

    fn generate_pawn_moves(&self, board: &Board, sq: usize, moves: &mut Vec<Move>) {
        let color = piece_color(board.squares[sq]);
        let white = color == WHITE;
        let forward: i32 = if white { 8 } else { -8 };
        let start_rank = if white { 1 } else { 6 };
        let promo_rank = if white { 7 } else { 0 };

        if let Some(to) = step(sq, forward) {
            if board.squares[to] == EMPTY {
                Self::push_pawn_move(moves, sq, to, rank_of(to) == promo_rank);
                if rank_of(sq) == start_rank {
                    if let Some(to2) = step(to, forward) {
                        if board.squares[to2] == EMPTY {
                            moves.push(Move::new(sq, to2));
                        }
                    }
                }
            }
        }

        for side in [-1, 1] {
            let Some(to) = step(sq, forward + side) else {
                continue;
            };
            let target = board.squares[to];
            if target != EMPTY && piece_color(target) != color {
                Self::push_pawn_move(moves, sq, to, rank_of(to) == promo_rank);
            } else if target == EMPTY && board.en_passant_square == Some(to as u8) {
                moves.push(Move::new(sq, to));
            }
        }
    }

    fn generate_knight_moves(&self, board: &Board, sq: usize, moves: &mut Vec<Move>) {
        let color = piece_color(board.squares[sq]);
        for &offset in &KNIGHT_OFFSETS {
            if let Some(to) = leap(sq, offset, 2) {
                let target = board.squares[to];
                if target == EMPTY || piece_color(target) != color {
                    moves.push(Move::new(sq, to));
                }
            }
        }
    }

    fn generate_sliding_moves(&self, board: &Board, sq: usize, directions: &[i32], moves: &mut Vec<Move>) {
        let color = piece_color(board.squares[sq]);
        for &direction in directions {
            let mut current = sq;
            while let Some(next) = step(current, direction) {
                let target = board.squares[next];
                if target == EMPTY {
                    moves.push(Move::new(sq, next));
                } else {
                    if piece_color(target) != color {
                        moves.push(Move::new(sq, next));
                    }
                    break;
                }
                current = next;
            }
        }
    }

    fn generate_king_moves(&self, board: &Board, sq: usize, moves: &mut Vec<Move>) {
        let color = piece_color(board.squares[sq]);
        for &direction in &QUEEN_DIRECTIONS {
            if let Some(to) = step(sq, direction) {
                let target = board.squares[to];
                if target == EMPTY || piece_color(target) != color {
                    moves.push(Move::new(sq, to));
                }
            }
        }

        let white = color == WHITE;
        let (home, kingside, queenside) = if white {
            (4, CASTLE_WK, CASTLE_WQ)
        } else {
            (60, CASTLE_BK, CASTLE_BQ)
        };
        if sq != home || self.is_square_attacked(board, sq, !white) {
            return;
        }

        let empty = |squares: &[usize]| squares.iter().all(|&s| board.squares[s] == EMPTY);
        let safe = |squares: &[usize]| squares.iter().all(|&s| !self.is_square_attacked(board, s, !white));

        if board.castling_rights & kingside != 0
            && board.squares[home + 3] == (color | ROOK)
            && empty(&[home + 1, home + 2])
            && safe(&[home + 1, home + 2])
        {
            moves.push(Move::new(sq, home + 2));
        }
        if board.castling_rights & queenside != 0
            && board.squares[home - 4] == (color | ROOK)
            && empty(&[home - 1, home - 2, home - 3])
            && safe(&[home - 1, home - 2])
        {
            moves.push(Move::new(sq, home - 2));
        }
    }

    /// True if `sq` is attacked by the given side.
    pub fn is_square_attacked(&self, board: &Board, sq: usize, by_white: bool) -> bool {
        self.count_attackers(board, sq, by_white, 1) > 0
    }

    /// Count pieces of the given side attacking `sq`, stopping early at `limit`.
    pub fn count_attackers(&self, board: &Board, sq: usize, by_white: bool, limit: u32) -> u32 {
        let attacker_color = color_of_side(by_white);
        let is_attacker = |target: usize, kinds: &[u8]| {
            let piece = board.squares[target];
            piece != EMPTY && piece_color(piece) == attacker_color && kinds.contains(&piece_type(piece))
        };
        let mut count = 0;

        // A pawn attacks diagonally forward, so look diagonally backward from `sq`.
        let pawn_back: i32 = if by_white { -8 } else { 8 };
        for side in [-1, 1] {
            if step(sq, pawn_back + side).map_or(false, |s| is_attacker(s, &[PAWN])) {
                count += 1;
            }
        }
        for &offset in &KNIGHT_OFFSETS {
            if leap(sq, offset, 2).map_or(false, |s| is_attacker(s, &[KNIGHT])) {
                count += 1;
            }
        }
        for &direction in &QUEEN_DIRECTIONS {
            if step(sq, direction).map_or(false, |s| is_attacker(s, &[KING])) {
                count += 1;
            }
        }
        if count >= limit {
            return count;
        }

        for (directions, kinds) in [(&ROOK_DIRECTIONS, [ROOK, QUEEN]), (&BISHOP_DIRECTIONS, [BISHOP, QUEEN])] {
            for &direction in directions {
                let mut current = sq;
                while let Some(next) = step(current, direction) {
                    if board.squares[next] != EMPTY {
                        if is_attacker(next, &kinds) {
                            count += 1;
                        }
                        break;
                    }
                    current = next;
                }
                if count >= limit {
                    return count;
                }
            }
        }

        count
    }

    /// Number of pieces giving check to the side to move.
    pub fn checkers(&self, board: &Board) -> u32 {
        match board.find_king(board.white_to_move) {
            Some(king) => self.count_attackers(board, king, !board.white_to_move, 2),
            None => 0,
        }
    }

    pub fn is_in_check(&self, board: &Board) -> bool {
        self.checkers(board) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STARTING_FEN;

    fn legal(fen: &str) -> Vec<(Move, MoveFlags)> {
        MoveGenerator::new().generate_legal_moves(&Board::from_fen(fen).unwrap())
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        assert_eq!(legal(STARTING_FEN).len(), 20);
    }

    #[test]
    fn step_rejects_file_wraparound() {
        assert_eq!(step(7, 1), None);
        assert_eq!(step(8, -1), None);
        assert_eq!(step(7, 9), None);
        assert_eq!(step(0, 9), Some(9));
        assert_eq!(step(63, 8), None);
    }

    #[test]
    fn pinned_piece_cannot_move_off_the_pin() {
        // Knight on e2 is pinned by the rook on e8.
        let moves = legal("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1");
        assert!(moves.iter().all(|(m, _)| m.from != 12));
    }

    #[test]
    fn castling_is_blocked_through_an_attacked_square() {
        // Black rook on f8 covers f1, so only queenside castling remains.
        let moves = legal("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(moves.iter().any(|(m, f)| f.is_castling && m.to == 2));
        assert!(!moves.iter().any(|(m, f)| f.is_castling && m.to == 6));
    }

    #[test]
    fn flags_describe_captures_promotions_and_checks() {
        let moves = legal("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let (_, flags) = moves
            .iter()
            .find(|(m, _)| *m == Move::with_promotion(48, 57, QUEEN))
            .unwrap();
        assert_eq!(flags.captured, BLACK_ROOK);
        assert_eq!(flags.promotion, QUEEN);
        assert!(flags.gives_check);
        assert!(!flags.is_quiet());
    }

    #[test]
    fn en_passant_capture_is_flagged() {
        let moves = legal("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        let (_, flags) = moves.iter().find(|(m, _)| *m == Move::new(36, 43)).unwrap();
        assert!(flags.is_en_passant);
        assert_eq!(flags.captured, BLACK_PAWN);
    }

    #[test]
    fn double_check_is_counted() {
        // Rook on e1 and knight on f6 both check the king on e8.
        let board = Board::from_fen("4k3/8/5N2/8/8/8/8/K3R3 b - - 0 1").unwrap();
        assert_eq!(MoveGenerator::new().checkers(&board), 2);
    }
}
