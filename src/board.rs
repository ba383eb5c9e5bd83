//! Board representation: moves, move flags and the mutable mailbox board.
//!
//! `Board` is the low-level state that `Position` wraps. It knows how to parse
//! and print FEN and how to apply a move in place; legality is the move
//! generator's job.

use std::fmt;

use crate::error::PositionError;
use crate::types::*;

/// Starting position FEN
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A chess move: origin, destination and promotion piece type (`EMPTY` if none).
///
/// The derived ordering compares (from, to, promotion) and is used as the
/// deterministic tie-break wherever moves are sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub promotion: u8,
}

impl Move {
    pub const fn new(from: usize, to: usize) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            promotion: EMPTY,
        }
    }

    pub const fn with_promotion(from: usize, to: usize, promotion: u8) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            promotion,
        }
    }

    #[inline]
    pub fn from_sq(&self) -> usize {
        self.from as usize
    }

    #[inline]
    pub fn to_sq(&self) -> usize {
        self.to as usize
    }

    /// 16-bit encoding: bits 0-5 origin, 6-11 destination, 12-14 promotion.
    /// Zero is never a valid move because origin and destination differ.
    #[inline]
    pub fn pack(&self) -> u16 {
        (self.from as u16 & 0x3f)
            | ((self.to as u16 & 0x3f) << 6)
            | ((self.promotion as u16 & 0x7) << 12)
    }

    pub fn unpack(packed: u16) -> Option<Move> {
        let from = (packed & 0x3f) as u8;
        let to = ((packed >> 6) & 0x3f) as u8;
        let promotion = ((packed >> 12) & 0x7) as u8;
        if from == to {
            return None;
        }
        Some(Move { from, to, promotion })
    }

    /// UCI notation, e.g. `e2e4` or `e7e8q`.
    pub fn to_uci(&self) -> String {
        let mut uci = format!("{}{}", square_name(self.from_sq()), square_name(self.to_sq()));
        if let Some(c) = promotion_char(self.promotion) {
            uci.push(c);
        }
        uci
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// Facts about a legal move, computed once by the move generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveFlags {
    /// Full piece code of the moving piece.
    pub piece: u8,
    /// Full piece code of the captured piece, `EMPTY` for non-captures.
    pub captured: u8,
    pub promotion: u8,
    pub is_castling: bool,
    pub is_en_passant: bool,
    pub gives_check: bool,
}

impl MoveFlags {
    #[inline]
    pub fn is_capture(&self) -> bool {
        self.captured != EMPTY
    }

    #[inline]
    pub fn is_promotion(&self) -> bool {
        self.promotion != EMPTY
    }

    /// Neither a capture nor a promotion.
    #[inline]
    pub fn is_quiet(&self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }
}

/// Mailbox board state.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// 0 = a1, 1 = b1, ..., 63 = h8
    pub squares: [u8; 64],
    pub white_to_move: bool,
    /// Bitmask of `CASTLE_*` rights
    pub castling_rights: u8,
    pub en_passant_square: Option<u8>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let invalid = |reason: &str| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(invalid("empty string"));
        }

        let mut board = Board {
            squares: [EMPTY; 64],
            white_to_move: true,
            castling_rights: 0,
            en_passant_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        };

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid("piece placement must have 8 ranks"));
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else if let Some(piece) = fen_to_piece(c) {
                    if file >= 8 {
                        return Err(invalid("rank overflows 8 files"));
                    }
                    board.squares[rank * 8 + file] = piece;
                    file += 1;
                } else {
                    return Err(invalid(&format!("unexpected character '{c}'")));
                }
            }
            if file != 8 {
                return Err(invalid("rank does not cover 8 files"));
            }
        }

        let white_kings = board.squares.iter().filter(|&&p| p == WHITE_KING).count();
        let black_kings = board.squares.iter().filter(|&&p| p == BLACK_KING).count();
        if white_kings != 1 || black_kings != 1 {
            return Err(invalid("each side needs exactly one king"));
        }

        if let Some(side) = parts.get(1) {
            board.white_to_move = match *side {
                "w" => true,
                "b" => false,
                _ => return Err(invalid("side to move must be 'w' or 'b'")),
            };
        }

        if let Some(castling) = parts.get(2).filter(|c| **c != "-") {
            for c in castling.chars() {
                board.castling_rights |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(invalid("bad castling field")),
                };
            }
        }

        if let Some(ep) = parts.get(3).filter(|ep| **ep != "-") {
            let sq = parse_square(ep).ok_or_else(|| invalid("bad en passant square"))?;
            board.en_passant_square = Some(sq as u8);
        }

        if let Some(clock) = parts.get(4) {
            board.halfmove_clock = clock.parse().map_err(|_| invalid("bad halfmove clock"))?;
        }
        if let Some(number) = parts.get(5) {
            board.fullmove_number = number.parse().map_err(|_| invalid("bad fullmove number"))?;
        }

        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                let piece = self.squares[rank * 8 + file];
                match piece_to_fen(piece) {
                    None => empty_count += 1,
                    Some(c) => {
                        if empty_count > 0 {
                            fen.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        fen.push(c);
                    }
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.white_to_move { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            for (flag, c) in [(CASTLE_WK, 'K'), (CASTLE_WQ, 'Q'), (CASTLE_BK, 'k'), (CASTLE_BQ, 'q')] {
                if self.castling_rights & flag != 0 {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        match self.en_passant_square {
            Some(sq) => fen.push_str(&square_name(sq as usize)),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    #[inline]
    pub fn side_color(&self) -> u8 {
        color_of_side(self.white_to_move)
    }

    /// True when `mv` is a king stepping two files (castling).
    pub fn is_castling_move(&self, mv: Move) -> bool {
        piece_type(self.squares[mv.from_sq()]) == KING
            && (file_of(mv.from_sq()) as i32 - file_of(mv.to_sq()) as i32).abs() == 2
    }

    /// True when `mv` is a pawn capturing onto the en passant square.
    pub fn is_en_passant_move(&self, mv: Move) -> bool {
        piece_type(self.squares[mv.from_sq()]) == PAWN
            && self.en_passant_square == Some(mv.to)
            && file_of(mv.from_sq()) != file_of(mv.to_sq())
    }

    /// Apply a pseudo-legal move in place.
    pub fn apply_move(&mut self, mv: Move) {
        let from_sq = mv.from_sq();
        let to_sq = mv.to_sq();
        let piece = self.squares[from_sq];
        let captured = self.squares[to_sq];
        let kind = piece_type(piece);
        let castling = self.is_castling_move(mv);
        let en_passant = self.is_en_passant_move(mv);

        if kind == PAWN || captured != EMPTY {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if en_passant {
            let victim = if self.white_to_move { to_sq - 8 } else { to_sq + 8 };
            self.squares[victim] = EMPTY;
        }

        if castling {
            let (rook_from, rook_to) = match to_sq {
                6 => (7, 5),
                2 => (0, 3),
                62 => (63, 61),
                _ => (56, 59),
            };
            self.squares[rook_to] = self.squares[rook_from];
            self.squares[rook_from] = EMPTY;
        }

        self.squares[to_sq] = if mv.promotion != EMPTY {
            self.side_color() | mv.promotion
        } else {
            piece
        };
        self.squares[from_sq] = EMPTY;

        if kind == KING {
            self.castling_rights &= if self.white_to_move {
                !(CASTLE_WK | CASTLE_WQ)
            } else {
                !(CASTLE_BK | CASTLE_BQ)
            };
        }
        for (corner, right) in [(0, CASTLE_WQ), (7, CASTLE_WK), (56, CASTLE_BQ), (63, CASTLE_BK)] {
            if from_sq == corner || to_sq == corner {
                self.castling_rights &= !right;
            }
        }

        self.en_passant_square = None;
        if kind == PAWN && (to_sq as i32 - from_sq as i32).abs() == 16 {
            self.en_passant_square = Some(((from_sq + to_sq) / 2) as u8);
        }

        if !self.white_to_move {
            self.fullmove_number += 1;
        }
        self.white_to_move = !self.white_to_move;
    }

    /// Pass the turn without moving.
    pub fn apply_null_move(&mut self) {
        self.en_passant_square = None;
        self.halfmove_clock += 1;
        if !self.white_to_move {
            self.fullmove_number += 1;
        }
        self.white_to_move = !self.white_to_move;
    }

    pub fn find_king(&self, white: bool) -> Option<usize> {
        let king = color_of_side(white) | KING;
        self.squares.iter().position(|&p| p == king)
    }

    /// Draw by insufficient material: bare kings, a single minor piece, or
    /// one bishop each on same-coloured squares.
    pub fn has_insufficient_material(&self) -> bool {
        let pieces: Vec<(usize, u8)> = self
            .squares
            .iter()
            .enumerate()
            .filter(|(_, &p)| p != EMPTY && piece_type(p) != KING)
            .map(|(sq, &p)| (sq, p))
            .collect();

        match pieces.as_slice() {
            [] => true,
            [(_, p)] => matches!(piece_type(*p), KNIGHT | BISHOP),
            [(sq1, p1), (sq2, p2)] => {
                piece_type(*p1) == BISHOP
                    && piece_type(*p2) == BISHOP
                    && piece_color(*p1) != piece_color(*p2)
                    && (rank_of(*sq1) + file_of(*sq1)) % 2 == (rank_of(*sq2) + file_of(*sq2)) % 2
            }
            _ => false,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +---+---+---+---+---+---+---+---+")?;
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                let c = piece_to_fen(self.squares[rank * 8 + file]).unwrap_or(' ');
                write!(f, " {} |", c)?;
            }
            writeln!(f)?;
            writeln!(f, "  +---+---+---+---+---+---+---+---+")?;
        }
        write!(f, "    a   b   c   d   e   f   g   h")
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}
