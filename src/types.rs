//! Piece and square encoding shared by the board, the evaluator and the search.
//!
//! A piece is a single byte: the lower three bits hold the piece type and
//! bits 3-4 hold the colour. Squares are indices 0..64 with a1 = 0, h8 = 63.

/// Piece type constants (lower 3 bits)
pub const EMPTY: u8 = 0;
pub const PAWN: u8 = 1;
pub const KNIGHT: u8 = 2;
pub const BISHOP: u8 = 3;
pub const ROOK: u8 = 4;
pub const QUEEN: u8 = 5;
pub const KING: u8 = 6;

/// Colour constants (bits 3-4)
pub const WHITE: u8 = 8;
pub const BLACK: u8 = 16;

pub const PIECE_MASK: u8 = 0b111;
pub const COLOR_MASK: u8 = 0b11000;

/// Number of distinct piece codes; tables indexed by a full piece byte use this.
pub const PIECE_CODES: usize = 32;

pub const WHITE_PAWN: u8 = WHITE | PAWN;
pub const WHITE_KNIGHT: u8 = WHITE | KNIGHT;
pub const WHITE_BISHOP: u8 = WHITE | BISHOP;
pub const WHITE_ROOK: u8 = WHITE | ROOK;
pub const WHITE_QUEEN: u8 = WHITE | QUEEN;
pub const WHITE_KING: u8 = WHITE | KING;

pub const BLACK_PAWN: u8 = BLACK | PAWN;
pub const BLACK_KNIGHT: u8 = BLACK | KNIGHT;
pub const BLACK_BISHOP: u8 = BLACK | BISHOP;
pub const BLACK_ROOK: u8 = BLACK | ROOK;
pub const BLACK_QUEEN: u8 = BLACK | QUEEN;
pub const BLACK_KING: u8 = BLACK | KING;

/// Castling rights bitmasks
pub const CASTLE_WK: u8 = 1;
pub const CASTLE_WQ: u8 = 2;
pub const CASTLE_BK: u8 = 4;
pub const CASTLE_BQ: u8 = 8;

const FILE_NAMES: &[u8; 8] = b"abcdefgh";
const RANK_NAMES: &[u8; 8] = b"12345678";

#[inline]
pub fn piece_type(piece: u8) -> u8 {
    piece & PIECE_MASK
}

#[inline]
pub fn piece_color(piece: u8) -> u8 {
    piece & COLOR_MASK
}

#[inline]
pub fn color_of_side(white: bool) -> u8 {
    if white {
        WHITE
    } else {
        BLACK
    }
}

#[inline]
pub fn file_of(sq: usize) -> usize {
    sq % 8
}

#[inline]
pub fn rank_of(sq: usize) -> usize {
    sq / 8
}

/// Square index to algebraic notation, e.g. `28` -> `"e4"`.
pub fn square_name(sq: usize) -> String {
    format!(
        "{}{}",
        FILE_NAMES[file_of(sq)] as char,
        RANK_NAMES[rank_of(sq)] as char
    )
}

/// Algebraic notation to square index.
pub fn parse_square(name: &str) -> Option<usize> {
    let mut chars = name.chars();
    let file = match chars.next()? {
        c @ 'a'..='h' => c as usize - 'a' as usize,
        _ => return None,
    };
    let rank = match chars.next()? {
        c @ '1'..='8' => c as usize - '1' as usize,
        _ => return None,
    };
    Some(rank * 8 + file)
}

pub fn fen_to_piece(c: char) -> Option<u8> {
    let color = if c.is_ascii_uppercase() { WHITE } else { BLACK };
    let kind = match c.to_ascii_lowercase() {
        'p' => PAWN,
        'n' => KNIGHT,
        'b' => BISHOP,
        'r' => ROOK,
        'q' => QUEEN,
        'k' => KING,
        _ => return None,
    };
    Some(color | kind)
}

pub fn piece_to_fen(piece: u8) -> Option<char> {
    let c = match piece_type(piece) {
        PAWN => 'p',
        KNIGHT => 'n',
        BISHOP => 'b',
        ROOK => 'r',
        QUEEN => 'q',
        KING => 'k',
        _ => return None,
    };
    Some(if piece_color(piece) == WHITE {
        c.to_ascii_uppercase()
    } else {
        c
    })
}

/// Lowercase promotion suffix used in UCI move strings.
pub fn promotion_char(kind: u8) -> Option<char> {
    match kind {
        QUEEN => Some('q'),
        ROOK => Some('r'),
        BISHOP => Some('b'),
        KNIGHT => Some('n'),
        _ => None,
    }
}
