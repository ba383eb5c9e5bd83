//! Opening book lookup.
//!
//! The driver consults a book before searching. Books are looked up through
//! the [`OpeningBook`] trait; [`MemoryBook`] is a simple in-memory
//! implementation keyed by zobrist key.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::board::Move;
use crate::error::PositionError;
use crate::position::Position;

/// A candidate book move and its relative weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookMove {
    pub mv: Move,
    pub weight: u32,
}

pub trait OpeningBook: Send + Sync {
    /// Book moves for `position`; empty when the position is out of book.
    fn find_possible_moves(&self, position: &Position) -> Vec<BookMove>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBook {
    entries: HashMap<u64, Vec<BookMove>>,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `uci` as a book move for `position` with `weight`.
    pub fn add(&mut self, position: &Position, uci: &str, weight: u32) -> Result<(), PositionError> {
        let mv = position
            .valid_moves()
            .moves()
            .find(|m| m.to_uci() == uci)
            .ok_or_else(|| PositionError::IllegalMove(uci.to_string()))?;
        self.entries
            .entry(position.zobrist_key())
            .or_default()
            .push(BookMove { mv, weight });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OpeningBook for MemoryBook {
    fn find_possible_moves(&self, position: &Position) -> Vec<BookMove> {
        self.entries
            .get(&position.zobrist_key())
            .cloned()
            .unwrap_or_default()
    }
}

/// Weighted random pick among the book moves that are legal in `position`.
/// Zero weights are treated as equally likely when no move has weight.
pub fn pick_book_move<R: Rng + ?Sized>(position: &Position, moves: &[BookMove], rng: &mut R) -> Option<Move> {
    let legal: Vec<&BookMove> = moves
        .iter()
        .filter(|b| position.valid_moves().contains(&b.mv))
        .collect();
    if legal.is_empty() {
        return None;
    }
    let weights: Vec<u32> = if legal.iter().all(|b| b.weight == 0) {
        vec![1; legal.len()]
    } else {
        legal.iter().map(|b| b.weight).collect()
    };
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(legal[dist.sample(rng)].mv)
}
