//! Killer moves and the history heuristic.
//!
//! Both tables are shared by every root-move worker of a request and are
//! cleared at the start of each request, so results never depend on an
//! earlier search.

use parking_lot::Mutex;

use crate::board::Move;
use crate::types::PIECE_CODES;

/// Deepest ply that keeps killer moves.
pub const MAX_KILLER_PLY: usize = 128;

/// History scores are clamped to +/- this value.
pub const HISTORY_LIMIT: i32 = 1 << 20;

/// The two most recent quiet cutoff moves at one ply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillerMoveData {
    pub primary: Option<Move>,
    pub secondary: Option<Move>,
}

impl KillerMoveData {
    /// Record a new killer; the old primary moves to the secondary slot.
    pub fn record(&mut self, mv: Move) {
        if self.primary == Some(mv) {
            return;
        }
        self.secondary = self.primary;
        self.primary = Some(mv);
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.primary == Some(mv) || self.secondary == Some(mv)
    }
}

/// History scores indexed by [piece code][destination square].
#[derive(Clone)]
pub struct HistoryTable {
    scores: Box<[[i32; 64]; PIECE_CODES]>,
}

impl HistoryTable {
    fn new() -> Self {
        HistoryTable {
            scores: Box::new([[0; 64]; PIECE_CODES]),
        }
    }

    #[inline]
    pub fn score(&self, piece: u8, to: usize) -> i32 {
        self.scores[piece as usize & (PIECE_CODES - 1)][to]
    }

    fn adjust(&mut self, piece: u8, to: usize, delta: i32) {
        let slot = &mut self.scores[piece as usize & (PIECE_CODES - 1)][to];
        *slot = slot.saturating_add(delta).clamp(-HISTORY_LIMIT, HISTORY_LIMIT);
    }
}

struct Tables {
    killers: Vec<KillerMoveData>,
    history: HistoryTable,
}

impl Tables {
    fn new() -> Self {
        Tables {
            killers: vec![KillerMoveData::default(); MAX_KILLER_PLY],
            history: HistoryTable::new(),
        }
    }
}

/// Killer and history statistics behind one lock.
pub struct MoveHistoryStatistics {
    tables: Mutex<Tables>,
}

impl MoveHistoryStatistics {
    pub fn new() -> Self {
        MoveHistoryStatistics {
            tables: Mutex::new(Tables::new()),
        }
    }

    pub fn clear(&self) {
        *self.tables.lock() = Tables::new();
    }

    /// Read killers for `ply` and the history table under a single lock.
    pub fn with_tables<R>(&self, ply: u32, f: impl FnOnce(KillerMoveData, &HistoryTable) -> R) -> R {
        let tables = self.tables.lock();
        let killers = tables.killers.get(ply as usize).copied().unwrap_or_default();
        f(killers, &tables.history)
    }

    /// A quiet move `mv` by `piece` caused a beta cutoff at `ply` with
    /// `depth` plies remaining. `tried_quiets` are the quiet moves searched
    /// before it at the same node, with their moving pieces.
    pub fn record_cutoff(&self, ply: u32, mv: Move, piece: u8, depth: i32, tried_quiets: &[(Move, u8)]) {
        let bonus = depth.max(1).saturating_mul(depth.max(1));
        let mut tables = self.tables.lock();
        if let Some(killers) = tables.killers.get_mut(ply as usize) {
            killers.record(mv);
        }
        tables.history.adjust(piece, mv.to_sq(), bonus);
        for &(tried, tried_piece) in tried_quiets {
            if tried != mv {
                tables.history.adjust(tried_piece, tried.to_sq(), -bonus);
            }
        }
    }
}

impl Default for MoveHistoryStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WHITE_KNIGHT, WHITE_PAWN};

    fn killers(stats: &MoveHistoryStatistics, ply: u32) -> KillerMoveData {
        stats.with_tables(ply, |killers, _| killers)
    }

    fn history(stats: &MoveHistoryStatistics, piece: u8, to: usize) -> i32 {
        stats.with_tables(0, |_, history| history.score(piece, to))
    }

    #[test]
    fn killers_shift_and_ignore_repeats() {
        let mut killers = KillerMoveData::default();
        let a = Move::new(6, 21);
        let b = Move::new(1, 18);
        killers.record(a);
        killers.record(a);
        assert_eq!(killers.primary, Some(a));
        assert_eq!(killers.secondary, None);
        killers.record(b);
        assert_eq!(killers.primary, Some(b));
        assert_eq!(killers.secondary, Some(a));
        assert!(killers.contains(a));
        assert!(!killers.contains(Move::new(12, 28)));
    }

    #[test]
    fn cutoff_rewards_the_move_and_punishes_earlier_quiets() {
        let stats = MoveHistoryStatistics::new();
        let cut = Move::new(6, 21);
        let tried = Move::new(12, 20);
        stats.record_cutoff(3, cut, WHITE_KNIGHT, 4, &[(tried, WHITE_PAWN), (cut, WHITE_KNIGHT)]);
        assert_eq!(history(&stats, WHITE_KNIGHT, 21), 16);
        assert_eq!(history(&stats, WHITE_PAWN, 20), -16);
        assert_eq!(killers(&stats, 3).primary, Some(cut));
        assert_eq!(killers(&stats, 2), KillerMoveData::default());
    }

    #[test]
    fn history_is_clamped_and_cleared() {
        let stats = MoveHistoryStatistics::new();
        let mv = Move::new(6, 21);
        for _ in 0..2000 {
            stats.record_cutoff(0, mv, WHITE_KNIGHT, 40, &[]);
        }
        assert_eq!(history(&stats, WHITE_KNIGHT, 21), HISTORY_LIMIT);
        stats.clear();
        assert_eq!(history(&stats, WHITE_KNIGHT, 21), 0);
        assert_eq!(killers(&stats, 0).primary, None);
    }

    #[test]
    fn plies_beyond_the_killer_table_are_ignored() {
        let stats = MoveHistoryStatistics::new();
        stats.record_cutoff(MAX_KILLER_PLY as u32 + 5, Move::new(6, 21), WHITE_KNIGHT, 2, &[]);
        assert_eq!(killers(&stats, MAX_KILLER_PLY as u32 + 5), KillerMoveData::default());
        assert_eq!(history(&stats, WHITE_KNIGHT, 21), 4);
    }
}
