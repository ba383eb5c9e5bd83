//! Alpha-beta search below a single root move.
//!
//! This module implements the recursive part of the search:
//! - Negamax with principal-variation search and fail-soft cutoffs
//! - Mate-distance pruning
//! - Transposition table probes and stores
//! - Killer/history move ordering
//! - Quiescence search over captures that don't lose material
//! - Aspiration windows around the previous iteration's score
//!
//! Every recursion step returns a `Result` so that an interruption polled at
//! any node unwinds the whole tree immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;
use smallvec::SmallVec;

use crate::board::Move;
use crate::config::SearchTuning;
use crate::control::GameControlInfo;
use crate::error::SearchError;
use crate::evaluation::Evaluator;
use crate::history::MoveHistoryStatistics;
use crate::move_ordering::{order_moves, order_tactical_moves};
use crate::position::{AutoDrawType, Position};
use crate::score::{negate, EvaluationScore, VariationLine};
use crate::transposition_table::{ScoreBound, TranspositionTable, TranspositionTableEntry};

/// Hard limit on recursion below the root.
pub const MAX_SEARCH_PLY: u32 = 128;

// ============================================================================
// NODE COUNTERS
// ============================================================================

/// Positions created by the search, overall and for the current iteration.
#[derive(Debug, Default)]
pub struct NodeCounters {
    total: AtomicU64,
    ply: AtomicU64,
}

impl NodeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.ply.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Nodes since the last [`start_ply`](Self::start_ply).
    pub fn ply(&self) -> u64 {
        self.ply.load(Ordering::Relaxed)
    }

    pub fn start_ply(&self) {
        self.ply.store(0, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.ply.store(0, Ordering::Relaxed);
    }
}

// ============================================================================
// SEARCH CONTEXT
// ============================================================================

/// Everything a search shares with its sibling root-move searches.
#[derive(Clone)]
pub struct SearchContext {
    pub tt: Arc<TranspositionTable>,
    pub stats: Arc<MoveHistoryStatistics>,
    pub control: Arc<GameControlInfo>,
    pub counters: Arc<NodeCounters>,
    pub evaluator: Evaluator,
    pub tuning: SearchTuning,
}

impl SearchContext {
    pub fn new(
        tt: Arc<TranspositionTable>,
        stats: Arc<MoveHistoryStatistics>,
        control: Arc<GameControlInfo>,
        counters: Arc<NodeCounters>,
        tuning: SearchTuning,
    ) -> Self {
        SearchContext {
            tt,
            stats,
            control,
            counters,
            evaluator: Evaluator::new(),
            tuning,
        }
    }
}

// ============================================================================
// ALPHA-BETA SEARCHER
// ============================================================================

pub struct AlphaBetaSearcher {
    ctx: SearchContext,
}

type TriedQuiets = SmallVec<[(Move, u8); 32]>;

impl AlphaBetaSearcher {
    pub fn new(ctx: SearchContext) -> Self {
        AlphaBetaSearcher { ctx }
    }

    /// Search the root move `mv` to `depth` plies and return its line, seen
    /// from the root's side to move and starting with `mv`.
    ///
    /// With a `previous` line from the last iteration the search starts in an
    /// aspiration window around its score; a window that fails is widened on
    /// the failing side by doubling its delta until the score falls inside.
    pub fn analyze_root_move(
        &self,
        root: &Position,
        mv: Move,
        depth: i32,
        previous: Option<&VariationLine>,
    ) -> Result<VariationLine, SearchError> {
        self.ctx.control.check()?;
        let child = self.make_child(root, mv);
        let local_value = -self.ctx.evaluator.score(&child, 1);
        let pv_tail = previous
            .filter(|line| line.first_move() == Some(mv))
            .map(|line| &line.moves()[1..]);

        let line = match previous {
            Some(previous) if self.ctx.tuning.use_aspiration_windows && depth > 1 => {
                self.aspiration_search(&child, mv, depth, previous.score(), pv_tail)?
            }
            _ => self.search_child(&child, mv, depth, EvaluationScore::MIN, EvaluationScore::MAX, pv_tail)?,
        };

        trace!("depth {depth} {mv}: {line}");
        line.with_local_value(local_value)
    }

    fn aspiration_search(
        &self,
        child: &Position,
        mv: Move,
        depth: i32,
        guess: EvaluationScore,
        pv_tail: Option<&[Move]>,
    ) -> Result<VariationLine, SearchError> {
        let mut low_delta = self.ctx.tuning.aspiration_delta;
        let mut high_delta = self.ctx.tuning.aspiration_delta;
        loop {
            let alpha = guess.offset(-low_delta);
            let beta = guess.offset(high_delta);
            let line = self.search_child(child, mv, depth, alpha, beta, pv_tail)?;
            let score = line.score();
            if score <= alpha && alpha > EvaluationScore::MIN {
                low_delta = low_delta.saturating_mul(2);
            } else if score >= beta && beta < EvaluationScore::MAX {
                high_delta = high_delta.saturating_mul(2);
            } else {
                return Ok(line);
            }
            trace!("aspiration miss for {mv} at depth {depth}: {score} outside ({alpha}, {beta})");
        }
    }

    /// Search the position after `mv` and express the result from the
    /// parent's point of view.
    fn search_child(
        &self,
        child: &Position,
        mv: Move,
        depth: i32,
        alpha: EvaluationScore,
        beta: EvaluationScore,
        pv_tail: Option<&[Move]>,
    ) -> Result<VariationLine, SearchError> {
        self.search_reply(child, mv, depth, alpha, beta, 0, pv_tail)
    }

    fn make_child(&self, position: &Position, mv: Move) -> Position {
        self.ctx.counters.increment();
        position.make_move(mv)
    }

    /// Negamax node at `ply` plies below the root with `depth` plies left.
    ///
    /// `pv` is the remainder of the previous principal variation while this
    /// node is still on it.
    pub fn search_node(
        &self,
        position: &Position,
        depth: i32,
        mut alpha: EvaluationScore,
        mut beta: EvaluationScore,
        ply: u32,
        pv: Option<&[Move]>,
    ) -> Result<VariationLine, SearchError> {
        self.ctx.control.check()?;

        if position.auto_draw_type() != AutoDrawType::None {
            return Ok(VariationLine::zero());
        }

        // Mate-distance pruning.
        alpha = alpha.max(EvaluationScore::mated_in(ply));
        beta = beta.min(EvaluationScore::mate_in(ply + 1));
        if alpha >= beta {
            return Ok(VariationLine::leaf(alpha));
        }

        if position.valid_moves().is_empty() {
            return Ok(VariationLine::leaf(self.ctx.evaluator.score(position, ply)));
        }
        if depth <= 0 || ply >= MAX_SEARCH_PLY {
            return self.quiescence(position, alpha, beta, ply);
        }

        let key = position.zobrist_key();
        let is_pv_node = beta.value() - alpha.value() > 1;
        let entry = self.ctx.tt.probe(key);
        if let Some(entry) = entry {
            if !is_pv_node
                && self.ctx.tuning.use_transposition_cutoffs
                && entry.generation == self.ctx.tt.generation()
                && i32::from(entry.depth) == depth
            {
                let score = entry.score.from_table(ply);
                let cuts = match entry.bound {
                    ScoreBound::Exact => true,
                    ScoreBound::LowerBound => score >= beta,
                    ScoreBound::UpperBound => score <= alpha,
                };
                if cuts {
                    return Ok(VariationLine::new(score, entry.best_move.into_iter().collect()));
                }
            }
        }

        let pv = pv.filter(|line| !line.is_empty());
        let hint = match pv {
            Some(line) => Some(line[0]),
            None => entry.and_then(|e| e.best_move),
        };
        let ordered = order_moves(position, hint, ply, &self.ctx.stats)?;
        let in_check = position.is_in_check();

        let original_alpha = alpha;
        let mut best: Option<VariationLine> = None;
        let mut tried_quiets = TriedQuiets::new();

        for (index, candidate) in ordered.iter().enumerate() {
            let mv = candidate.mv;
            let child = self.make_child(position, mv);
            let child_pv = pv.filter(|line| line[0] == mv).map(|line| &line[1..]);

            let line = if index == 0 {
                self.search_reply(&child, mv, depth, alpha, beta, ply, child_pv)?
            } else {
                let probe = self.search_reply(&child, mv, depth, alpha, alpha.offset(1), ply, child_pv)?;
                if probe.score() > alpha && probe.score() < beta {
                    self.search_reply(&child, mv, depth, alpha, beta, ply, child_pv)?
                } else {
                    probe
                }
            };

            let score = line.score();
            if best.as_ref().map_or(true, |b| score > b.score()) {
                best = Some(line);
            }
            if score > alpha {
                alpha = score;
            }
            if score >= beta {
                if candidate.flags.is_quiet() && !in_check {
                    self.ctx
                        .stats
                        .record_cutoff(ply, mv, candidate.flags.piece, depth, &tried_quiets);
                }
                break;
            }
            if candidate.flags.is_quiet() {
                tried_quiets.push((mv, candidate.flags.piece));
            }
        }

        let best = best.ok_or_else(|| {
            SearchError::InvariantViolation(format!("no move searched in {}", position.to_fen()))
        })?;
        let bound = if best.score() >= beta {
            ScoreBound::LowerBound
        } else if best.score() > original_alpha {
            ScoreBound::Exact
        } else {
            ScoreBound::UpperBound
        };
        self.ctx.tt.save(TranspositionTableEntry::new(
            key,
            best.first_move(),
            best.score().to_table(ply),
            EvaluationScore::ZERO,
            bound,
            depth,
        ));
        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    fn search_reply(
        &self,
        child: &Position,
        mv: Move,
        depth: i32,
        alpha: EvaluationScore,
        beta: EvaluationScore,
        ply: u32,
        pv: Option<&[Move]>,
    ) -> Result<VariationLine, SearchError> {
        let line = self.search_node(child, depth - 1, -beta, -alpha, ply + 1, pv)?;
        Ok(negate(line).prepend(mv))
    }

    /// Capture-only search from a leaf so that the static score is only
    /// taken in quiet positions.
    fn quiescence(
        &self,
        position: &Position,
        mut alpha: EvaluationScore,
        beta: EvaluationScore,
        ply: u32,
    ) -> Result<VariationLine, SearchError> {
        self.ctx.control.check()?;

        if position.auto_draw_type() != AutoDrawType::None {
            return Ok(VariationLine::zero());
        }
        let stand_pat = self.ctx.evaluator.score(position, ply);
        if position.state().is_terminal() || ply >= MAX_SEARCH_PLY || stand_pat >= beta {
            return Ok(VariationLine::leaf(stand_pat));
        }
        alpha = alpha.max(stand_pat);

        let mut best = VariationLine::leaf(stand_pat);
        for candidate in order_tactical_moves(position) {
            let mv = candidate.mv;
            if self.ctx.evaluator.static_exchange(position, mv, &self.ctx.control)? < 0 {
                continue;
            }
            let child = self.make_child(position, mv);
            let line = negate(self.quiescence(&child, -beta, -alpha, ply + 1)?).prepend(mv);
            let score = line.score();
            if score > best.score() {
                best = line;
            }
            if score > alpha {
                alpha = score;
            }
            if score >= beta {
                break;
            }
        }
        Ok(best)
    }
}
