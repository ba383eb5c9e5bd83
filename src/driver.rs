//! Iterative deepening over the root moves.
//!
//! `SearchDriver` owns the state that outlives a single request (the
//! transposition table and the move statistics) and runs one search per
//! `get_move` call: depth 1, 2, ... up to the requested maximum, each depth
//! analysing every root move through the parallel coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::board::Move;
use crate::config::{SearchRequest, SearchTuning, DEFAULT_TRANSPOSITION_BYTES};
use crate::control::{GameControlInfo, InterruptionStatus};
use crate::error::SearchError;
use crate::history::MoveHistoryStatistics;
use crate::move_ordering::order_moves;
use crate::opening_book::{pick_book_move, OpeningBook};
use crate::parallel_search::{ParallelRootCoordinator, RootTask};
use crate::position::Position;
use crate::score::{EvaluationScore, VariationLine};
use crate::search::{AlphaBetaSearcher, NodeCounters, SearchContext};
use crate::transposition_table::{ScoreBound, TranspositionTable, TranspositionTableEntry};

/// Progress report sent after every completed depth.
#[derive(Debug, Clone)]
pub struct SearchFeedback {
    pub depth: u32,
    pub line: VariationLine,
    /// Nodes since the start of the request.
    pub nodes: u64,
    /// Nodes spent on this depth alone.
    pub ply_nodes: u64,
    /// Time since `get_move` was called.
    pub elapsed: Duration,
    /// Per-mille of the transposition table used by this search.
    pub hashfull: usize,
}

impl SearchFeedback {
    pub fn nodes_per_second(&self) -> u64 {
        let millis = self.elapsed.as_millis() as u64;
        if millis > 0 {
            self.nodes * 1000 / millis
        } else {
            0
        }
    }
}

/// A root move with its line from the last completed depth.
struct RootMove {
    mv: Move,
    line: Option<VariationLine>,
}

pub struct SearchDriver {
    tt: Arc<TranspositionTable>,
    tt_bytes: usize,
    stats: Arc<MoveHistoryStatistics>,
    tuning: SearchTuning,
    book: Option<Arc<dyn OpeningBook>>,
    rng: StdRng,
    last_nodes: u64,
}

impl SearchDriver {
    pub fn new(tuning: SearchTuning) -> Self {
        SearchDriver {
            tt: Arc::new(TranspositionTable::new(DEFAULT_TRANSPOSITION_BYTES)),
            tt_bytes: DEFAULT_TRANSPOSITION_BYTES,
            stats: Arc::new(MoveHistoryStatistics::new()),
            tuning,
            book: None,
            rng: StdRng::from_entropy(),
            last_nodes: 0,
        }
    }

    pub fn with_opening_book(mut self, book: Arc<dyn OpeningBook>) -> Self {
        self.book = Some(book);
        self
    }

    /// Seed the generator used to pick among book moves.
    pub fn with_book_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn tuning(&self) -> SearchTuning {
        self.tuning
    }

    pub fn transposition_table(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    /// Nodes searched by the last `get_move` call.
    pub fn last_search_nodes(&self) -> u64 {
        self.last_nodes
    }

    /// Forget everything learned in the previous game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.stats.clear();
    }

    /// Choose a move for `position`.
    ///
    /// `on_feedback` is called after every completed depth. If the search is
    /// stopped through `control` after at least one depth, the best line so
    /// far is returned.
    pub fn get_move<F>(
        &mut self,
        position: &Position,
        request: &SearchRequest,
        control: Arc<GameControlInfo>,
        mut on_feedback: F,
    ) -> Result<VariationLine, SearchError>
    where
        F: FnMut(&SearchFeedback),
    {
        let started = Instant::now();
        request.validate()?;
        self.tuning.validate()?;
        self.last_nodes = 0;

        if request.transposition_bytes != self.tt_bytes {
            self.tt.resize(request.transposition_bytes);
            self.tt_bytes = request.transposition_bytes;
            debug!("transposition table resized to {} entries", self.tt.capacity());
        }

        if let Some(mv) = self.book_move(position) {
            info!("book move {mv}");
            return Ok(VariationLine::new(EvaluationScore::ZERO, vec![mv]));
        }

        let valid = position.valid_moves();
        if valid.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }
        if valid.len() == 1 {
            let only: Vec<Move> = valid.moves().collect();
            info!("only move {}", only[0]);
            return Ok(VariationLine::new(EvaluationScore::ZERO, only));
        }

        if let Some(budget) = request.time_budget {
            control.start_deadline(budget);
        }
        self.tt.notify_new_search();
        self.stats.clear();

        let counters = Arc::new(NodeCounters::new());
        let ctx = SearchContext::new(
            Arc::clone(&self.tt),
            Arc::clone(&self.stats),
            Arc::clone(&control),
            Arc::clone(&counters),
            self.tuning,
        );
        let result = self.iterate(position, request, &ctx, started, &mut on_feedback);
        self.last_nodes = counters.total();

        let best = result?;
        let status = control.status();
        if status == Some(InterruptionStatus::Faulted) {
            if let Some(reason) = control.custom_reason() {
                return Err(SearchError::CustomInterruption(reason));
            }
        }
        match (best, status) {
            (Some(best), _) => {
                info!(
                    "best move {} {} after {} nodes in {:?}",
                    best.first_move().map(|m| m.to_uci()).unwrap_or_default(),
                    best.score(),
                    self.last_nodes,
                    started.elapsed()
                );
                Ok(best)
            }
            (None, Some(status)) => Err(SearchError::NoMoveDetermined(status)),
            (None, None) => Err(SearchError::InvariantViolation("search ended without a line".into())),
        }
    }

    fn book_move(&mut self, position: &Position) -> Option<Move> {
        let book = self.book.as_ref()?;
        let moves = book.find_possible_moves(position);
        if moves.is_empty() {
            return None;
        }
        pick_book_move(position, &moves, &mut self.rng)
    }

    /// Deepen until the maximum depth, a mate score or an interruption.
    /// Returns the best line of the last completed depth, if any.
    fn iterate<F>(
        &self,
        position: &Position,
        request: &SearchRequest,
        ctx: &SearchContext,
        started: Instant,
        on_feedback: &mut F,
    ) -> Result<Option<VariationLine>, SearchError>
    where
        F: FnMut(&SearchFeedback),
    {
        let coordinator = ParallelRootCoordinator::new(request.effective_threads());
        let mut root_moves: Vec<RootMove> = order_moves(position, None, 0, &ctx.stats)?
            .into_iter()
            .map(|m| RootMove { mv: m.mv, line: None })
            .collect();
        let mut best: Option<VariationLine> = None;

        for depth in 1..=request.max_depth {
            ctx.counters.start_ply();
            if depth > 1 {
                // Stable: equal scores keep the previous order.
                root_moves.sort_by_key(|r| std::cmp::Reverse(r.line.as_ref().map(VariationLine::score)));
            }

            let tasks: Vec<RootTask<VariationLine>> = root_moves
                .iter()
                .map(|root_move| {
                    let ctx = ctx.clone();
                    let position = position.clone();
                    let mv = root_move.mv;
                    let previous = root_move.line.clone();
                    Box::new(move || {
                        AlphaBetaSearcher::new(ctx).analyze_root_move(&position, mv, depth as i32, previous.as_ref())
                    }) as RootTask<VariationLine>
                })
                .collect();

            let lines = match coordinator.run(tasks, &ctx.control) {
                Ok(lines) => lines,
                Err(SearchError::Interrupted(status)) => {
                    debug!("depth {depth} interrupted ({status:?})");
                    break;
                }
                Err(err) => return Err(err),
            };

            let mut depth_best: Option<VariationLine> = None;
            for (root_move, line) in root_moves.iter_mut().zip(lines) {
                if depth_best.as_ref().map_or(true, |b| line.score() > b.score()) {
                    depth_best = Some(line.clone());
                }
                root_move.line = Some(line);
            }
            let Some(depth_best) = depth_best else {
                break;
            };

            ctx.tt.save(TranspositionTableEntry::new(
                position.zobrist_key(),
                depth_best.first_move(),
                depth_best.score(),
                depth_best.local_value().unwrap_or(EvaluationScore::ZERO),
                ScoreBound::Exact,
                depth as i32,
            ));

            let feedback = SearchFeedback {
                depth,
                line: depth_best.clone(),
                nodes: ctx.counters.total(),
                ply_nodes: ctx.counters.ply(),
                elapsed: started.elapsed(),
                hashfull: ctx.tt.hashfull(),
            };
            debug!(
                "depth {depth}: {} nodes {} ({} nps)",
                feedback.line,
                feedback.nodes,
                feedback.nodes_per_second()
            );
            on_feedback(&feedback);
            ctx.control.allow_move_now();

            let mate_found = depth_best.score().is_mate();
            best = Some(depth_best);
            if mate_found {
                debug!("mate score at depth {depth}, stopping");
                break;
            }
        }
        Ok(best)
    }
}

impl Default for SearchDriver {
    fn default() -> Self {
        Self::new(SearchTuning::default())
    }
}
