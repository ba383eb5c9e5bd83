//! chess_search - Chess move search
//!
//! A tree-search engine that picks chess moves with:
//! - Iterative deepening over the root moves
//! - Principal-variation alpha-beta search with fail-soft cutoffs
//! - Aspiration windows per root move
//! - Quiescence search with static exchange pruning
//! - Killer/history move ordering
//! - A generation-stamped transposition table
//! - Root moves searched in parallel on a worker pool
//!
//! The board side (FEN, legal moves, zobrist keys) is a small mailbox
//! implementation that exists to feed the search.

pub mod types;
pub mod board;
pub mod move_generator;
pub mod zobrist;
pub mod position;
pub mod score;
pub mod evaluation;
pub mod history;
pub mod move_ordering;
pub mod transposition_table;
pub mod control;
pub mod config;
pub mod error;
pub mod search;
pub mod parallel_search;
pub mod opening_book;
pub mod driver;

pub use board::{Move, MoveFlags};
pub use config::{SearchRequest, SearchTuning};
pub use control::{GameControlInfo, InterruptionStatus};
pub use driver::{SearchDriver, SearchFeedback};
pub use error::{PositionError, SearchError};
pub use evaluation::Evaluator;
pub use history::{KillerMoveData, MoveHistoryStatistics};
pub use move_ordering::{order_moves, OrderedMove};
pub use opening_book::{BookMove, MemoryBook, OpeningBook};
pub use parallel_search::{ParallelRootCoordinator, RootTask};
pub use position::{AutoDrawType, GameState, Position};
pub use score::{negate, EvaluationScore, VariationLine, MATE_VALUE};
pub use search::{AlphaBetaSearcher, NodeCounters, SearchContext};
pub use transposition_table::{ScoreBound, TranspositionTable, TranspositionTableEntry};
