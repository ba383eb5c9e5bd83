#![allow(dead_code)]

use std::sync::Arc;

use chess_search::{
    GameControlInfo, Position, SearchDriver, SearchError, SearchFeedback, SearchRequest, SearchTuning,
    VariationLine,
};

pub const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
pub const WHITE_MATES_IN_ONE: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
pub const BLACK_MATES_IN_ONE: &str = "r5k1/8/8/8/8/8/5PPP/6K1 b - - 0 1";
/// White's king can only take the rook.
pub const ONLY_ONE_MOVE: &str = "k7/8/8/8/8/8/1r6/K7 w - - 0 1";
pub const ITALIAN: &str = "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn position(fen: &str) -> Position {
    Position::from_fen(fen).unwrap()
}

pub struct SearchOutcome {
    pub result: Result<VariationLine, SearchError>,
    pub feedback: Vec<SearchFeedback>,
    pub nodes: u64,
}

pub fn search_with(tuning: SearchTuning, fen: &str, request: SearchRequest) -> SearchOutcome {
    search_controlled(tuning, fen, request, Arc::new(GameControlInfo::new()))
}

pub fn search_controlled(
    tuning: SearchTuning,
    fen: &str,
    request: SearchRequest,
    control: Arc<GameControlInfo>,
) -> SearchOutcome {
    init_logging();
    let mut driver = SearchDriver::new(tuning);
    let mut feedback = Vec::new();
    let result = driver.get_move(&position(fen), &request, control, |f| feedback.push(f.clone()));
    SearchOutcome {
        result,
        feedback,
        nodes: driver.last_search_nodes(),
    }
}

pub fn search(fen: &str, depth: u32) -> SearchOutcome {
    search_with(SearchTuning::default(), fen, SearchRequest::new(depth))
}
