//! End-to-end checks of the search against positions with known answers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chess_search::{
    GameControlInfo, GameState, InterruptionStatus, Position, SearchError, SearchRequest, SearchTuning,
};
use common::*;

#[test]
fn perft_from_the_start() {
    assert_eq!(Position::starting().perft(3), 8902);
}

#[test]
fn perft_kiwipete() {
    let kiwipete = position(KIWIPETE);
    assert_eq!(kiwipete.perft(1), 48);
    assert_eq!(kiwipete.perft(2), 2039);
}

#[test]
fn finds_mate_in_one_for_white() {
    let outcome = search(WHITE_MATES_IN_ONE, 3);
    let line = outcome.result.unwrap();
    assert_eq!(line.score().mate_moves(), Some(1));
    let mv = line.first_move().unwrap();
    assert_eq!(mv.to_uci(), "a1a8");
    assert_eq!(position(WHITE_MATES_IN_ONE).make_move(mv).state(), GameState::Checkmate);
    // Depth 1 already sees the mate, so deepening stops there.
    assert_eq!(outcome.feedback.len(), 1);
}

#[test]
fn finds_mate_in_one_for_black() {
    let line = search(BLACK_MATES_IN_ONE, 2).result.unwrap();
    assert_eq!(line.score().mate_moves(), Some(1));
    assert_eq!(line.first_move().unwrap().to_uci(), "a8a1");
}

#[test]
fn single_legal_move_is_returned_without_searching() {
    for depth in [1, 5, 12] {
        let outcome = search(ONLY_ONE_MOVE, depth);
        let line = outcome.result.unwrap();
        assert_eq!(line.first_move().unwrap().to_uci(), "a1b2");
        assert_eq!(line.moves().len(), 1);
        assert_eq!(outcome.nodes, 0);
        assert!(outcome.feedback.is_empty());
    }
}

#[test]
fn wins_the_hanging_queen() {
    let line = search("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1", 2).result.unwrap();
    assert_eq!(line.first_move().unwrap().to_uci(), "e4d5");
    assert!(line.score().value() > 0);
}

#[test]
fn feedback_reports_growing_node_counts() {
    let outcome = search(ITALIAN, 3);
    let line = outcome.result.unwrap();
    let depths: Vec<u32> = outcome.feedback.iter().map(|f| f.depth).collect();
    assert_eq!(depths, vec![1, 2, 3]);
    assert!(outcome.feedback.windows(2).all(|w| w[0].nodes <= w[1].nodes));
    assert!(outcome.feedback.iter().all(|f| f.ply_nodes > 0 && f.ply_nodes <= f.nodes));
    assert_eq!(outcome.feedback.last().unwrap().line, line);
    assert_eq!(outcome.nodes, outcome.feedback.last().unwrap().nodes);
}

#[test]
fn aspiration_windows_do_not_change_the_result() {
    let plain = SearchTuning {
        use_aspiration_windows: false,
        ..SearchTuning::default()
    };
    let narrow = SearchTuning {
        aspiration_delta: 5,
        ..SearchTuning::default()
    };
    let full = search_with(plain, ITALIAN, SearchRequest::new(3)).result.unwrap();
    let windowed = search_with(narrow, ITALIAN, SearchRequest::new(3)).result.unwrap();
    assert_eq!(full.score(), windowed.score());
    assert_eq!(full.first_move(), windowed.first_move());
}

#[test]
fn transposition_cutoffs_do_not_change_the_result() {
    let without = SearchTuning {
        use_transposition_cutoffs: false,
        ..SearchTuning::default()
    };
    let with_cutoffs = search(ITALIAN, 3).result.unwrap();
    let plain = search_with(without, ITALIAN, SearchRequest::new(3)).result.unwrap();
    assert_eq!(with_cutoffs.score(), plain.score());
    assert_eq!(with_cutoffs.first_move(), plain.first_move());
}

#[test]
fn expired_time_budget_before_any_depth() {
    let outcome = search_with(
        SearchTuning::default(),
        ITALIAN,
        SearchRequest::new(6).with_time_budget(Duration::from_nanos(1)),
    );
    assert_eq!(
        outcome.result,
        Err(SearchError::NoMoveDetermined(InterruptionStatus::TimedOut))
    );
}

#[test]
fn time_budget_starts_with_the_request() {
    let control = Arc::new(GameControlInfo::new());
    // Time spent before the request must not count against its budget.
    std::thread::sleep(Duration::from_millis(300));
    let outcome = search_controlled(
        SearchTuning::default(),
        ITALIAN,
        SearchRequest::new(1).with_time_budget(Duration::from_millis(200)),
        control,
    );
    let line = outcome.result.unwrap();
    assert!(line.first_move().is_some());
    assert_eq!(outcome.feedback.len(), 1);
    assert!(outcome.feedback[0].elapsed < Duration::from_millis(300));
}

#[test]
fn move_now_waits_for_the_first_depth() {
    let control = Arc::new(GameControlInfo::new());
    control.request_move_now();
    let outcome = search_controlled(SearchTuning::default(), ITALIAN, SearchRequest::new(6), control);
    let line = outcome.result.unwrap();
    assert_eq!(outcome.feedback.len(), 1);
    assert_eq!(outcome.feedback[0].line, line);
}

#[test]
fn invalid_requests_are_rejected_before_searching() {
    for request in [
        SearchRequest::new(0),
        SearchRequest::new(4).with_time_budget(Duration::ZERO),
        SearchRequest::new(4).with_transposition_bytes(8),
    ] {
        let outcome = search_with(SearchTuning::default(), ONLY_ONE_MOVE, request);
        assert!(matches!(outcome.result, Err(SearchError::InvalidConfiguration(_))));
    }
}
