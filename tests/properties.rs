//! Property tests over scores, the transposition table and move ordering.

mod common;

use chess_search::{
    negate, order_moves, EvaluationScore, Move, MoveHistoryStatistics, Position, ScoreBound,
    TranspositionTable, TranspositionTableEntry, VariationLine, MATE_VALUE,
};
use proptest::prelude::*;

fn bound() -> impl Strategy<Value = ScoreBound> {
    prop_oneof![
        Just(ScoreBound::Exact),
        Just(ScoreBound::LowerBound),
        Just(ScoreBound::UpperBound),
    ]
}

/// A position reached by playing the chosen move indices from the start.
fn random_position(choices: &[usize]) -> Position {
    let mut position = Position::starting();
    for &choice in choices {
        let moves: Vec<Move> = position.valid_moves().moves().collect();
        if moves.is_empty() {
            break;
        }
        position = position.make_move(moves[choice % moves.len()]);
    }
    position
}

proptest! {
    #[test]
    fn score_negation_is_an_involution(value in -MATE_VALUE..=MATE_VALUE) {
        let score = EvaluationScore::new(value);
        prop_assert_eq!(-(-score), score);
        prop_assert_eq!((-score).value(), -value);
    }

    #[test]
    fn line_negation_round_trips(value in -MATE_VALUE..=MATE_VALUE, local in -5000i32..5000) {
        let line = VariationLine::new(EvaluationScore::new(value), vec![Move::new(12, 28)])
            .with_local_value(EvaluationScore::new(local))
            .unwrap();
        let flipped = negate(line.clone());
        prop_assert_eq!(flipped.score(), EvaluationScore::new(-value));
        prop_assert_eq!(flipped.moves(), line.moves());
        prop_assert_eq!(negate(flipped), line);
    }

    #[test]
    fn table_round_trip(
        key in any::<u64>(),
        depth in 0i32..64,
        score in -MATE_VALUE..=MATE_VALUE,
        local in -MATE_VALUE..=MATE_VALUE,
        bound in bound(),
        from in 0usize..64,
        to in 0usize..64,
    ) {
        prop_assume!(from != to);
        let table = TranspositionTable::new(1 << 16);
        let mv = Move::new(from, to);
        let entry = TranspositionTableEntry::new(
            key,
            Some(mv),
            EvaluationScore::new(score),
            EvaluationScore::new(local),
            bound,
            depth,
        );
        table.save(entry);
        let found = table.probe(key).unwrap();
        prop_assert_eq!(found.key, key);
        prop_assert_eq!(found.best_move, Some(mv));
        prop_assert_eq!(found.score.value(), score);
        prop_assert_eq!(found.local_score.value(), local);
        prop_assert_eq!(found.bound, bound);
        prop_assert_eq!(i32::from(found.depth), depth);
        prop_assert_eq!(table.probe(key ^ 1), None);
    }

    #[test]
    fn shallower_save_keeps_the_deeper_entry(key in any::<u64>(), deep in 2i32..60, shallower in 0i32..2) {
        let table = TranspositionTable::new(1 << 12);
        let save = |depth: i32, score: i32| {
            table.save(TranspositionTableEntry::new(
                key,
                None,
                EvaluationScore::new(score),
                EvaluationScore::ZERO,
                ScoreBound::Exact,
                depth,
            ));
        };
        save(deep, 11);
        table.notify_new_search();
        save(deep - shallower - 1, 22);
        let found = table.probe(key).unwrap();
        prop_assert_eq!(i32::from(found.depth), deep);
        prop_assert_eq!(found.score.value(), 11);
    }

    #[test]
    fn ordering_is_a_permutation_of_the_legal_moves(
        choices in proptest::collection::vec(any::<usize>(), 0..12),
        ply in 0u32..40,
        hint_index in any::<usize>(),
        cutoffs in proptest::collection::vec((any::<usize>(), 1i32..8), 0..6),
    ) {
        let position = random_position(&choices);
        let legal: Vec<Move> = position.valid_moves().moves().collect();
        let stats = MoveHistoryStatistics::new();
        for (index, depth) in cutoffs {
            if let Some((mv, flags)) = position.valid_moves().iter().nth(index % legal.len().max(1)) {
                if flags.is_quiet() {
                    stats.record_cutoff(ply, mv, flags.piece, depth, &[]);
                }
            }
        }
        let hint = legal.get(hint_index % legal.len().max(1)).copied();
        let ordered = order_moves(&position, hint, ply, &stats).unwrap();

        let mut got: Vec<Move> = ordered.iter().map(|m| m.mv).collect();
        let mut want = legal.clone();
        got.sort();
        want.sort();
        prop_assert_eq!(got, want);
        if let Some(hint) = hint {
            prop_assert_eq!(ordered[0].mv, hint);
            prop_assert!(ordered[0].is_pv_move);
        }
        prop_assert!(ordered.iter().skip(1).all(|m| !m.is_pv_move));
    }
}
