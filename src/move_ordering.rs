//! Move ordering for the alpha-beta search.
//!
//! Good ordering is what makes alpha-beta cut: the previous best move first,
//! then winning-looking tactics, then the quiet moves that cut elsewhere.

use crate::board::{Move, MoveFlags};
use crate::error::SearchError;
use crate::evaluation::piece_value;
use crate::history::MoveHistoryStatistics;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedMove {
    pub mv: Move,
    pub flags: MoveFlags,
    /// Set only for the principal-variation hint.
    pub is_pv_move: bool,
}

impl OrderedMove {
    fn new(mv: Move, flags: MoveFlags) -> Self {
        OrderedMove {
            mv,
            flags,
            is_pv_move: false,
        }
    }
}

/// MVV/LVA key: most valuable victim first, then least valuable attacker,
/// then the richest promotion, then the move itself.
fn tactical_key(m: &OrderedMove) -> (i32, i32, i32, Move) {
    (
        -piece_value(m.flags.captured),
        piece_value(m.flags.piece),
        -piece_value(m.flags.promotion),
        m.mv,
    )
}

/// All legal moves of `position` in search order.
///
/// 1. `hint`, when legal
/// 2. captures and promotions in MVV/LVA order
/// 3. the killers of `ply`, primary first, when legal and quiet
/// 4. the remaining quiet moves by history score
pub fn order_moves(
    position: &Position,
    hint: Option<Move>,
    ply: u32,
    stats: &MoveHistoryStatistics,
) -> Result<Vec<OrderedMove>, SearchError> {
    let valid = position.valid_moves();
    let mut ordered = Vec::with_capacity(valid.len());

    let hint = hint.and_then(|mv| valid.get(&mv).map(|flags| (mv, flags)));
    if let Some((mv, flags)) = hint {
        ordered.push(OrderedMove {
            mv,
            flags,
            is_pv_move: true,
        });
    }
    let hint_move = hint.map(|(mv, _)| mv);

    let mut tactical = Vec::new();
    let mut quiet = Vec::new();
    for (mv, flags) in valid.iter() {
        if Some(mv) == hint_move {
            continue;
        }
        if flags.is_quiet() {
            quiet.push(OrderedMove::new(mv, flags));
        } else {
            tactical.push(OrderedMove::new(mv, flags));
        }
    }
    tactical.sort_by_key(tactical_key);
    ordered.extend(tactical);

    let (killer_moves, quiet) = stats.with_tables(ply, |killers, history| {
        let (mut killer_moves, mut rest): (Vec<_>, Vec<_>) =
            quiet.into_iter().partition(|m| killers.contains(m.mv));
        killer_moves.sort_by_key(|m| killers.primary != Some(m.mv));
        rest.sort_by_key(|m| (-history.score(m.flags.piece, m.mv.to_sq()), m.mv));
        (killer_moves, rest)
    });
    ordered.extend(killer_moves);
    ordered.extend(quiet);

    if ordered.len() != valid.len() {
        return Err(SearchError::InvariantViolation(format!(
            "ordered {} moves but {} are legal in {}",
            ordered.len(),
            valid.len(),
            position.to_fen()
        )));
    }
    Ok(ordered)
}

/// Captures and promotions only, in MVV/LVA order. Used by quiescence.
pub fn order_tactical_moves(position: &Position) -> Vec<OrderedMove> {
    let mut tactical: Vec<OrderedMove> = position
        .valid_moves()
        .iter()
        .filter(|(_, flags)| !flags.is_quiet())
        .map(|(mv, flags)| OrderedMove::new(mv, flags))
        .collect();
    tactical.sort_by_key(tactical_key);
    tactical
}
