//! Row-clearing engine.
//!
//! A row clears once the count of filled, non-safe cells reaches the
//! configured threshold. Safe cells (home zones that still hold at
//! least one piece, or belong to a paused player) survive both the
//! clear and the subsequent downward shift of the rows above.

use std::collections::HashSet;

use crate::board::{Board, Position};
use crate::ids::{PieceId, PlayerId};

/// What a clearing pass did, for the caller to reconcile pieces,
/// player lists and islands.
#[derive(Debug, Default)]
pub struct RowClearOutcome {
    /// Cleared row indices, as seen before any shifting.
    pub cleared: Vec<i32>,
    /// Pieces that sat on cleared cells; the caller detaches them.
    pub detached: Vec<PieceId>,
    /// Pieces whose cells shifted down, with their new positions.
    pub moved: Vec<(PieceId, Position)>,
    /// Owners whose cells were removed or moved; their islands must be
    /// recomputed.
    pub touched_owners: HashSet<PlayerId>,
}

/// Scans the whole board and clears every eligible row.
///
/// Eligibility is judged against the starting configuration, so rows
/// that become full only as a result of shifting wait for the next
/// pass. Rows are then processed bottom-up, adjusting for the shifts
/// already applied.
pub fn sweep_rows(
    board: &mut Board,
    threshold: usize,
    is_safe: &dyn Fn(Position) -> bool,
) -> RowClearOutcome {
    let mut outcome = RowClearOutcome::default();

    let eligible: Vec<i32> = (0..board.height())
        .filter(|&y| {
            let filled = (0..board.width())
                .filter(|&x| {
                    let pos = Position::new(x, y);
                    board.get(pos).is_some() && !is_safe(pos)
                })
                .count();
            filled >= threshold
        })
        .collect();

    let mut shifts = 0;
    for original_y in eligible {
        let y = original_y - shifts;
        clear_row(board, y, is_safe, &mut outcome);
        shift_rows_above(board, y, is_safe, &mut outcome);
        shifts += 1;
        outcome.cleared.push(original_y);
        tracing::debug!(row = original_y, "row cleared");
    }
    outcome
}

fn clear_row(
    board: &mut Board,
    y: i32,
    is_safe: &dyn Fn(Position) -> bool,
    outcome: &mut RowClearOutcome,
) {
    for x in 0..board.width() {
        let pos = Position::new(x, y);
        if board.get(pos).is_none() || is_safe(pos) {
            continue;
        }
        if let Some(cell) = board.remove(pos) {
            outcome.touched_owners.insert(cell.owner);
            if let Some(piece) = cell.piece {
                outcome.detached.push(piece);
            }
        }
    }
}

/// Shifts every non-safe cell in rows strictly above `y` down by one.
/// A cell stays put when its destination is a safe cell or still
/// occupied (a safe cell that survived the clear).
fn shift_rows_above(
    board: &mut Board,
    y: i32,
    is_safe: &dyn Fn(Position) -> bool,
    outcome: &mut RowClearOutcome,
) {
    for yy in (y + 1)..board.height() {
        for x in 0..board.width() {
            let pos = Position::new(x, yy);
            if board.get(pos).is_none() || is_safe(pos) {
                continue;
            }
            let dest = Position::new(x, yy - 1);
            if is_safe(dest) || board.get(dest).is_some() {
                continue;
            }
            if let Some(cell) = board.remove(pos) {
                outcome.touched_owners.insert(cell.owner);
                if let Some(piece) = cell.piece {
                    outcome.moved.push((piece, dest));
                }
                // Infallible: dest is strictly inside the bounds pos was.
                let _ = board.set(dest, cell);
            }
        }
    }
}
