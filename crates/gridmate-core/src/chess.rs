//! Chess move legality: per-kind geometry and sliding-path obstruction.
//!
//! Validation is side-effect free; execution (capture resolution, king
//! settlement, promotion) lives on the `Game` aggregate.

use std::collections::HashMap;

use crate::board::{Board, Position};
use crate::error::GameError;
use crate::ids::PieceId;
use crate::piece::{Piece, PieceKind};

const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Validates a move of `piece` to `to`.
///
/// Returns the piece id captured at the destination, if any. Rejects
/// out-of-bounds destinations, illegal geometry, blocked sliding paths,
/// and capturing one's own piece.
pub fn validate_move(
    board: &Board,
    pieces: &HashMap<PieceId, Piece>,
    piece: &Piece,
    to: Position,
) -> Result<Option<PieceId>, GameError> {
    if !board.in_bounds(to) {
        return Err(GameError::InvalidMove(format!(
            "destination {to} is out of bounds"
        )));
    }
    let from = piece.pos;
    if from == to {
        return Err(GameError::InvalidMove("piece did not move".into()));
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let legal = match piece.kind {
        PieceKind::King => dx.abs().max(dy.abs()) == 1,
        PieceKind::Queen => {
            (dx == 0 || dy == 0 || dx.abs() == dy.abs())
                && is_path_clear(board, pieces, from, to)
        }
        PieceKind::Rook => (dx == 0 || dy == 0) && is_path_clear(board, pieces, from, to),
        PieceKind::Bishop => dx.abs() == dy.abs() && is_path_clear(board, pieces, from, to),
        PieceKind::Knight => KNIGHT_JUMPS.contains(&(dx, dy)),
        // Simplified pawn: one square in any cardinal direction.
        PieceKind::Pawn => dx.abs() + dy.abs() == 1,
    };
    if !legal {
        return Err(GameError::InvalidMove(format!(
            "{:?} cannot move from {from} to {to}",
            piece.kind
        )));
    }

    match piece_id_at(board, to) {
        Some(target_id) => {
            let target = pieces
                .get(&target_id)
                .ok_or(GameError::PieceNotFound(target_id))?;
            if target.owner == piece.owner {
                Err(GameError::InvalidMove("destination holds your own piece".into()))
            } else {
                Ok(Some(target_id))
            }
        }
        None => Ok(None),
    }
}

/// True iff no piece sits strictly between `from` and `to` along the
/// straight or diagonal line of travel. The destination itself may be
/// occupied (capture).
pub fn is_path_clear(
    board: &Board,
    pieces: &HashMap<PieceId, Piece>,
    from: Position,
    to: Position,
) -> bool {
    let step = ((to.x - from.x).signum(), (to.y - from.y).signum());
    let mut pos = from.offset(step.0, step.1);
    while pos != to {
        if let Some(id) = piece_id_at(board, pos) {
            if pieces.contains_key(&id) {
                return false;
            }
        }
        pos = pos.offset(step.0, step.1);
    }
    true
}

fn piece_id_at(board: &Board, pos: Position) -> Option<PieceId> {
    board.get(pos).and_then(|c| c.piece)
}

/// True iff any of the given pieces has at least one legal destination.
/// Used by the turn scheduler after a placement to decide whether the
/// player owes a chess move next.
pub fn has_any_legal_move(
    board: &Board,
    pieces: &HashMap<PieceId, Piece>,
    piece_ids: &[PieceId],
) -> bool {
    piece_ids.iter().any(|id| {
        pieces
            .get(id)
            .is_some_and(|piece| !legal_destinations(board, pieces, piece, true).is_empty())
    })
}

/// Enumerates legal destinations for one piece. With `stop_at_first`
/// the scan bails out at the first hit, which is all the availability
/// check needs.
pub fn legal_destinations(
    board: &Board,
    pieces: &HashMap<PieceId, Piece>,
    piece: &Piece,
    stop_at_first: bool,
) -> Vec<Position> {
    let mut out = Vec::new();
    let candidates: Vec<Position> = match piece.kind {
        PieceKind::King => chebyshev_ring(piece.pos),
        PieceKind::Knight => KNIGHT_JUMPS
            .iter()
            .map(|(dx, dy)| piece.pos.offset(*dx, *dy))
            .collect(),
        PieceKind::Pawn => piece.pos.neighbors().to_vec(),
        PieceKind::Rook => ray_targets(board, pieces, piece.pos, &CARDINALS),
        PieceKind::Bishop => ray_targets(board, pieces, piece.pos, &DIAGONALS),
        PieceKind::Queen => {
            let mut t = ray_targets(board, pieces, piece.pos, &CARDINALS);
            t.extend(ray_targets(board, pieces, piece.pos, &DIAGONALS));
            t
        }
    };
    for to in candidates {
        if validate_move(board, pieces, piece, to).is_ok() {
            out.push(to);
            if stop_at_first {
                break;
            }
        }
    }
    out
}

const CARDINALS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

fn chebyshev_ring(pos: Position) -> Vec<Position> {
    let mut out = Vec::with_capacity(8);
    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx != 0 || dy != 0 {
                out.push(pos.offset(dx, dy));
            }
        }
    }
    out
}

/// Walks each ray until the first piece (inclusive) or the board edge.
fn ray_targets(
    board: &Board,
    pieces: &HashMap<PieceId, Piece>,
    from: Position,
    dirs: &[(i32, i32)],
) -> Vec<Position> {
    let mut out = Vec::new();
    for &(dx, dy) in dirs {
        let mut pos = from.offset(dx, dy);
        while board.in_bounds(pos) {
            out.push(pos);
            let blocked = board
                .get(pos)
                .and_then(|c| c.piece)
                .is_some_and(|id| pieces.contains_key(&id));
            if blocked {
                break;
            }
            pos = pos.offset(dx, dy);
        }
    }
    out
}
