//! Chess piece types and the home-zone seeding order.

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::ids::{PieceId, PlayerId};

/// The six chess piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    /// Purchase price in currency units. Kings are never for sale.
    pub fn price(self) -> Option<u64> {
        match self {
            Self::Pawn => Some(1),
            Self::Knight | Self::Bishop => Some(3),
            Self::Rook => Some(5),
            Self::Queen => Some(9),
            Self::King => None,
        }
    }

    /// Scoring value awarded to the captor when this piece is taken.
    pub fn capture_value(self) -> u64 {
        match self {
            Self::Pawn => 1,
            Self::Knight | Self::Bishop => 3,
            Self::Rook => 5,
            Self::Queen => 9,
            Self::King => 10,
        }
    }

    /// The major-piece row of a freshly seeded home zone, left to right.
    pub fn back_rank() -> [PieceKind; 8] {
        [
            Self::Rook,
            Self::Knight,
            Self::Bishop,
            Self::Queen,
            Self::King,
            Self::Bishop,
            Self::Knight,
            Self::Rook,
        ]
    }
}

/// A chess piece on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub owner: PlayerId,
    pub pos: Position,
    pub move_count: u32,
    /// Set once when a pawn is promoted; promotion never repeats.
    pub promoted: bool,
    /// Cumulative forward-direction distance for pawns.
    pub forward_progress: u32,
}

impl Piece {
    pub fn new(id: PieceId, kind: PieceKind, owner: PlayerId, pos: Position) -> Self {
        Self {
            id,
            kind,
            owner,
            pos,
            move_count: 0,
            promoted: false,
            forward_progress: 0,
        }
    }

    pub fn is_king(&self) -> bool {
        self.kind == PieceKind::King
    }
}
