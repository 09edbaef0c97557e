//! Outbound game events.
//!
//! The engine appends events to a per-game queue during mutation; the
//! registry layer drains the queue after each command and hands the
//! events to whatever transport wants to broadcast them. The core never
//! talks to the network itself.

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::ids::{PieceId, PlayerId};
use crate::piece::PieceKind;

/// Events surfaced to collaborators for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PiecePurchased {
        player: PlayerId,
        piece: PieceId,
        kind: PieceKind,
        pos: Position,
    },
    PiecePurchaseFailed {
        player: PlayerId,
        kind: PieceKind,
        reason: String,
    },
    PawnPromoted {
        player: PlayerId,
        piece: PieceId,
    },
    KingCaptured {
        captor: PlayerId,
        victim: PlayerId,
    },
    PiecesTransferred {
        from: PlayerId,
        to: PlayerId,
        count: usize,
    },
    FeesTransferred {
        from: PlayerId,
        to: PlayerId,
        amount: u64,
    },
    GameWinner {
        winner: PlayerId,
    },
    RowCleared {
        y: i32,
    },
    PlayerPaused {
        player: PlayerId,
    },
    PlayerResumed {
        player: PlayerId,
    },
    PlayerPausedTimeout {
        player: PlayerId,
    },
    HomeZoneDegraded {
        player: PlayerId,
    },
}
