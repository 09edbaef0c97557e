//! Serializable game-state snapshots for the transport layer.
//!
//! The internal board/piece/ledger layout never travels on the wire;
//! the transport layer serializes these snapshot types however it
//! likes.

use serde::{Deserialize, Serialize};

use crate::board::{CellOrigin, Position};
use crate::ids::{GameId, IslandId, PieceId, PlayerId};
use crate::piece::Piece;
use crate::player::HomeZone;
use crate::turns::TurnPhase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub pos: Position,
    pub owner: PlayerId,
    pub origin: CellOrigin,
    pub piece: Option<PieceId>,
    pub island: Option<IslandId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub username: String,
    pub color: u8,
    pub home: HomeZone,
    pub score: u64,
    pub purchase_total: u64,
    pub paused: bool,
    pub phase: TurnPhase,
    /// Milliseconds until the player's next move is allowed.
    pub cooldown_remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandSnapshot {
    pub id: IslandId,
    pub owner: PlayerId,
    pub size: usize,
    pub has_king: bool,
}

/// A full point-in-time view of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub width: i32,
    pub height: i32,
    pub cells: Vec<CellSnapshot>,
    pub players: Vec<PlayerSnapshot>,
    pub pieces: Vec<Piece>,
    pub islands: Vec<IslandSnapshot>,
    pub ended: bool,
    pub winner: Option<PlayerId>,
}
