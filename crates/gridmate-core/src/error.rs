//! Error taxonomy for the rules engine.
//!
//! Every validation failure is a structured, recoverable result — the
//! transport layer maps these to protocol-specific codes. Nothing here
//! is fatal: a rejected operation leaves the game state untouched
//! (validate-then-commit discipline).

use crate::board::Position;
use crate::ids::{PieceId, PlayerId};

/// Errors that can occur during game operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The player does not exist in this game.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The piece does not exist in this game.
    #[error("piece {0} not found")]
    PieceNotFound(PieceId),

    /// Coordinates outside the current board bounds.
    #[error("coordinates ({0}, {1}) are out of bounds")]
    OutOfBounds(i32, i32),

    /// Illegal chess geometry, blocked sliding path, or moving a piece
    /// the player does not own.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// A placement with no 4-adjacent same-owner cell, or a purchase
    /// seat that cannot reach the player's king. Distinct from the
    /// harmless "explosion" outcome, which is a successful no-op.
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// The payment offered is below the listed price.
    #[error("insufficient payment: {required} required, {paid} offered")]
    InsufficientPayment { required: u64, paid: u64 },

    /// The piece type is not purchasable (kings are never for sale).
    #[error("piece type cannot be purchased")]
    InvalidPieceType,

    /// The operation is not allowed for this player right now
    /// (game over, player paused or eliminated, game full).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The per-player cooldown has not elapsed yet.
    #[error("cooldown active: {remaining_ms} ms remaining")]
    RateLimited { remaining_ms: u64 },

    /// The target cell is already occupied.
    #[error("cell at {0} is already occupied")]
    StateConflict(Position),
}
