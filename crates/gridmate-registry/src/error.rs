//! Error types for the registry layer.

use gridmate_core::{GameError, GameId};

/// Errors that can occur while routing a request to a game actor.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The game does not exist (never created, or already archived).
    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// The game's command channel is full or closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),

    /// The game engine rejected the request.
    #[error(transparent)]
    Game(#[from] GameError),
}
