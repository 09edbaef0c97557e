//! Game registry: creates, tracks, and routes requests to game actors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gridmate_core::{GameId, GameSettings};

use crate::actor::{spawn_game, EventSender, GameHandle, GameStatus};
use crate::RegistryError;

/// Counter for generating unique game IDs.
static NEXT_GAME_ID: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for game actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Tracks all active games and hands out actor handles.
///
/// This is the entry point for game operations from higher layers
/// (the server accept loop, the sweeper). The registry itself holds no
/// game state; each game lives inside its own actor task.
pub struct GameRegistry {
    /// Active games, keyed by game ID.
    games: HashMap<GameId, GameHandle>,
    /// Cloned into every spawned actor; drained game events fan in here.
    events: EventSender,
}

impl GameRegistry {
    pub fn new(events: EventSender) -> Self {
        Self {
            games: HashMap::new(),
            events,
        }
    }

    /// Creates a new game actor and returns its ID.
    pub fn create_game(&mut self, settings: GameSettings) -> GameId {
        let game_id = GameId(NEXT_GAME_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_game(
            game_id,
            settings,
            self.events.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.games.insert(game_id, handle);
        tracing::info!(game = %game_id, "game created");
        game_id
    }

    /// Returns a handle for sending commands to a game.
    pub fn handle(&self, game_id: GameId) -> Result<&GameHandle, RegistryError> {
        self.games
            .get(&game_id)
            .ok_or(RegistryError::GameNotFound(game_id))
    }

    /// Returns a cloned handle, for callers that need to await on the
    /// game without borrowing the registry.
    pub fn handle_cloned(&self, game_id: GameId) -> Result<GameHandle, RegistryError> {
        self.handle(game_id).cloned()
    }

    /// Returns metadata for a specific game.
    pub async fn status(&self, game_id: GameId) -> Result<GameStatus, RegistryError> {
        self.handle(game_id)?.status().await
    }

    /// Shuts down a game actor and forgets it.
    pub async fn destroy_game(&mut self, game_id: GameId) -> Result<(), RegistryError> {
        let handle = self
            .games
            .remove(&game_id)
            .ok_or(RegistryError::GameNotFound(game_id))?;
        let _ = handle.shutdown().await;
        tracing::info!(game = %game_id, "game destroyed");
        Ok(())
    }

    /// Shuts down and removes every game that has ended. Returns the
    /// archived IDs. Games that fail to answer a status query are
    /// skipped; a later pass gets them once the channel recovers.
    pub async fn archive_finished(&mut self) -> Vec<GameId> {
        let mut archived = Vec::new();
        for handle in self.games.values() {
            match handle.status().await {
                Ok(status) if status.ended => archived.push(status.game_id),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(game = %handle.game_id(), %err, "status query failed");
                }
            }
        }
        for game_id in &archived {
            if let Some(handle) = self.games.remove(game_id) {
                let _ = handle.shutdown().await;
                tracing::info!(game = %game_id, "finished game archived");
            }
        }
        archived
    }

    /// Shuts down and removes games with no player-originated command
    /// for at least `max_idle`. Returns the archived IDs. A game that
    /// fails the status query is skipped until the channel recovers.
    pub async fn archive_idle(&mut self, max_idle: Duration) -> Vec<GameId> {
        let mut archived = Vec::new();
        for handle in self.games.values() {
            match handle.status().await {
                Ok(status) if status.idle >= max_idle => archived.push(status.game_id),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(game = %handle.game_id(), %err, "status query failed");
                }
            }
        }
        for game_id in &archived {
            if let Some(handle) = self.games.remove(game_id) {
                let _ = handle.shutdown().await;
                tracing::info!(game = %game_id, "idle game archived");
            }
        }
        archived
    }

    /// Triggers a background sweep on every game. One unresponsive
    /// game never blocks the others.
    pub async fn sweep_all(&self) {
        for handle in self.games.values() {
            if let Err(err) = handle.sweep().await {
                tracing::warn!(game = %handle.game_id(), %err, "sweep dispatch failed");
            }
        }
    }

    /// Returns cloned handles to all active games.
    pub fn handles(&self) -> Vec<GameHandle> {
        self.games.values().cloned().collect()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.keys().copied().collect()
    }
}
