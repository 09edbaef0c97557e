//! Per-player turn phase and cooldown bookkeeping.
//!
//! There is no global turn order: every player alternates between
//! placing a tetromino and making a chess move on their own clock.
//! All checks compare caller-supplied monotonic instants against stored
//! timestamps; nothing here blocks or reads the wall clock.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::Difficulty;
use crate::error::GameError;

/// Which kind of move the player owes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingTetromino,
    AwaitingChess,
}

/// Turn state machine for one player.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub phase: TurnPhase,
    pub last_move_at: Option<Instant>,
    pub min_interval: Duration,
}

impl TurnState {
    /// New players start by placing a block.
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            phase: TurnPhase::AwaitingTetromino,
            last_move_at: None,
            min_interval: difficulty.move_interval(),
        }
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.min_interval = difficulty.move_interval();
    }

    /// Rejects a move of the wrong phase or one arriving before the
    /// cooldown has elapsed. Side-effect free.
    pub fn check(&self, expected: TurnPhase, now: Instant) -> Result<(), GameError> {
        if self.phase != expected {
            let owed = match self.phase {
                TurnPhase::AwaitingTetromino => "a tetromino placement",
                TurnPhase::AwaitingChess => "a chess move",
            };
            return Err(GameError::InvalidMove(format!("expected {owed} next")));
        }
        if let Some(last) = self.last_move_at {
            let ready_at = last + self.min_interval;
            if now < ready_at {
                let remaining = ready_at.duration_since(now);
                return Err(GameError::RateLimited {
                    remaining_ms: remaining.as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    /// Records a consumed move and transitions to the next phase.
    pub fn record(&mut self, next: TurnPhase, now: Instant) {
        self.phase = next;
        self.last_move_at = Some(now);
    }
}
