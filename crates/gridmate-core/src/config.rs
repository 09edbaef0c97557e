//! Game settings and the per-player cooldown table.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cooldown difficulty. Each player has their own setting, independent
/// of any global clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Minimum interval a player must wait between two moves.
    pub fn move_interval(self) -> Duration {
        match self {
            Self::Easy => Duration::from_millis(15_000),
            Self::Medium => Duration::from_millis(10_000),
            Self::Hard => Duration::from_millis(5_000),
        }
    }
}

/// Configuration for a game instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    /// Initial board width. The board grows on demand and never shrinks.
    pub board_width: i32,

    /// Initial board height.
    pub board_height: i32,

    /// How many cells to add per axis when the board must grow.
    pub growth_step: i32,

    /// Home zone width (also the row-clear threshold baseline).
    pub home_zone_width: i32,

    /// Home zone depth.
    pub home_zone_height: i32,

    /// Filled non-safe cells required before a row clears.
    pub row_clear_threshold: usize,

    /// Maximum players allowed in the game.
    pub max_players: usize,

    /// How long a player may stay paused before the timeout penalty.
    pub max_pause: Duration,

    /// Cooldown assigned to players who don't pick one explicitly.
    pub default_difficulty: Difficulty,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            board_width: 32,
            board_height: 32,
            growth_step: 16,
            home_zone_width: 8,
            home_zone_height: 2,
            row_clear_threshold: 8,
            max_players: 8,
            max_pause: Duration::from_secs(300),
            default_difficulty: Difficulty::Medium,
        }
    }
}
