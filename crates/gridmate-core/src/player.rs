//! Player records and home zones.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::config::Difficulty;
use crate::ids::{PieceId, PlayerId};
use crate::turns::TurnState;

/// A rectangular home-zone region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeZone {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl HomeZone {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x
            && pos.x < self.x + self.width
            && pos.y >= self.y
            && pos.y < self.y + self.height
    }

    /// Every position inside the zone, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Position> + use<> {
        let (x0, y0, w, h) = (self.x, self.y, self.width, self.height);
        (0..h).flat_map(move |dy| (0..w).map(move |dx| Position::new(x0 + dx, y0 + dy)))
    }

    pub fn shift(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }

    /// Grows the zone by one row on the side facing away from `forward`
    /// (behind the back rank). Used when a purchase finds no free seat.
    pub fn extend_back(&mut self, forward: (i32, i32)) {
        match forward {
            (0, dy) if dy < 0 => self.height += 1,
            (0, _) => {
                self.y -= 1;
                self.height += 1;
            }
            (dx, _) if dx < 0 => self.width += 1,
            _ => {
                self.x -= 1;
                self.width += 1;
            }
        }
    }
}

/// One player in a game.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    /// Palette index, unique among active players.
    pub color: u8,
    pub home: HomeZone,
    pub pieces: Vec<PieceId>,
    pub score: u64,
    /// Cumulative purchase fees paid; feeds the king-capture transfer.
    pub purchase_total: u64,
    pub paused_at: Option<Instant>,
    pub turns: TurnState,
    /// Unit vector from the home zone toward the board center at
    /// seeding time. Pawn "forward" direction.
    pub forward: (i32, i32),
    /// Set once the degradation sweep has released an emptied zone.
    pub zone_released: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        username: String,
        color: u8,
        home: HomeZone,
        forward: (i32, i32),
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id,
            username,
            color,
            home,
            pieces: Vec::new(),
            score: 0,
            purchase_total: 0,
            paused_at: None,
            turns: TurnState::new(difficulty),
            forward,
            zone_released: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}
