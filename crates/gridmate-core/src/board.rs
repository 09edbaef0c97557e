//! Board and ownership store: a sparse 2-D grid of owned cells.
//!
//! The board grows on demand and never shrinks. Growth is symmetric:
//! existing cells are re-offset toward the new center, and the caller
//! applies the same offset to every piece and home zone so the two views
//! never drift apart.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::ids::{IslandId, PieceId, PlayerId};

/// An integer board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four cardinal neighbors. May be out of bounds; lookups on
    /// the sparse map simply miss for those.
    pub fn neighbors(self) -> [Position; 4] {
        [
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y),
            Position::new(self.x, self.y + 1),
            Position::new(self.x, self.y - 1),
        ]
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// How a cell came to be owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOrigin {
    /// Seeded as part of a player's home zone.
    HomeZone,
    /// Written by a tetromino placement.
    Tetromino,
    /// Claimed by a chess piece arriving on previously unowned ground.
    Generic,
}

/// One owned cell of the board.
///
/// Invariant: if `piece` is set, the piece's owner equals `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub owner: PlayerId,
    pub piece: Option<PieceId>,
    pub origin: CellOrigin,
    pub island: Option<IslandId>,
}

impl Cell {
    pub fn new(owner: PlayerId, origin: CellOrigin) -> Self {
        Self {
            owner,
            piece: None,
            origin,
            island: None,
        }
    }
}

/// Sparse grid of owned cells with logical bounds.
#[derive(Debug, Clone)]
pub struct Board {
    width: i32,
    height: i32,
    cells: HashMap<Position, Cell>,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Validated bounds check for operations that must report bad
    /// coordinates instead of silently missing.
    pub fn require_in_bounds(&self, pos: Position) -> Result<(), GameError> {
        if self.in_bounds(pos) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds(pos.x, pos.y))
        }
    }

    /// Returns the cell at `pos`, or `None` when empty or out of bounds.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.cells.get_mut(&pos)
    }

    /// The owner of the cell at `pos`, if any.
    pub fn owner_at(&self, pos: Position) -> Option<PlayerId> {
        self.cells.get(&pos).map(|c| c.owner)
    }

    /// Writes a cell, replacing whatever was there. Out-of-bounds
    /// coordinates are a reported error, never a silent write.
    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<Option<Cell>, GameError> {
        self.require_in_bounds(pos)?;
        Ok(self.cells.insert(pos, cell))
    }

    /// Removes the cell at `pos`, returning it if present.
    pub fn remove(&mut self, pos: Position) -> Option<Cell> {
        self.cells.remove(&pos)
    }

    /// All currently occupied positions.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.keys().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Grows the board symmetrically by `add_width` × `add_height`,
    /// re-offsetting every existing cell toward the new center.
    ///
    /// Returns the `(dx, dy)` offset that was applied; the caller must
    /// apply the same offset to every piece position and home zone so
    /// expansion stays atomic with respect to dependent coordinates.
    pub fn expand(&mut self, add_width: i32, add_height: i32) -> (i32, i32) {
        let dx = add_width / 2;
        let dy = add_height / 2;
        self.width += add_width;
        self.height += add_height;

        if dx != 0 || dy != 0 {
            let shifted: HashMap<Position, Cell> = self
                .cells
                .drain()
                .map(|(pos, cell)| (pos.offset(dx, dy), cell))
                .collect();
            self.cells = shifted;
        }

        tracing::debug!(
            width = self.width,
            height = self.height,
            dx,
            dy,
            "board expanded"
        );
        (dx, dy)
    }
}
