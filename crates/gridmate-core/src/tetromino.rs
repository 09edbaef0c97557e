//! Tetromino shapes and rotation tables.
//!
//! Each of the seven canonical pieces is stored as up to four 4×4
//! boolean masks (O has one distinct rotation; I, S and Z have two;
//! T, J and L have four). Placement legality and resolution live on the
//! `Game` aggregate, which combines these masks with the connectivity
//! engine.

use serde::{Deserialize, Serialize};

use crate::board::Position;

/// The seven canonical tetromino types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

type Mask = [[u8; 4]; 4];

const I_ROTS: [Mask; 2] = [
    [[1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]],
];

const O_ROTS: [Mask; 1] = [[[1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]];

const T_ROTS: [Mask; 4] = [
    [[1, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 1, 0, 0], [1, 0, 0, 0], [0, 0, 0, 0]],
];

const S_ROTS: [Mask; 2] = [
    [[0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const Z_ROTS: [Mask; 2] = [
    [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 0, 0], [1, 0, 0, 0], [0, 0, 0, 0]],
];

const J_ROTS: [Mask; 4] = [
    [[1, 0, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 1, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 1, 1, 0], [0, 0, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
];

const L_ROTS: [Mask; 4] = [
    [[0, 0, 1, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 0, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
    [[1, 1, 1, 0], [1, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

impl TetrominoKind {
    pub const ALL: [TetrominoKind; 7] = [
        Self::I,
        Self::O,
        Self::T,
        Self::S,
        Self::Z,
        Self::J,
        Self::L,
    ];

    /// The distinct rotation masks for this piece.
    pub fn rotations(self) -> &'static [Mask] {
        match self {
            Self::I => &I_ROTS,
            Self::O => &O_ROTS,
            Self::T => &T_ROTS,
            Self::S => &S_ROTS,
            Self::Z => &Z_ROTS,
            Self::J => &J_ROTS,
            Self::L => &L_ROTS,
        }
    }

    /// Mask for a rotation index; indices wrap so any `u8` is valid.
    pub fn mask(self, rotation: u8) -> &'static Mask {
        let rots = self.rotations();
        &rots[rotation as usize % rots.len()]
    }

    /// Board positions covered by this piece when its mask origin is
    /// anchored at `origin`. Always exactly four cells.
    pub fn cells(self, rotation: u8, origin: Position) -> Vec<Position> {
        let mask = self.mask(rotation);
        let mut out = Vec::with_capacity(4);
        for (row, cols) in mask.iter().enumerate() {
            for (col, filled) in cols.iter().enumerate() {
                if *filled == 1 {
                    out.push(origin.offset(col as i32, row as i32));
                }
            }
        }
        out
    }
}
