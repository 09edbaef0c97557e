//! Core rules engine for Gridmate.
//!
//! Gridmate fuses tetromino placement with chess on a shared, growing
//! board: players extend their territory with blocks, move chess pieces
//! across any owned or contested ground, and win by capturing every
//! rival king. This crate is the synchronous heart of that game — pure
//! state and rules, no I/O, no clocks, no networking.
//!
//! # Key types
//!
//! - [`Game`] — one game instance; all mutation goes through it
//! - [`Board`] — sparse grid of owned cells with symmetric growth
//! - [`IslandMap`] — connected-component bookkeeping per owner
//! - [`GameEvent`] — outbound notifications drained by the caller
//! - [`GameSnapshot`] — serializable point-in-time view
//! - [`GameError`] — every way a request can be rejected
//!
//! Callers supply monotonic [`std::time::Instant`]s for every
//! time-sensitive operation; the engine itself never reads a clock,
//! which keeps cooldown and pause rules deterministic under test.

mod board;
mod chess;
mod config;
mod connectivity;
mod economy;
mod error;
mod event;
mod game;
mod ids;
mod piece;
mod player;
mod rows;
mod snapshot;
mod tetromino;
mod turns;

pub use board::{Board, Cell, CellOrigin, Position};
pub use chess::{has_any_legal_move, legal_destinations, validate_move};
pub use config::{Difficulty, GameSettings};
pub use connectivity::{has_path_to_king, Island, IslandMap};
pub use economy::{Ledger, Transaction, TransactionKind};
pub use error::GameError;
pub use event::GameEvent;
pub use game::{
    Game, MoveOutcome, MoveRequest, PieceSelector, Placement, PurchaseOutcome,
};
pub use ids::{GameId, IslandId, PieceId, PlayerId};
pub use piece::{Piece, PieceKind};
pub use player::{HomeZone, Player};
pub use rows::{sweep_rows, RowClearOutcome};
pub use snapshot::{CellSnapshot, GameSnapshot, IslandSnapshot, PlayerSnapshot};
pub use tetromino::TetrominoKind;
pub use turns::{TurnPhase, TurnState};
