//! Game lifecycle management for Gridmate.
//!
//! Each game runs as an isolated Tokio task (actor model) owning one
//! [`gridmate_core::Game`]. Commands arrive over an mpsc channel, so
//! every operation on a game is serialized without locks; events the
//! engine emits are drained after each command and fanned into a
//! registry-wide broadcast channel.
//!
//! # Key types
//!
//! - [`GameRegistry`] — creates/destroys games, hands out handles
//! - [`GameHandle`] — send commands to a running game actor
//! - [`GameStatus`] — actor metadata (players, ended, winner)
//! - [`RegistryError`] — routing failures, wrapping [`gridmate_core::GameError`]
//! - [`spawn_sweeper`] — periodic pause-timeout, degradation, and
//!   archiving driver

mod actor;
mod error;
mod registry;
mod sweep;

pub use actor::{EventSender, GameHandle, GameStatus, JoinOutcome};
pub use error::RegistryError;
pub use registry::GameRegistry;
pub use sweep::spawn_sweeper;
