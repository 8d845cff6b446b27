//! Results export and player-state persistence.
//!
//! This crate provides:
//! - CSV statistic tables per `(policy, roi)` group
//! - CSV per-game-index trajectory tables
//! - JSON persistence of terminal player states

pub mod csv_storage;
pub mod error;
pub mod player_store;

pub use csv_storage::StatsWriter;
pub use error::StorageError;
pub use player_store::{PersistedPlayers, PlayerStore};
