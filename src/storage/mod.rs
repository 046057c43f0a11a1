//! Storage module - protocol state and its on-disk persistence

mod state;
pub mod db;

pub use state::*;
pub use db::{ChainDb, StorageError};
