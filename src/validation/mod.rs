//! Validation module - signed transactions and the calls they carry

mod transaction;

pub use transaction::*;
