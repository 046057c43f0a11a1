//! Wallet module - key management and transaction signing

#[allow(clippy::module_inception)]
mod wallet;

pub use wallet::*;
