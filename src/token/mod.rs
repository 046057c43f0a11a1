//! Token module - DTH ledger and the wrapped voting token

mod dth;
mod wrapper;

pub use dth::*;
pub use wrapper::*;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Transfer to the zero address")]
    ZeroAddress,
    #[error("Amount overflow")]
    Overflow,
}
