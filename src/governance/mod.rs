//! Governance module - proposals, token-weighted voting and the protocol controller

mod controller;
mod error;
mod proposal;
mod treasury;
mod voting;

pub use controller::*;
pub use error::*;
pub use proposal::*;
pub use treasury::*;
pub use voting::*;
