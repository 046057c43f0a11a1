//! Chain module - blocks, call execution and sequencing

mod block;
#[allow(clippy::module_inception)]
mod chain;
mod executor;

pub use block::*;
pub use chain::*;
pub use executor::*;
