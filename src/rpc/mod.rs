//! JSON-RPC API Module
//!
//! HTTP interface for wallets and tools to query the node and submit
//! signed transactions.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
