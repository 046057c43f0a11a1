//! Zone module - ownership, auctions, tax and tellers of a single geohash zone

mod auction;
mod error;
mod tax;
mod teller;
#[allow(clippy::module_inception)]
mod zone;

pub use auction::*;
pub use error::*;
pub use tax::*;
pub use teller::*;
pub use zone::*;
