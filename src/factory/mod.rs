//! Factory module - transfer payload decoding and the zone registry

#[allow(clippy::module_inception)]
mod factory;
mod payload;

pub use factory::*;
pub use payload::*;

use thiserror::Error;

use crate::crypto::Address;
use crate::geo::{CountryCode, GeoError};
use crate::zone::ZoneError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Empty payload")]
    Empty,
    #[error("Unknown payload tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("Invalid payload length {0}")]
    InvalidLength(usize),
    #[error("Invalid zone tier {0}")]
    InvalidTier(u8),
    #[error("Invalid geo data: {0}")]
    Geo(#[from] GeoError),
    #[error("Payload not accepted by {0}")]
    WrongTarget(Address),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("Country {0} is not enabled")]
    CountryDisabled(CountryCode),
    #[error("Geohash {geohash} is not inside {country}")]
    GeohashNotInCountry { country: CountryCode, geohash: String },
    #[error("No zone at {0}")]
    UnknownZone(Address),
    #[error(transparent)]
    Zone(#[from] ZoneError),
}
