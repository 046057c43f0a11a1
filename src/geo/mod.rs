//! Geo module - geohash cells, country codes and the country membership registry

mod geohash;
mod registry;

pub use geohash::*;
pub use registry::*;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("Invalid geohash length: expected {expected}, got {got}")]
    InvalidGeohashLength { expected: usize, got: usize },
    #[error("Invalid geohash character: {0:?}")]
    InvalidGeohashChar(char),
    #[error("Invalid country code: {0}")]
    InvalidCountryCode(String),
    #[error("Unknown country: {0}")]
    UnknownCountry(CountryCode),
}
