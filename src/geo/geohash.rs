//! Geohash and country code value types

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::GeoError;

/// Base32 alphabet used by geohashes (no `a`, `i`, `l`, `o`)
pub const GEOHASH_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// A validated geohash cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Geohash(String);

impl Geohash {
    /// Parse a geohash of exactly `len` characters
    pub fn parse(raw: &[u8], len: usize) -> Result<Self, GeoError> {
        if raw.len() != len {
            return Err(GeoError::InvalidGeohashLength { expected: len, got: raw.len() });
        }
        if let Some(bad) = raw.iter().find(|c| !GEOHASH_ALPHABET.contains(*c)) {
            return Err(GeoError::InvalidGeohashChar(*bad as char));
        }
        // all bytes are ascii after the alphabet check
        Ok(Geohash(raw.iter().map(|c| *c as char).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First `n` characters of the cell
    pub fn prefix(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }

    /// True when `other` lies inside this cell
    pub fn contains(&self, other: &Geohash) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for Geohash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO 3166 alpha-2 country code, stored as two uppercase ASCII bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryCode(pub [u8; 2]);

impl CountryCode {
    pub fn from_bytes(raw: [u8; 2]) -> Result<Self, GeoError> {
        if raw.iter().all(|b| b.is_ascii_uppercase()) {
            Ok(CountryCode(raw))
        } else {
            Err(GeoError::InvalidCountryCode(String::from_utf8_lossy(&raw).into_owned()))
        }
    }

    pub fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl FromStr for CountryCode {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(GeoError::InvalidCountryCode(s.to_string()));
        }
        CountryCode::from_bytes([bytes[0], bytes[1]])
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            <[u8; 2]>::deserialize(deserializer).map(CountryCode)
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self)
    }
}
