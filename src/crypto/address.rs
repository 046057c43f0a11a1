//! Account and contract addresses
//!
//! An address is 20 bytes. User addresses come from the BLAKE3 hash of the
//! Schnorr public key, contract addresses from a tagged hash of their identity
//! (e.g. the zone geohash). Text form is `"DT" + Base58Check(bytes + checksum[0:4])`.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{double_hash, hash_bytes, hash_tagged, PublicKey};

/// Address text prefix
pub const ADDRESS_PREFIX: &str = "DT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address prefix")]
    InvalidPrefix,
    #[error("Invalid base58 encoding")]
    InvalidEncoding,
    #[error("Invalid address length")]
    InvalidLength,
    #[error("Invalid checksum")]
    InvalidChecksum,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn zero() -> Self {
        Address([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Address owned by a Schnorr key
    pub fn from_public_key(key: &PublicKey) -> Self {
        let hash = hash_bytes(&key.0);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.0[0..20]);
        Address(bytes)
    }

    /// Deterministic address of a protocol contract
    pub fn contract(kind: &str, identity: &[u8]) -> Self {
        let hash = hash_tagged("dether:contract", &[kind.as_bytes(), identity]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.0[0..20]);
        Address(bytes)
    }

    pub fn to_base58(&self) -> String {
        let checksum = double_hash(&self.0);
        let mut with_checksum = Vec::with_capacity(24);
        with_checksum.extend_from_slice(&self.0);
        with_checksum.extend_from_slice(&checksum.0[0..4]);
        format!("{}{}", ADDRESS_PREFIX, bs58::encode(&with_checksum).into_string())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s.strip_prefix(ADDRESS_PREFIX).ok_or(AddressError::InvalidPrefix)?;
        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| AddressError::InvalidEncoding)?;
        if decoded.len() != 24 {
            return Err(AddressError::InvalidLength);
        }

        let (body, checksum) = decoded.split_at(20);
        let expected = double_hash(body);
        if checksum != &expected.0[0..4] {
            return Err(AddressError::InvalidChecksum);
        }

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(body);
        Ok(Address(bytes))
    }
}

// Text form for JSON, raw bytes for bincode
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            <[u8; 20]>::deserialize(deserializer).map(Address)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}
