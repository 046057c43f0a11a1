//! Transfer payload decoding
//!
//! A DTH transfer to a protocol contract carries its intent in the data field:
//!
//! | length | content                           | target  |
//! |--------|-----------------------------------|---------|
//! | 1      | `0x41` claim, `0x42` bid, `0x43` top-up | zone    |
//! | 8      | country(2) + geohash(6)           | factory |
//! | 9      | country(2) + geohash(6) + tier(1) | factory |

use super::PayloadError;
use crate::constants::ZONE_GEOHASH_LEN;
use crate::geo::{CountryCode, Geohash};

pub const TAG_CLAIM_FREE: u8 = 0x41;
pub const TAG_BID: u8 = 0x42;
pub const TAG_TOP_UP: u8 = 0x43;

pub const MAX_TIER: u8 = 2;

const CREATE_LEN: usize = 2 + ZONE_GEOHASH_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateZone {
    pub country: CountryCode,
    pub geohash: Geohash,
    pub tier: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZonePayload {
    Create(CreateZone),
    ClaimFree,
    Bid,
    TopUp,
}

impl ZonePayload {
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        match data.len() {
            0 => Err(PayloadError::Empty),
            1 => match data[0] {
                TAG_CLAIM_FREE => Ok(ZonePayload::ClaimFree),
                TAG_BID => Ok(ZonePayload::Bid),
                TAG_TOP_UP => Ok(ZonePayload::TopUp),
                other => Err(PayloadError::UnknownTag(other)),
            },
            n if n == CREATE_LEN || n == CREATE_LEN + 1 => {
                let country = CountryCode::from_bytes([data[0], data[1]])?;
                let geohash = Geohash::parse(&data[2..CREATE_LEN], ZONE_GEOHASH_LEN)?;
                let tier = data.get(CREATE_LEN).copied().unwrap_or(0);
                if tier > MAX_TIER {
                    return Err(PayloadError::InvalidTier(tier));
                }
                Ok(ZonePayload::Create(CreateZone { country, geohash, tier }))
            }
            n => Err(PayloadError::InvalidLength(n)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ZonePayload::ClaimFree => vec![TAG_CLAIM_FREE],
            ZonePayload::Bid => vec![TAG_BID],
            ZonePayload::TopUp => vec![TAG_TOP_UP],
            ZonePayload::Create(create) => {
                let mut bytes = Vec::with_capacity(CREATE_LEN + 1);
                bytes.extend_from_slice(&create.country.as_bytes());
                bytes.extend_from_slice(create.geohash.as_bytes());
                if create.tier != 0 {
                    bytes.push(create.tier);
                }
                bytes
            }
        }
    }
}
