//! Events emitted by committed operations
//!
//! Recorded in block receipts and returned over RPC. Amounts are decimal
//! strings in JSON and plain integers in the binary block encoding.

use serde::{Deserialize, Serialize};

use crate::crypto::Address;
use crate::geo::CountryCode;
use crate::governance::{FailureReason, ProposalKind};
use crate::params::GlobalParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Transfer { from: Address, to: Address, #[serde(with = "as_decimal")] amount: u128 },
    Minted { to: Address, #[serde(with = "as_decimal")] amount: u128 },
    Wrapped { holder: Address, #[serde(with = "as_decimal")] amount: u128 },
    Unwrapped { holder: Address, #[serde(with = "as_decimal")] amount: u128 },

    CountryEnabled { country: CountryCode, prefixes: usize },
    CountryDisabled { country: CountryCode },

    ZoneCreated {
        zone: Address,
        geohash: String,
        owner: Address,
        #[serde(with = "as_decimal")] stake: u128,
    },
    ZoneClaimed { zone: Address, owner: Address, #[serde(with = "as_decimal")] stake: u128 },
    ToppedUp { zone: Address, owner: Address, #[serde(with = "as_decimal")] amount: u128 },
    AuctionStarted {
        zone: Address,
        auction_id: u64,
        bidder: Address,
        #[serde(with = "as_decimal")] amount: u128,
        end_time: u64,
    },
    BidPlaced {
        zone: Address,
        auction_id: u64,
        bidder: Address,
        #[serde(with = "as_decimal")] amount: u128,
    },
    AuctionEnded {
        zone: Address,
        auction_id: u64,
        winner: Address,
        #[serde(with = "as_decimal")] amount: u128,
    },
    AuctionWithdrawn {
        zone: Address,
        auction_id: u64,
        bidder: Address,
        #[serde(with = "as_decimal")] amount: u128,
    },
    EntryFeePaid { zone: Address, bidder: Address, #[serde(with = "as_decimal")] amount: u128 },
    TaxCollected { zone: Address, owner: Address, #[serde(with = "as_decimal")] amount: u128 },
    ZoneReleased { zone: Address, owner: Address, #[serde(with = "as_decimal")] returned: u128 },
    ZoneForceReleased { zone: Address, owner: Address },
    TellerAdded { zone: Address, owner: Address, position: String },
    TellerRemoved { zone: Address, owner: Address },

    ProposalCreated { id: u64, proposer: Address, kind: ProposalKind, snapshot_block: u64 },
    VoteCast { id: u64, voter: Address, support: bool, #[serde(with = "as_decimal")] weight: u128 },
    ProposalExecuted { id: u64 },
    ProposalFailed { id: u64, reason: FailureReason },

    GlobalParamsUpdated { params: GlobalParams },
    CountryFloorPriceSet { country: CountryCode, #[serde(with = "as_decimal")] price: u128 },
    FreeClaimSet { country: CountryCode, enabled: bool },
    TreasuryDeposit { from: Address, #[serde(with = "as_decimal")] amount: u128 },
    WithdrawDth { recipient: Address, #[serde(with = "as_decimal")] amount: u128, memo: String },
    WithdrawDthTransferFailed {
        recipient: Address,
        #[serde(with = "as_decimal")] amount: u128,
        memo: String,
    },
    AdminRenounced { admin: Address },
}

mod as_decimal {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(value)
        } else {
            serializer.serialize_u128(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            u128::deserialize(deserializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DTH;
    use serde_json::json;

    #[test]
    fn test_json_amounts_are_decimal_strings() {
        let event = Event::TaxCollected { zone: Address([1; 20]), owner: Address([2; 20]), amount: 500 * DTH };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["tax_collected"]["amount"], json!("500000000000000000000"));
        assert_eq!(value["tax_collected"]["owner"], json!(Address([2; 20]).to_string()));

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_binary_encoding_keeps_integers() {
        let event = Event::Minted { to: Address([3; 20]), amount: u128::MAX };
        let bytes = bincode::serialize(&event).unwrap();
        assert_eq!(bincode::deserialize::<Event>(&bytes).unwrap(), event);
    }
}
