use thiserror::Error;

use crate::crypto::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("Stake {stake} is below the floor price {floor}")]
    InsufficientStake { stake: u128, floor: u128 },
    #[error("Zone {0} already exists")]
    ZoneAlreadyExists(String),
    #[error("Zone is already owned")]
    ZoneAlreadyOwned,
    #[error("Zone has no owner")]
    ZoneHasNoOwner,
    #[error("Caller {0} is not the zone owner")]
    NotOwner(Address),

    #[error("Cooldown period did not end yet (ends at {ends_at})")]
    CooldownNotElapsed { ends_at: u64 },
    #[error("Auction is closed, cooldown period did not end yet (ends at {cooldown_ends_at})")]
    AuctionClosed { cooldown_ends_at: u64 },
    #[error("Zone owner cannot start an auction")]
    OwnerCannotStartAuction,
    #[error("Caller is already the highest bidder")]
    AlreadyHighestBidder,
    #[error("Bid of {bid} does not reach the minimum of {required}")]
    RaiseTooSmall { bid: u128, required: u128 },
    #[error("Auction {0} not found")]
    AuctionNotFound(u64),
    #[error("Auction {0} is still open")]
    AuctionStillOpen(u64),
    #[error("Nothing to withdraw from auction {0}")]
    NothingToWithdraw(u64),
    #[error("Operation not allowed while an auction is running")]
    AuctionInProgress,

    #[error("Teller position {0} is not inside the zone")]
    TellerOutsideZone(String),
    #[error("Invalid teller position: {0}")]
    InvalidTellerPosition(String),
    #[error("Teller must be a buyer or a seller")]
    InvalidTellerSettings,
    #[error("Rate {0} is outside -9999..=9999")]
    RateOutOfRange(i16),
    #[error("Referral fee {0} exceeds 10000 basis points")]
    ReferralFeeTooHigh(u16),
    #[error("Zone has no active teller")]
    NoTeller,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl ZoneError {
    /// Rejected because a cooldown window has not elapsed
    pub fn is_cooldown(&self) -> bool {
        matches!(self, ZoneError::CooldownNotElapsed { .. } | ZoneError::AuctionClosed { .. })
    }

    /// Rejected because the bid period of the last auction is over
    pub fn is_auction_closed(&self) -> bool {
        matches!(self, ZoneError::AuctionClosed { .. })
    }
}
