//! Dether protocol core library
//!
//! Geohash zones auctioned and taxed in DTH, a wrapped voting token and a
//! proposal/vote/execute governance loop, sequenced into blocks of signed
//! transactions by a single node.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod events;
pub mod factory;
pub mod geo;
pub mod governance;
pub mod node;
pub mod params;
pub mod rpc;
pub mod storage;
pub mod token;
pub mod validation;
pub mod wallet;
pub mod zone;

/// Protocol constants
pub mod constants {
    /// One DTH in base units (18 decimals)
    pub const DTH: u128 = 1_000_000_000_000_000_000;

    pub const ONE_HOUR: u64 = 3_600;
    pub const ONE_DAY: u64 = 24 * ONE_HOUR;

    /// Zone tax rates are expressed in percent per this period
    pub const TAX_PERIOD: u64 = ONE_DAY;

    pub const DEFAULT_BID_PERIOD: u64 = 48 * ONE_HOUR;
    pub const DEFAULT_COOLDOWN_PERIOD: u64 = 24 * ONE_HOUR;
    pub const DEFAULT_ENTRY_FEE: u32 = 4;
    pub const DEFAULT_ZONE_TAX: u32 = 4;
    pub const DEFAULT_MIN_RAISE: u32 = 6;

    /// Floor stake price for countries without an override
    pub const DEFAULT_FLOOR_STAKE_PRICE: u128 = 100 * DTH;

    /// Fixed-point scale of voting percentages (100% = PCT_BASE)
    pub const PCT_BASE: u128 = 1_000_000_000_000_000_000;

    pub const DEFAULT_MIN_ACCEPT_QUORUM: u128 = 25 * PCT_BASE / 100;
    pub const DEFAULT_SUPPORT_REQUIRED: u128 = 60 * PCT_BASE / 100;
    pub const DEFAULT_MIN_PROPOSAL_BALANCE: u128 = DTH;
    pub const DEFAULT_VOTING_DURATION: u64 = 7 * ONE_DAY;

    pub const ZONE_GEOHASH_LEN: usize = 6;
    pub const TELLER_GEOHASH_LEN: usize = 12;
    pub const COUNTRY_PREFIX_LEN: usize = 4;

    /// Block and transaction format version
    pub const PROTOCOL_VERSION: u32 = 1;

    /// Default genesis timestamp (Unix seconds)
    pub const GENESIS_TIMESTAMP: u64 = 1_767_225_600; // 2026-01-01

    pub const CHAIN_NAME: &str = "dether";
}

/// Convert a whole percentage into the fixed-point voting scale
pub fn to_voting_pct(percent: u32) -> u128 {
    u128::from(percent) * constants::PCT_BASE / 100
}
