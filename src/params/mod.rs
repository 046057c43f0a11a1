//! Protocol parameters - global auction settings and per-country floor prices
//!
//! Single writer: only the governance controller mutates a [`ParameterStore`]
//! (the setters are crate-private). Zones read it fresh on every operation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BID_PERIOD, DEFAULT_COOLDOWN_PERIOD, DEFAULT_ENTRY_FEE, DEFAULT_FLOOR_STAKE_PRICE,
    DEFAULT_MIN_RAISE, DEFAULT_ZONE_TAX,
};
use crate::geo::CountryCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("Bid period must be greater than zero")]
    ZeroBidPeriod,
    #[error("{field} must be a percentage between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u64 },
    #[error("Floor stake price must be greater than zero")]
    ZeroFloorPrice,
}

/// Auction settings shared by every zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalParams {
    /// Seconds an auction accepts bids after opening
    pub bid_period: u64,
    /// Seconds after creation, claim or auction end before a new auction may open
    pub cooldown_period: u64,
    /// Percent of each challenger bid paid to the treasury
    pub entry_fee: u32,
    /// Percent of stake charged per tax period
    pub zone_tax: u32,
    /// Minimum percent raise over the current highest bid
    pub min_raise: u32,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            bid_period: DEFAULT_BID_PERIOD,
            cooldown_period: DEFAULT_COOLDOWN_PERIOD,
            entry_fee: DEFAULT_ENTRY_FEE,
            zone_tax: DEFAULT_ZONE_TAX,
            min_raise: DEFAULT_MIN_RAISE,
        }
    }
}

impl GlobalParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.bid_period == 0 {
            return Err(ParamsError::ZeroBidPeriod);
        }
        for (field, value) in [
            ("entry_fee", self.entry_fee),
            ("zone_tax", self.zone_tax),
            ("min_raise", self.min_raise),
        ] {
            if value > 100 {
                return Err(ParamsError::PercentOutOfRange { field, value: u64::from(value) });
            }
        }
        Ok(())
    }
}

/// Versioned parameter store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterStore {
    global: GlobalParams,
    base_floor_price: u128,
    floor_prices: BTreeMap<CountryCode, u128>,
    free_claim: BTreeSet<CountryCode>,
    version: u64,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(GlobalParams::default(), DEFAULT_FLOOR_STAKE_PRICE)
    }
}

impl ParameterStore {
    pub fn new(global: GlobalParams, base_floor_price: u128) -> Self {
        Self {
            global,
            base_floor_price,
            floor_prices: BTreeMap::new(),
            free_claim: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn global(&self) -> &GlobalParams {
        &self.global
    }

    /// Floor stake price of a country, falling back to the base price
    pub fn floor_price(&self, country: CountryCode) -> u128 {
        self.floor_prices.get(&country).copied().unwrap_or(self.base_floor_price)
    }

    pub fn base_floor_price(&self) -> u128 {
        self.base_floor_price
    }

    pub fn free_claim_enabled(&self, country: CountryCode) -> bool {
        self.free_claim.contains(&country)
    }

    /// Bumped on every committed change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_global(&mut self, params: GlobalParams) -> Result<(), ParamsError> {
        params.validate()?;
        self.global = params;
        self.version += 1;
        Ok(())
    }

    pub(crate) fn set_floor_price(&mut self, country: CountryCode, price: u128) -> Result<(), ParamsError> {
        if price == 0 {
            return Err(ParamsError::ZeroFloorPrice);
        }
        self.floor_prices.insert(country, price);
        self.version += 1;
        Ok(())
    }

    pub(crate) fn set_free_claim(&mut self, country: CountryCode, enabled: bool) {
        if enabled {
            self.free_claim.insert(country);
        } else {
            self.free_claim.remove(&country);
        }
        self.version += 1;
    }
}
