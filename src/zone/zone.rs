//! Zone state and ownership operations
//!
//! A zone is keyed by a 6-character geohash. It owns its owner record, the
//! append-only auction list and the escrowed bids. Token custody lives in the
//! ledger under the zone address; every operation returns [`ZoneEffects`]
//! describing the token movements the coordinator must perform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Auction, AuctionState, Teller, ZoneError};
use crate::crypto::Address;
use crate::events::Event;
use crate::geo::{CountryCode, Geohash};
use crate::params::GlobalParams;

/// Current owner of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOwner {
    pub address: Address,
    pub start_time: u64,
    /// Escrowed at acquisition, reduced only by tax
    pub staked: u128,
    /// Prepaid tax credit
    pub balance: u128,
    pub last_tax_time: u64,
    /// Last auction this owner took part in, 0 if none
    pub auction_id: u64,
}

/// Token movements and events produced by a zone operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneEffects {
    /// Moved from the zone address to the treasury
    pub to_treasury: u128,
    /// Moved from the zone address to each recipient
    pub payouts: Vec<(Address, u128)>,
    pub events: Vec<Event>,
}

impl ZoneEffects {
    pub(crate) fn collect(&mut self, amount: u128) {
        self.to_treasury += amount;
    }

    pub(crate) fn pay(&mut self, to: Address, amount: u128) {
        if amount > 0 {
            self.payouts.push((to, amount));
        }
    }

    /// Total leaving the zone address
    pub fn outflow(&self) -> u128 {
        self.to_treasury + self.payouts.iter().map(|(_, amount)| amount).sum::<u128>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    geohash: Geohash,
    country: CountryCode,
    address: Address,
    tier: u8,
    pub(super) owner: Option<ZoneOwner>,
    pub(super) auctions: Vec<Auction>,
    pub(super) bids: BTreeMap<(u64, Address), u128>,
    pub(super) teller: Option<Teller>,
}

impl Zone {
    /// Deterministic address of the zone holding `geohash`
    pub fn address_for(geohash: &Geohash) -> Address {
        Address::contract("zone", geohash.as_bytes())
    }

    /// Create an owned zone; the whole stake is escrowed
    pub fn create(
        geohash: Geohash,
        country: CountryCode,
        tier: u8,
        owner: Address,
        stake: u128,
        floor_price: u128,
        now: u64,
    ) -> Result<(Zone, ZoneEffects), ZoneError> {
        if stake < floor_price {
            return Err(ZoneError::InsufficientStake { stake, floor: floor_price });
        }

        let address = Self::address_for(&geohash);
        let zone = Zone {
            address,
            country,
            tier,
            owner: Some(ZoneOwner {
                address: owner,
                start_time: now,
                staked: stake,
                balance: 0,
                last_tax_time: now,
                auction_id: 0,
            }),
            auctions: Vec::new(),
            bids: BTreeMap::new(),
            teller: None,
            geohash,
        };

        let mut effects = ZoneEffects::default();
        effects.events.push(Event::ZoneCreated {
            zone: address,
            geohash: zone.geohash.to_string(),
            owner,
            stake,
        });
        log::info!("zone {} created by {} with stake {}", zone.geohash, owner, stake);
        Ok((zone, effects))
    }

    pub fn geohash(&self) -> &Geohash {
        &self.geohash
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Stored owner record; may lag behind an ended but unresolved auction
    pub fn owner(&self) -> Option<&ZoneOwner> {
        self.owner.as_ref()
    }

    pub fn auctions(&self) -> &[Auction] {
        &self.auctions
    }

    pub fn auction(&self, id: u64) -> Option<&Auction> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.auctions.get(idx)
    }

    pub fn last_auction(&self) -> Option<&Auction> {
        self.auctions.last()
    }

    /// The auction accepting bids at `now`, if any
    pub fn active_auction(&self, now: u64) -> Option<&Auction> {
        self.auctions
            .last()
            .filter(|auction| auction.state_at(now) == AuctionState::Started)
    }

    /// Escrowed bid of `bidder` in `auction_id`
    pub fn bid_of(&self, auction_id: u64, bidder: &Address) -> u128 {
        self.bids.get(&(auction_id, *bidder)).copied().unwrap_or(0)
    }

    pub fn teller(&self) -> Option<&Teller> {
        self.teller.as_ref()
    }

    /// Start of the current cooldown window
    pub fn cooldown_base(&self) -> u64 {
        let acquired = self.owner.as_ref().map(|o| o.start_time).unwrap_or(0);
        let ended = self.auctions.last().map(|a| a.end_time).unwrap_or(0);
        acquired.max(ended)
    }

    /// Run `op` against a draft copy, committing only on success
    pub(super) fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Zone) -> Result<T, ZoneError>,
    ) -> Result<T, ZoneError> {
        let mut draft = self.clone();
        let out = op(&mut draft)?;
        *self = draft;
        Ok(out)
    }

    pub(super) fn require_owner(&self, caller: &Address) -> Result<&ZoneOwner, ZoneError> {
        let owner = self.owner.as_ref().ok_or(ZoneError::ZoneHasNoOwner)?;
        if owner.address != *caller {
            return Err(ZoneError::NotOwner(*caller));
        }
        Ok(owner)
    }

    /// Owner adds prepaid tax credit
    pub fn top_up(
        &mut self,
        caller: Address,
        amount: u128,
        now: u64,
        params: &GlobalParams,
    ) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            zone.require_owner(&caller)?;
            if zone.active_auction(now).is_some() {
                return Err(ZoneError::AuctionInProgress);
            }

            zone.settle_tax(now, params, &mut effects);
            let Some(owner) = zone.owner.as_mut() else {
                // the stake ran out first: keep the release, send the top-up back
                effects.pay(caller, amount);
                return Ok(effects);
            };
            owner.balance = owner.balance.checked_add(amount).ok_or(ZoneError::Overflow)?;

            effects.events.push(Event::ToppedUp { zone: zone.address, owner: caller, amount });
            Ok(effects)
        })
    }

    /// Owner gives the zone up; stake and balance net of tax are returned
    pub fn release(
        &mut self,
        caller: Address,
        now: u64,
        params: &GlobalParams,
    ) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            zone.require_owner(&caller)?;
            if zone.active_auction(now).is_some() {
                return Err(ZoneError::AuctionInProgress);
            }

            zone.settle_tax(now, params, &mut effects);
            // settle_tax may already have force released the zone
            if let Some(owner) = zone.owner.take() {
                let returned = owner.staked + owner.balance;
                effects.pay(owner.address, returned);
                effects.events.push(Event::ZoneReleased { zone: zone.address, owner: owner.address, returned });
                log::info!("zone {} released by {}, returned {}", zone.geohash, owner.address, returned);
            }
            zone.teller = None;
            Ok(effects)
        })
    }

    /// Take an unowned zone. Without a free-claim allowance the stake must
    /// reach the floor price.
    pub fn claim_free(
        &mut self,
        caller: Address,
        stake: u128,
        now: u64,
        floor_price: u128,
        free_claim: bool,
    ) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            if zone.owner.is_some() {
                return Err(ZoneError::ZoneAlreadyOwned);
            }
            if !free_claim && stake < floor_price {
                return Err(ZoneError::InsufficientStake { stake, floor: floor_price });
            }

            zone.take_ownership(caller, stake, now, &mut effects);
            Ok(effects)
        })
    }

    /// Install `caller` as owner of an unowned zone
    pub(super) fn take_ownership(&mut self, caller: Address, stake: u128, now: u64, effects: &mut ZoneEffects) {
        self.owner = Some(ZoneOwner {
            address: caller,
            start_time: now,
            staked: stake,
            balance: 0,
            last_tax_time: now,
            auction_id: 0,
        });
        effects.events.push(Event::ZoneClaimed { zone: self.address, owner: caller, stake });
        log::info!("zone {} claimed by {} with stake {}", self.geohash, caller, stake);
    }
}
