//! Teller attached to a zone by its owner

use serde::{Deserialize, Serialize};

use super::{Zone, ZoneEffects, ZoneError};
use crate::constants::TELLER_GEOHASH_LEN;
use crate::crypto::Address;
use crate::events::Event;
use crate::geo::Geohash;

pub const TELLER_BUYER: u8 = 0x01;
pub const TELLER_SELLER: u8 = 0x02;

const MAX_RATE: i16 = 9_999;
const MAX_REFERRAL_FEE: u16 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teller {
    /// 12-character geohash inside the zone
    pub position: String,
    pub currency_id: u16,
    pub messenger: String,
    /// Basis points over the reference rate
    pub sell_rate: i16,
    pub buy_rate: i16,
    /// Bitmask of TELLER_BUYER / TELLER_SELLER
    pub settings: u8,
    pub referrer: Option<Address>,
    /// Basis points of the teller's fees paid to the referrer
    pub referral_fee: u16,
    pub description: String,
}

impl Teller {
    pub fn validate(&self, zone: &Geohash) -> Result<(), ZoneError> {
        let position = Geohash::parse(self.position.as_bytes(), TELLER_GEOHASH_LEN)
            .map_err(|e| ZoneError::InvalidTellerPosition(e.to_string()))?;
        if !zone.contains(&position) {
            return Err(ZoneError::TellerOutsideZone(self.position.clone()));
        }
        if self.settings & (TELLER_BUYER | TELLER_SELLER) == 0 {
            return Err(ZoneError::InvalidTellerSettings);
        }
        for rate in [self.sell_rate, self.buy_rate] {
            if !(-MAX_RATE..=MAX_RATE).contains(&rate) {
                return Err(ZoneError::RateOutOfRange(rate));
            }
        }
        if self.referral_fee > MAX_REFERRAL_FEE {
            return Err(ZoneError::ReferralFeeTooHigh(self.referral_fee));
        }
        Ok(())
    }

    pub fn is_buyer(&self) -> bool {
        self.settings & TELLER_BUYER != 0
    }

    pub fn is_seller(&self) -> bool {
        self.settings & TELLER_SELLER != 0
    }
}

impl Zone {
    pub fn add_teller(&mut self, caller: Address, teller: Teller, now: u64) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            zone.require_owner(&caller)?;
            teller.validate(zone.geohash())?;

            effects.events.push(Event::TellerAdded {
                zone: zone.address(),
                owner: caller,
                position: teller.position.clone(),
            });
            zone.teller = Some(teller);
            Ok(effects)
        })
    }

    pub fn remove_teller(&mut self, caller: Address, now: u64) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            zone.require_owner(&caller)?;
            zone.teller.take().ok_or(ZoneError::NoTeller)?;

            effects.events.push(Event::TellerRemoved { zone: zone.address(), owner: caller });
            Ok(effects)
        })
    }
}
