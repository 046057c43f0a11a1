//! Zone registry: one zone per geohash, addressed deterministically

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CreateZone, FactoryError};
use crate::crypto::Address;
use crate::geo::{GeoOracle, Geohash};
use crate::zone::{Zone, ZoneEffects, ZoneError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneFactory {
    zones: BTreeMap<Geohash, Zone>,
    by_address: BTreeMap<Address, Geohash>,
}

impl ZoneFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address that receives zone creation transfers
    pub fn address() -> Address {
        Address::contract("factory", b"zones")
    }

    /// Create the zone described by a create payload. The geohash is checked
    /// against the registry before the stake is considered.
    pub fn create_zone(
        &mut self,
        caller: Address,
        stake: u128,
        request: CreateZone,
        now: u64,
        geo: &dyn GeoOracle,
        floor_price: u128,
    ) -> Result<(Address, ZoneEffects), FactoryError> {
        let CreateZone { country, geohash, tier } = request;
        if !geo.is_country_enabled(country) {
            return Err(FactoryError::CountryDisabled(country));
        }
        if !geo.zone_in_country(country, &geohash) {
            return Err(FactoryError::GeohashNotInCountry { country, geohash: geohash.to_string() });
        }
        if self.zones.contains_key(&geohash) {
            return Err(ZoneError::ZoneAlreadyExists(geohash.to_string()).into());
        }

        let (zone, effects) = Zone::create(geohash.clone(), country, tier, caller, stake, floor_price, now)?;
        let address = zone.address();
        self.by_address.insert(address, geohash.clone());
        self.zones.insert(geohash, zone);
        Ok((address, effects))
    }

    pub fn zone(&self, geohash: &Geohash) -> Option<&Zone> {
        self.zones.get(geohash)
    }

    pub fn zone_at(&self, address: &Address) -> Option<&Zone> {
        self.by_address.get(address).and_then(|g| self.zones.get(g))
    }

    pub fn zone_at_mut(&mut self, address: &Address) -> Result<&mut Zone, FactoryError> {
        let geohash = self.by_address.get(address).ok_or(FactoryError::UnknownZone(*address))?;
        self.zones.get_mut(geohash).ok_or(FactoryError::UnknownZone(*address))
    }

    pub fn is_zone(&self, address: &Address) -> bool {
        self.by_address.contains_key(address)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
