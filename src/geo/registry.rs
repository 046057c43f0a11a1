//! Country enablement and geohash membership registry
//!
//! The auction core only needs a yes/no answer to "does this zone geohash lie
//! in this enabled country", exposed through [`GeoOracle`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{CountryCode, GeoError, Geohash};
use crate::constants::COUNTRY_PREFIX_LEN;

/// Membership oracle consulted on zone creation
pub trait GeoOracle {
    fn is_country_enabled(&self, country: CountryCode) -> bool;
    fn zone_in_country(&self, country: CountryCode, geohash: &Geohash) -> bool;
}

/// In-process registry: per country, the set of geohash prefixes it covers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoRegistry {
    countries: BTreeMap<CountryCode, CountryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CountryEntry {
    enabled: bool,
    prefixes: BTreeSet<String>,
}

impl GeoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load prefixes for a country and mark it enabled
    pub fn enable_country(&mut self, country: CountryCode, prefixes: &[String]) -> Result<(), GeoError> {
        let mut parsed = BTreeSet::new();
        for prefix in prefixes {
            let cell = Geohash::parse(prefix.as_bytes(), COUNTRY_PREFIX_LEN)?;
            parsed.insert(cell.as_str().to_string());
        }

        let entry = self.countries.entry(country).or_default();
        entry.enabled = true;
        entry.prefixes.extend(parsed);
        log::info!("country {} enabled with {} prefixes", country, entry.prefixes.len());
        Ok(())
    }

    pub fn disable_country(&mut self, country: CountryCode) -> Result<(), GeoError> {
        let entry = self
            .countries
            .get_mut(&country)
            .ok_or(GeoError::UnknownCountry(country))?;
        entry.enabled = false;
        log::info!("country {} disabled", country);
        Ok(())
    }

    pub fn enabled_countries(&self) -> Vec<CountryCode> {
        self.countries
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(code, _)| *code)
            .collect()
    }
}

impl GeoOracle for GeoRegistry {
    fn is_country_enabled(&self, country: CountryCode) -> bool {
        self.countries.get(&country).map(|e| e.enabled).unwrap_or(false)
    }

    fn zone_in_country(&self, country: CountryCode, geohash: &Geohash) -> bool {
        match self.countries.get(&country) {
            Some(entry) if entry.enabled => entry.prefixes.contains(geohash.prefix(COUNTRY_PREFIX_LEN)),
            _ => false,
        }
    }
}
