//! Genesis state and block
//!
//! The genesis state is seeded from configuration: admin, parameters,
//! enabled countries and initial mints. The genesis header commits to that
//! state, so a node restarted with a different genesis section refuses to
//! load the stored chain.

use thiserror::Error;

use crate::chain::{Block, BlockHeader};
use crate::config::{ConfigError, NodeConfig};
use crate::constants::{CHAIN_NAME, PROTOCOL_VERSION};
use crate::crypto::{hash_tagged, Address, Hash};
use crate::geo::GeoError;
use crate::governance::GovernanceError;
use crate::storage::ProtocolState;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Geo error: {0}")]
    Geo(#[from] GeoError),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Protocol state before the first block
pub fn genesis_state(config: &NodeConfig, admin: Address) -> Result<ProtocolState, GenesisError> {
    let mut state = ProtocolState::new(admin, config.parameter_store(), config.voting_params());

    for (country, prefixes, free_claim) in config.countries()? {
        state.geo.enable_country(country, &prefixes)?;
        if free_claim {
            state.controller.set_free_claim(admin, country, true)?;
        }
    }
    for (to, amount) in config.mints()? {
        state.token.mint(to, amount)?;
    }
    Ok(state)
}

/// Block 0. Its merkle root is the digest of the seeded state.
pub fn create_genesis_block(state: &ProtocolState, timestamp: u64) -> Result<Block, GenesisError> {
    let header = BlockHeader {
        version: PROTOCOL_VERSION,
        number: 0,
        prev_hash: Hash::zero(),
        merkle_root: state_digest(state)?,
        timestamp,
    };
    Ok(Block::new(header, Vec::new(), Vec::new()))
}

fn state_digest(state: &ProtocolState) -> Result<Hash, GenesisError> {
    let bytes = bincode::serialize(state)?;
    Ok(hash_tagged("dether:genesis", &[CHAIN_NAME.as_bytes(), &bytes]))
}

/// Summary printed at startup
#[derive(Debug)]
pub struct GenesisInfo {
    pub hash: Hash,
    pub timestamp: u64,
    pub admin: Address,
    pub countries: usize,
    pub minted: u128,
}

impl GenesisInfo {
    pub fn new(block: &Block, state: &ProtocolState, admin: Address) -> Self {
        Self {
            hash: block.hash(),
            timestamp: block.header.timestamp,
            admin,
            countries: state.geo.enabled_countries().len(),
            minted: state.token.total_supply(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DTH;
    use crate::geo::{CountryCode, GeoOracle, Geohash};

    fn config() -> NodeConfig {
        let raw = format!(
            r#"
            [[genesis.countries]]
            code = "CG"
            prefixes = ["krcz"]
            free_claim = true

            [[genesis.mints]]
            address = "{}"
            amount_dth = 500
            "#,
            Address([9; 20])
        );
        NodeConfig::from_toml(&raw).unwrap()
    }

    #[test]
    fn test_genesis_state_is_seeded() {
        let admin = Address([1; 20]);
        let state = genesis_state(&config(), admin).unwrap();
        let cg: CountryCode = "CG".parse().unwrap();

        assert_eq!(state.controller.admin(), Some(admin));
        assert!(state.geo.zone_in_country(cg, &Geohash::parse(b"krczts", 6).unwrap()));
        assert!(state.controller.params().free_claim_enabled(cg));
        assert_eq!(state.token.balance_of(&Address([9; 20])), 500 * DTH);
    }

    #[test]
    fn test_genesis_hash_is_reproducible() {
        let admin = Address([1; 20]);
        let a = create_genesis_block(&genesis_state(&config(), admin).unwrap(), 100).unwrap();
        let b = create_genesis_block(&genesis_state(&config(), admin).unwrap(), 100).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert!(a.is_genesis());

        let other = create_genesis_block(&genesis_state(&config(), Address([2; 20])).unwrap(), 100).unwrap();
        assert_ne!(a.hash(), other.hash());
    }
}
