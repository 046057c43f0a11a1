//! Node configuration
//!
//! Loaded from a TOML file; every section and field is optional and falls
//! back to the protocol defaults. Amounts are written in whole DTH.
//!
//! ```toml
//! [node]
//! data_dir = "./dether-data"
//! rpc_port = 8645
//!
//! [protocol]
//! bid_period = 172800
//! zone_tax = 4
//!
//! [genesis]
//! admin_address = "DT..."
//!
//! [[genesis.countries]]
//! code = "CG"
//! prefixes = ["krcz"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BID_PERIOD, DEFAULT_COOLDOWN_PERIOD, DEFAULT_ENTRY_FEE, DEFAULT_FLOOR_STAKE_PRICE, DEFAULT_MIN_RAISE,
    DEFAULT_VOTING_DURATION, DEFAULT_ZONE_TAX, DTH, GENESIS_TIMESTAMP,
};
use crate::crypto::{Address, AddressError};
use crate::geo::{CountryCode, GeoError};
use crate::governance::VotingParams;
use crate::params::{GlobalParams, ParameterStore, ParamsError};
use crate::to_voting_pct;
use crate::wallet::KeyPair;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid protocol parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("{field} must be a percentage between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u32 },
    #[error("Voting duration must be greater than zero")]
    ZeroVotingDuration,
    #[error("Invalid address {0:?}: {1}")]
    Address(String, AddressError),
    #[error("Invalid country entry: {0}")]
    Country(#[from] GeoError),
    #[error("Invalid admin key")]
    AdminKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub protocol: ProtocolSection,
    pub voting: VotingSection,
    pub genesis: GenesisSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub data_dir: PathBuf,
    pub rpc_port: u16,
    /// Default `env_logger` filter, `RUST_LOG` wins
    pub log_level: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./dether-data"), rpc_port: 8645, log_level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    pub bid_period: u64,
    pub cooldown_period: u64,
    pub entry_fee: u32,
    pub zone_tax: u32,
    pub min_raise: u32,
    pub base_floor_price_dth: u64,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            bid_period: DEFAULT_BID_PERIOD,
            cooldown_period: DEFAULT_COOLDOWN_PERIOD,
            entry_fee: DEFAULT_ENTRY_FEE,
            zone_tax: DEFAULT_ZONE_TAX,
            min_raise: DEFAULT_MIN_RAISE,
            base_floor_price_dth: (DEFAULT_FLOOR_STAKE_PRICE / DTH) as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingSection {
    pub min_accept_quorum_pct: u32,
    pub support_required_pct: u32,
    pub min_proposal_balance_dth: u64,
    pub voting_duration: u64,
}

impl Default for VotingSection {
    fn default() -> Self {
        Self {
            min_accept_quorum_pct: 25,
            support_required_pct: 60,
            min_proposal_balance_dth: 1,
            voting_duration: DEFAULT_VOTING_DURATION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisSection {
    pub timestamp: u64,
    /// Hex private key of the setup admin; takes precedence over `admin_address`
    pub admin_key: Option<String>,
    pub admin_address: Option<String>,
    pub countries: Vec<CountryConfig>,
    pub mints: Vec<MintConfig>,
}

impl Default for GenesisSection {
    fn default() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            admin_key: None,
            admin_address: None,
            countries: Vec::new(),
            mints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryConfig {
    pub code: String,
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub free_claim: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintConfig {
    pub address: String,
    pub amount_dth: u64,
}

impl NodeConfig {
    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global_params().validate()?;
        for (field, value) in [
            ("min_accept_quorum_pct", self.voting.min_accept_quorum_pct),
            ("support_required_pct", self.voting.support_required_pct),
        ] {
            if value > 100 {
                return Err(ConfigError::PercentOutOfRange { field, value });
            }
        }
        if self.voting.voting_duration == 0 {
            return Err(ConfigError::ZeroVotingDuration);
        }
        if self.protocol.base_floor_price_dth == 0 {
            return Err(ParamsError::ZeroFloorPrice.into());
        }
        self.countries()?;
        self.mints()?;
        Ok(())
    }

    pub fn global_params(&self) -> GlobalParams {
        GlobalParams {
            bid_period: self.protocol.bid_period,
            cooldown_period: self.protocol.cooldown_period,
            entry_fee: self.protocol.entry_fee,
            zone_tax: self.protocol.zone_tax,
            min_raise: self.protocol.min_raise,
        }
    }

    pub fn parameter_store(&self) -> ParameterStore {
        ParameterStore::new(self.global_params(), u128::from(self.protocol.base_floor_price_dth) * DTH)
    }

    pub fn voting_params(&self) -> VotingParams {
        VotingParams {
            min_accept_quorum: to_voting_pct(self.voting.min_accept_quorum_pct),
            support_required: to_voting_pct(self.voting.support_required_pct),
            min_proposal_balance: u128::from(self.voting.min_proposal_balance_dth) * DTH,
            voting_duration: self.voting.voting_duration,
        }
    }

    /// Setup admin, if one is configured
    pub fn admin_address(&self) -> Result<Option<Address>, ConfigError> {
        if let Some(key) = &self.genesis.admin_key {
            let keypair = KeyPair::from_hex(key).map_err(|_| ConfigError::AdminKey)?;
            return Ok(Some(keypair.address));
        }
        self.genesis.admin_address.as_deref().map(parse_address).transpose()
    }

    /// Enabled countries as (code, prefixes, free claim)
    pub fn countries(&self) -> Result<Vec<(CountryCode, Vec<String>, bool)>, ConfigError> {
        self.genesis
            .countries
            .iter()
            .map(|c| -> Result<_, ConfigError> {
                Ok((c.code.parse::<CountryCode>()?, c.prefixes.clone(), c.free_claim))
            })
            .collect()
    }

    /// Initial balances in base units
    pub fn mints(&self) -> Result<Vec<(Address, u128)>, ConfigError> {
        self.genesis
            .mints
            .iter()
            .map(|m| -> Result<_, ConfigError> {
                Ok((parse_address(&m.address)?, u128::from(m.amount_dth) * DTH))
            })
            .collect()
    }
}

fn parse_address(raw: &str) -> Result<Address, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Address(raw.to_string(), e))
}
