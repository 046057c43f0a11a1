//! Protocol state
//!
//! Everything a transaction can touch: the DTH ledger, the wrapper, the geo
//! registry, the zones, the controller and the voting engine, plus per-sender
//! nonces. The whole value is cloned to apply a transaction and swapped in on
//! success, which is what makes every call all-or-nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::Address;
use crate::factory::ZoneFactory;
use crate::geo::GeoRegistry;
use crate::governance::{ProtocolController, VotingEngine, VotingParams};
use crate::params::ParameterStore;
use crate::token::{DthToken, DthWrapper};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolState {
    pub token: DthToken,
    pub wrapper: DthWrapper,
    pub geo: GeoRegistry,
    pub factory: ZoneFactory,
    pub controller: ProtocolController,
    pub voting: VotingEngine,
    nonces: BTreeMap<Address, u64>,
}

/// Summary numbers for `getinfo`
#[derive(Debug, Clone, Serialize)]
pub struct StateStats {
    pub zones: usize,
    pub proposals: u64,
    pub dth_supply: String,
    pub wrapped_supply: String,
    pub treasury_balance: String,
    pub params_version: u64,
}

impl ProtocolState {
    pub fn new(admin: Address, params: ParameterStore, voting: VotingParams) -> Self {
        Self {
            token: DthToken::new(),
            wrapper: DthWrapper::new(),
            geo: GeoRegistry::new(),
            factory: ZoneFactory::new(),
            controller: ProtocolController::new(admin, params),
            voting: VotingEngine::new(voting),
            nonces: BTreeMap::new(),
        }
    }

    /// Next nonce expected from `sender`
    pub fn nonce_of(&self, sender: &Address) -> u64 {
        self.nonces.get(sender).copied().unwrap_or(0)
    }

    pub(crate) fn bump_nonce(&mut self, sender: Address) {
        *self.nonces.entry(sender).or_insert(0) += 1;
    }

    pub fn treasury_balance(&self) -> u128 {
        self.token.balance_of(&ProtocolController::address())
    }

    pub fn get_stats(&self) -> StateStats {
        StateStats {
            zones: self.factory.len(),
            proposals: self.voting.proposal_count(),
            dth_supply: self.token.total_supply().to_string(),
            wrapped_supply: self.wrapper.total_supply().to_string(),
            treasury_balance: self.treasury_balance().to_string(),
            params_version: self.controller.params().version(),
        }
    }
}
