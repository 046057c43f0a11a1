//! Protocol controller: sole writer of the parameter store and custodian of
//! the treasury
//!
//! Changes come either from the setup admin, until it renounces, or from an
//! executed proposal.

use serde::{Deserialize, Serialize};

use super::{GovernanceError, ProposalAction, ProposalExecutor, Treasury, WithdrawOutcome};
use crate::crypto::Address;
use crate::events::Event;
use crate::geo::CountryCode;
use crate::params::{GlobalParams, ParameterStore};
use crate::token::DthToken;

/// Who is asking for a controller change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Admin(Address),
    /// An executed proposal, by id
    Governance(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolController {
    admin: Option<Address>,
    params: ParameterStore,
    treasury: Treasury,
}

impl ProtocolController {
    pub fn new(admin: Address, params: ParameterStore) -> Self {
        Self { admin: Some(admin), params, treasury: Treasury::default() }
    }

    /// Address holding treasury funds
    pub fn address() -> Address {
        Address::contract("controller", b"treasury")
    }

    pub fn admin(&self) -> Option<Address> {
        self.admin
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn country_floor_price(&self, country: CountryCode) -> u128 {
        self.params.floor_price(country)
    }

    pub fn ensure_admin(&self, caller: &Address) -> Result<(), GovernanceError> {
        match self.admin {
            None => Err(GovernanceError::AdminRenounced),
            Some(admin) if admin == *caller => Ok(()),
            Some(_) => Err(GovernanceError::NotAdmin(*caller)),
        }
    }

    fn authorize(&self, authority: Authority) -> Result<(), GovernanceError> {
        match authority {
            Authority::Admin(caller) => self.ensure_admin(&caller),
            Authority::Governance(_) => Ok(()),
        }
    }

    /// Replace all five global parameters at once
    pub fn update_global_params(
        &mut self,
        authority: Authority,
        params: GlobalParams,
    ) -> Result<Event, GovernanceError> {
        self.authorize(authority)?;
        self.params.set_global(params)?;
        log::info!("global params updated ({:?}) to {:?}", authority, params);
        Ok(Event::GlobalParamsUpdated { params })
    }

    pub fn set_country_floor_price(
        &mut self,
        authority: Authority,
        country: CountryCode,
        price: u128,
    ) -> Result<Event, GovernanceError> {
        self.authorize(authority)?;
        self.params.set_floor_price(country, price)?;
        log::info!("floor price of {} set to {}", country, price);
        Ok(Event::CountryFloorPriceSet { country, price })
    }

    pub fn set_free_claim(
        &mut self,
        caller: Address,
        country: CountryCode,
        enabled: bool,
    ) -> Result<Event, GovernanceError> {
        self.ensure_admin(&caller)?;
        self.params.set_free_claim(country, enabled);
        Ok(Event::FreeClaimSet { country, enabled })
    }

    /// Move treasury funds. Insufficient funds is reported through the
    /// outcome and event, not as an error.
    pub fn withdraw_dth(
        &mut self,
        authority: Authority,
        token: &mut DthToken,
        recipient: Address,
        amount: u128,
        memo: String,
    ) -> Result<(WithdrawOutcome, Event), GovernanceError> {
        self.authorize(authority)?;

        let outcome = match token.transfer(Self::address(), recipient, amount) {
            Ok(()) => WithdrawOutcome::Sent,
            Err(err) => {
                log::warn!("treasury withdrawal of {} to {} failed: {}", amount, recipient, err);
                WithdrawOutcome::TransferFailed
            }
        };
        self.treasury.record_withdrawal(outcome, amount);

        let event = match outcome {
            WithdrawOutcome::Sent => Event::WithdrawDth { recipient, amount, memo },
            WithdrawOutcome::TransferFailed => Event::WithdrawDthTransferFailed { recipient, amount, memo },
        };
        Ok((outcome, event))
    }

    pub fn renounce_admin(&mut self, caller: Address) -> Result<Event, GovernanceError> {
        self.ensure_admin(&caller)?;
        self.admin = None;
        log::info!("admin {} renounced, governance only from now on", caller);
        Ok(Event::AdminRenounced { admin: caller })
    }

    /// Tax and entry fees forwarded by zones
    pub(crate) fn record_collected(&mut self, amount: u128) {
        self.treasury.record_collected(amount);
    }

    pub(crate) fn record_deposit(&mut self, from: Address, amount: u128) -> Event {
        self.treasury.record_collected(amount);
        Event::TreasuryDeposit { from, amount }
    }
}

/// Executor view over the controller and the ledger it pays out of
pub struct GovernanceContext<'a> {
    pub controller: &'a mut ProtocolController,
    pub token: &'a mut DthToken,
}

impl ProposalExecutor for GovernanceContext<'_> {
    fn execute_action(
        &mut self,
        proposal_id: u64,
        action: &ProposalAction,
    ) -> Result<Vec<Event>, GovernanceError> {
        let authority = Authority::Governance(proposal_id);
        let event = match action {
            ProposalAction::GlobalParams(params) => self.controller.update_global_params(authority, *params)?,
            ProposalAction::CountryFloorPrice { country, price } => {
                self.controller.set_country_floor_price(authority, *country, *price)?
            }
            ProposalAction::SendDth { recipient, amount } => {
                let memo = format!("proposal {}", proposal_id);
                let (_, event) = self.controller.withdraw_dth(authority, self.token, *recipient, *amount, memo)?;
                event
            }
        };
        Ok(vec![event])
    }
}
