//! Call execution against the protocol state
//!
//! A transfer moves DTH first, then runs the hook of the receiving protocol
//! address with the attached data. Zone operations hand back the token
//! movements they need, which are applied here from the zone's custody
//! address. Callers apply a call to a scratch copy of the state, so any error
//! leaves the committed state untouched.

use thiserror::Error;

use crate::crypto::Address;
use crate::events::Event;
use crate::factory::{FactoryError, PayloadError, ZoneFactory, ZonePayload};
use crate::geo::GeoError;
use crate::governance::{
    Authority, ExecutionOutcome, GovernanceContext, GovernanceError, ProposalKind, ProtocolController,
    VotingError,
};
use crate::storage::ProtocolState;
use crate::token::{DthWrapper, TokenError};
use crate::validation::Call;
use crate::zone::{ZoneEffects, ZoneError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Geo error: {0}")]
    Geo(#[from] GeoError),
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),
    #[error("Zone error: {0}")]
    Zone(#[from] ZoneError),
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),
    #[error("Voting error: {0}")]
    Voting(#[from] VotingError),
}

/// Block context a call executes in
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub sender: Address,
    pub block: u64,
    pub now: u64,
}

impl ProtocolState {
    /// Apply `call` in place. On error the state may be partially modified and
    /// must be discarded.
    pub fn apply_call(&mut self, ctx: &CallContext, call: &Call) -> Result<Vec<Event>, ExecutionError> {
        let CallContext { sender, block, now } = *ctx;
        let params = *self.controller.params().global();

        match call {
            Call::Transfer { to, amount, data } => self.transfer_and_call(ctx, *to, *amount, data),

            Call::Unwrap { amount } => {
                self.wrapper.unwrap(sender, *amount, block)?;
                self.token.transfer(DthWrapper::address(), sender, *amount)?;
                Ok(vec![Event::Unwrapped { holder: sender, amount: *amount }])
            }

            Call::WithdrawFromAuction { zone, auction_id } => {
                let effects = self.factory.zone_at_mut(zone)?.withdraw_from_auction(*auction_id, sender, now)?;
                self.apply_effects(*zone, effects)
            }
            Call::Release { zone } => {
                let effects = self.factory.zone_at_mut(zone)?.release(sender, now, &params)?;
                self.apply_effects(*zone, effects)
            }
            Call::ProcessState { zone } => {
                let effects = self.factory.zone_at_mut(zone)?.process_state(now, &params);
                self.apply_effects(*zone, effects)
            }
            Call::AddTeller { zone, teller } => {
                let effects = self.factory.zone_at_mut(zone)?.add_teller(sender, teller.clone(), now)?;
                self.apply_effects(*zone, effects)
            }
            Call::RemoveTeller { zone } => {
                let effects = self.factory.zone_at_mut(zone)?.remove_teller(sender, now)?;
                self.apply_effects(*zone, effects)
            }

            Call::CreateProposal { kind, args } => {
                let kind = ProposalKind::try_from(*kind)?;
                let proposal = self.voting.create_proposal(sender, kind, args, now, block, &self.wrapper)?;
                Ok(vec![Event::ProposalCreated {
                    id: proposal.id,
                    proposer: sender,
                    kind,
                    snapshot_block: proposal.snapshot_block,
                }])
            }
            Call::PlaceVote { id, support } => {
                let record = self.voting.place_vote(*id, *support, sender, now, &self.wrapper)?;
                Ok(vec![Event::VoteCast { id: *id, voter: sender, support: *support, weight: record.weight }])
            }
            Call::ExecuteProposal { id } => {
                let mut executor = GovernanceContext { controller: &mut self.controller, token: &mut self.token };
                match self.voting.execute(*id, now, &mut executor)? {
                    ExecutionOutcome::Executed { events } => {
                        let mut out = vec![Event::ProposalExecuted { id: *id }];
                        out.extend(events);
                        Ok(out)
                    }
                    ExecutionOutcome::Failed { reason } => Ok(vec![Event::ProposalFailed { id: *id, reason }]),
                }
            }

            Call::Mint { to, amount } => {
                self.controller.ensure_admin(&sender)?;
                self.token.mint(*to, *amount)?;
                Ok(vec![Event::Minted { to: *to, amount: *amount }])
            }
            Call::EnableCountry { country, prefixes } => {
                self.controller.ensure_admin(&sender)?;
                self.geo.enable_country(*country, prefixes)?;
                Ok(vec![Event::CountryEnabled { country: *country, prefixes: prefixes.len() }])
            }
            Call::DisableCountry { country } => {
                self.controller.ensure_admin(&sender)?;
                self.geo.disable_country(*country)?;
                Ok(vec![Event::CountryDisabled { country: *country }])
            }
            Call::UpdateGlobalParams { params } => {
                Ok(vec![self.controller.update_global_params(Authority::Admin(sender), *params)?])
            }
            Call::SetCountryFloorPrice { country, price } => {
                Ok(vec![self.controller.set_country_floor_price(Authority::Admin(sender), *country, *price)?])
            }
            Call::SetFreeClaim { country, enabled } => {
                Ok(vec![self.controller.set_free_claim(sender, *country, *enabled)?])
            }
            Call::WithdrawDth { recipient, amount, memo } => {
                let (_, event) = self.controller.withdraw_dth(
                    Authority::Admin(sender),
                    &mut self.token,
                    *recipient,
                    *amount,
                    memo.clone(),
                )?;
                Ok(vec![event])
            }
            Call::RenounceAdmin => Ok(vec![self.controller.renounce_admin(sender)?]),
        }
    }

    fn transfer_and_call(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: u128,
        data: &[u8],
    ) -> Result<Vec<Event>, ExecutionError> {
        let CallContext { sender, block, now } = *ctx;
        self.token.transfer(sender, to, amount)?;
        let mut events = vec![Event::Transfer { from: sender, to, amount }];

        if to == ZoneFactory::address() {
            let request = match ZonePayload::decode(data)? {
                ZonePayload::Create(request) => request,
                _ => return Err(PayloadError::WrongTarget(to).into()),
            };
            let floor = self.controller.country_floor_price(request.country);
            let (zone, effects) = self.factory.create_zone(sender, amount, request, now, &self.geo, floor)?;
            self.token.transfer(to, zone, amount)?;
            events.extend(self.apply_effects(zone, effects)?);
        } else if let Some(country) = self.factory.zone_at(&to).map(|z| z.country()) {
            let params = *self.controller.params().global();
            let floor = self.controller.country_floor_price(country);
            let free_claim = self.controller.params().free_claim_enabled(country);

            let zone = self.factory.zone_at_mut(&to)?;
            let effects = match ZonePayload::decode(data)? {
                ZonePayload::ClaimFree => zone.claim_free(sender, amount, now, floor, free_claim)?,
                ZonePayload::Bid => zone.place_bid(sender, amount, now, &params, floor)?,
                ZonePayload::TopUp => zone.top_up(sender, amount, now, &params)?,
                ZonePayload::Create(_) => return Err(PayloadError::WrongTarget(to).into()),
            };
            events.extend(self.apply_effects(to, effects)?);
        } else if to == DthWrapper::address() {
            ensure_no_data(to, data)?;
            self.wrapper.wrap(sender, amount, block)?;
            events.push(Event::Wrapped { holder: sender, amount });
        } else if to == ProtocolController::address() {
            ensure_no_data(to, data)?;
            events.push(self.controller.record_deposit(sender, amount));
        } else {
            ensure_no_data(to, data)?;
        }
        Ok(events)
    }

    /// Pay out what a zone operation released from the zone's custody
    fn apply_effects(&mut self, zone: Address, effects: ZoneEffects) -> Result<Vec<Event>, ExecutionError> {
        if effects.to_treasury > 0 {
            self.token.transfer(zone, ProtocolController::address(), effects.to_treasury)?;
            self.controller.record_collected(effects.to_treasury);
        }
        for (recipient, amount) in &effects.payouts {
            self.token.transfer(zone, *recipient, *amount)?;
        }
        Ok(effects.events)
    }
}

fn ensure_no_data(to: Address, data: &[u8]) -> Result<(), PayloadError> {
    if data.is_empty() {
        Ok(())
    } else {
        Err(PayloadError::WrongTarget(to))
    }
}
