//! Token-weighted proposal voting
//!
//! Voting power is the wrapped DTH balance at the block before the proposal
//! was created. A proposal passes when both
//!
//! - support: `yea / (yea + nay) >= support_required`
//! - quorum: `yea / voting_power >= min_accept_quorum`
//!
//! hold. A proposal that misses either threshold resolves to `Failed`; that is
//! an outcome, not an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Proposal, ProposalAction, ProposalKind, ProposalState, VoteChoice, VotingError};
use crate::constants::{
    DEFAULT_MIN_ACCEPT_QUORUM, DEFAULT_MIN_PROPOSAL_BALANCE, DEFAULT_SUPPORT_REQUIRED,
    DEFAULT_VOTING_DURATION, PCT_BASE,
};
use crate::crypto::{Address, Hash};
use crate::events::Event;
use crate::governance::GovernanceError;

/// Source of snapshot voting power
pub trait VotingPowerSource {
    fn voting_power_at(&self, holder: &Address, block: u64) -> u128;
    fn total_voting_power_at(&self, block: u64) -> u128;
}

/// Applies the action of a passed proposal
pub trait ProposalExecutor {
    fn execute_action(
        &mut self,
        proposal_id: u64,
        action: &ProposalAction,
    ) -> Result<Vec<Event>, GovernanceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingParams {
    /// Fixed point, PCT_BASE = 100%
    pub min_accept_quorum: u128,
    pub support_required: u128,
    pub min_proposal_balance: u128,
    /// Seconds
    pub voting_duration: u64,
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            min_accept_quorum: DEFAULT_MIN_ACCEPT_QUORUM,
            support_required: DEFAULT_SUPPORT_REQUIRED,
            min_proposal_balance: DEFAULT_MIN_PROPOSAL_BALANCE,
            voting_duration: DEFAULT_VOTING_DURATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub choice: VoteChoice,
    pub weight: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Support,
    Quorum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Executed { events: Vec<Event> },
    Failed { reason: FailureReason },
}

/// Full 256-bit product as (high, low)
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let low = (ll & MASK) | ((mid & MASK) << 64);
    let high = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (high, low)
}

/// `part / whole >= pct / PCT_BASE` without overflow
pub fn pct_reached(part: u128, whole: u128, pct: u128) -> bool {
    mul_wide(part, PCT_BASE) >= mul_wide(pct, whole)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VotingEngine {
    params: VotingParams,
    proposals: Vec<Proposal>,
    votes: BTreeMap<(u64, Address), VoteRecord>,
    unresolved_by_proposer: BTreeMap<Address, u64>,
    by_args: BTreeMap<Hash, u64>,
}

impl VotingEngine {
    pub fn new(params: VotingParams) -> Self {
        Self { params, ..Self::default() }
    }

    pub fn params(&self) -> &VotingParams {
        &self.params
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.proposals.get(idx)
    }

    fn proposal_mut(&mut self, id: u64) -> Result<&mut Proposal, VotingError> {
        let idx = usize::try_from(id)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .ok_or(VotingError::ProposalNotFound(id))?;
        self.proposals.get_mut(idx).ok_or(VotingError::ProposalNotFound(id))
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn vote_of(&self, id: u64, voter: &Address) -> Option<VoteRecord> {
        self.votes.get(&(id, *voter)).copied()
    }

    /// Open a proposal. `block` is the number of the block being applied;
    /// the snapshot is taken one block earlier.
    pub fn create_proposal(
        &mut self,
        caller: Address,
        kind: ProposalKind,
        args: &[u8],
        now: u64,
        block: u64,
        power: &dyn VotingPowerSource,
    ) -> Result<&Proposal, VotingError> {
        let snapshot_block = block.saturating_sub(1);
        let have = power.voting_power_at(&caller, snapshot_block);
        if have < self.params.min_proposal_balance {
            return Err(VotingError::InsufficientVotingTokens { have, need: self.params.min_proposal_balance });
        }
        // ended but never executed still counts
        if let Some(id) = self.unresolved_by_proposer.get(&caller) {
            return Err(VotingError::ProposerHasActiveProposal(*id));
        }

        let action = ProposalAction::decode(kind, args)?;
        let args_hash = action.args_hash();
        if let Some(id) = self.by_args.get(&args_hash) {
            if self.proposal(*id).map(|p| p.is_open(now)).unwrap_or(false) {
                return Err(VotingError::DuplicateActiveProposal(*id));
            }
        }

        let id = self.proposal_count() + 1;
        self.proposals.push(Proposal {
            id,
            action,
            args_hash,
            proposer: caller,
            start_date: now,
            end_date: now.saturating_add(self.params.voting_duration),
            snapshot_block,
            min_accept_quorum: self.params.min_accept_quorum,
            support_required: self.params.support_required,
            voting_power: power.total_voting_power_at(snapshot_block),
            yea: 0,
            nay: 0,
            state: ProposalState::Open,
        });
        self.unresolved_by_proposer.insert(caller, id);
        self.by_args.insert(args_hash, id);
        log::info!("proposal {} ({}) created by {}", id, kind, caller);

        self.proposal(id).ok_or(VotingError::ProposalNotFound(id))
    }

    /// Vote, or move an existing vote to the other side
    pub fn place_vote(
        &mut self,
        id: u64,
        support: bool,
        caller: Address,
        now: u64,
        power: &dyn VotingPowerSource,
    ) -> Result<VoteRecord, VotingError> {
        let previous = self.vote_of(id, &caller);
        let proposal = self.proposal_mut(id)?;
        if !proposal.is_open(now) {
            return Err(VotingError::ProposalEnded(id));
        }

        let weight = power.voting_power_at(&caller, proposal.snapshot_block);
        if weight == 0 {
            return Err(VotingError::NoVotingPower);
        }
        let choice = if support { VoteChoice::Yea } else { VoteChoice::Nay };

        match previous {
            Some(record) if record.choice == choice => return Err(VotingError::DuplicateVote),
            Some(record) => match record.choice {
                VoteChoice::Yea => proposal.yea -= record.weight,
                VoteChoice::Nay => proposal.nay -= record.weight,
            },
            None => {}
        }
        match choice {
            VoteChoice::Yea => proposal.yea += weight,
            VoteChoice::Nay => proposal.nay += weight,
        }

        let record = VoteRecord { choice, weight };
        self.votes.insert((id, caller), record);
        log::debug!("vote on proposal {} by {}: {:?} x {}", id, caller, choice, weight);
        Ok(record)
    }

    /// Resolve an ended proposal. Anyone may call this.
    pub fn execute(
        &mut self,
        id: u64,
        now: u64,
        executor: &mut dyn ProposalExecutor,
    ) -> Result<ExecutionOutcome, VotingError> {
        let proposal = self.proposal(id).ok_or(VotingError::ProposalNotFound(id))?;
        if proposal.state != ProposalState::Open {
            return Err(VotingError::AlreadyExecuted(id));
        }
        if now < proposal.end_date {
            return Err(VotingError::ProposalNotYetEnded(id));
        }

        let cast = proposal.yea + proposal.nay;
        let supported = cast > 0 && pct_reached(proposal.yea, cast, proposal.support_required);
        let quorate = pct_reached(proposal.yea, proposal.voting_power, proposal.min_accept_quorum);

        let outcome = if !supported {
            ExecutionOutcome::Failed { reason: FailureReason::Support }
        } else if !quorate {
            ExecutionOutcome::Failed { reason: FailureReason::Quorum }
        } else {
            let events = executor.execute_action(id, &proposal.action)?;
            ExecutionOutcome::Executed { events }
        };

        let proposal = self.proposal_mut(id)?;
        proposal.state = match outcome {
            ExecutionOutcome::Executed { .. } => ProposalState::Executed,
            ExecutionOutcome::Failed { .. } => ProposalState::Failed,
        };
        let (proposer, args_hash) = (proposal.proposer, proposal.args_hash);

        if self.unresolved_by_proposer.get(&proposer) == Some(&id) {
            self.unresolved_by_proposer.remove(&proposer);
        }
        if self.by_args.get(&args_hash) == Some(&id) {
            self.by_args.remove(&args_hash);
        }
        match &outcome {
            ExecutionOutcome::Executed { .. } => log::info!("proposal {} executed", id),
            ExecutionOutcome::Failed { reason } => log::info!("proposal {} failed: {:?}", id, reason),
        }
        Ok(outcome)
    }
}
