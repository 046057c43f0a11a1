use thiserror::Error;

use crate::crypto::Address;
use crate::params::ParamsError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("{0} is not the protocol admin")]
    NotAdmin(Address),
    #[error("Admin rights have been renounced")]
    AdminRenounced,
    #[error("Invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("Insufficient voting tokens: have {have}, need {need}")]
    InsufficientVotingTokens { have: u128, need: u128 },
    #[error("Proposer already has unresolved proposal {0}")]
    ProposerHasActiveProposal(u64),
    #[error("Open proposal {0} already has the same arguments")]
    DuplicateActiveProposal(u64),
    #[error("Unknown proposal kind {0}")]
    UnknownKind(u8),
    #[error("Invalid proposal arguments: {0}")]
    InvalidArgs(String),
    #[error("Invalid proposal parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("Proposal {0} not found")]
    ProposalNotFound(u64),
    #[error("Proposal {0} has ended")]
    ProposalEnded(u64),
    #[error("No voting power at the proposal snapshot")]
    NoVotingPower,
    #[error("Vote already cast on this side")]
    DuplicateVote,
    #[error("Proposal {0} has not ended yet")]
    ProposalNotYetEnded(u64),
    #[error("Proposal {0} is already resolved")]
    AlreadyExecuted(u64),
    #[error("Proposal action failed: {0}")]
    Action(#[from] GovernanceError),
}
