//! Proposals and their positional argument encoding
//!
//! Arguments are a sequence of 32-byte words. Integers are big-endian and
//! right-aligned, addresses right-aligned, country codes left-aligned:
//!
//! - `GlobalParams`: bid_period, cooldown_period, entry_fee, zone_tax, min_raise
//! - `CountryFloorPrice`: country, price
//! - `SendDth`: recipient, amount

use serde::{Deserialize, Serialize};
use std::fmt;

use super::VotingError;
use crate::crypto::{hash_tagged, Address, Hash};
use crate::geo::CountryCode;
use crate::params::{GlobalParams, ParamsError};

const WORD: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalKind {
    GlobalParams = 0,
    CountryFloorPrice = 1,
    SendDth = 2,
}

impl TryFrom<u8> for ProposalKind {
    type Error = VotingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProposalKind::GlobalParams),
            1 => Ok(ProposalKind::CountryFloorPrice),
            2 => Ok(ProposalKind::SendDth),
            other => Err(VotingError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalKind::GlobalParams => "GlobalParams",
            ProposalKind::CountryFloorPrice => "CountryFloorPrice",
            ProposalKind::SendDth => "SendDth",
        };
        f.write_str(name)
    }
}

/// Decoded proposal action, dispatched to the controller on execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    GlobalParams(GlobalParams),
    CountryFloorPrice { country: CountryCode, price: u128 },
    SendDth { recipient: Address, amount: u128 },
}

impl ProposalAction {
    pub fn kind(&self) -> ProposalKind {
        match self {
            ProposalAction::GlobalParams(_) => ProposalKind::GlobalParams,
            ProposalAction::CountryFloorPrice { .. } => ProposalKind::CountryFloorPrice,
            ProposalAction::SendDth { .. } => ProposalKind::SendDth,
        }
    }

    pub fn encode_args(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            ProposalAction::GlobalParams(p) => {
                for value in [
                    u128::from(p.bid_period),
                    u128::from(p.cooldown_period),
                    u128::from(p.entry_fee),
                    u128::from(p.zone_tax),
                    u128::from(p.min_raise),
                ] {
                    out.extend_from_slice(&uint_word(value));
                }
            }
            ProposalAction::CountryFloorPrice { country, price } => {
                let mut word = [0u8; WORD];
                word[..2].copy_from_slice(&country.as_bytes());
                out.extend_from_slice(&word);
                out.extend_from_slice(&uint_word(*price));
            }
            ProposalAction::SendDth { recipient, amount } => {
                let mut word = [0u8; WORD];
                word[WORD - 20..].copy_from_slice(&recipient.0);
                out.extend_from_slice(&word);
                out.extend_from_slice(&uint_word(*amount));
            }
        }
        out
    }

    /// Decode and validate the arguments of a `kind` proposal
    pub fn decode(kind: ProposalKind, args: &[u8]) -> Result<Self, VotingError> {
        let words = split_words(args, expected_words(kind))?;
        let action = match kind {
            ProposalKind::GlobalParams => ProposalAction::GlobalParams(GlobalParams {
                bid_period: word_to_int(words[0], "bid_period")?,
                cooldown_period: word_to_int(words[1], "cooldown_period")?,
                entry_fee: word_to_int(words[2], "entry_fee")?,
                zone_tax: word_to_int(words[3], "zone_tax")?,
                min_raise: word_to_int(words[4], "min_raise")?,
            }),
            ProposalKind::CountryFloorPrice => {
                let word = words[0];
                if word[2..].iter().any(|b| *b != 0) {
                    return Err(VotingError::InvalidArgs("country word has trailing bytes".into()));
                }
                let country = CountryCode::from_bytes([word[0], word[1]])
                    .map_err(|e| VotingError::InvalidArgs(e.to_string()))?;
                ProposalAction::CountryFloorPrice { country, price: word_to_int(words[1], "price")? }
            }
            ProposalKind::SendDth => {
                let word = words[0];
                if word[..WORD - 20].iter().any(|b| *b != 0) {
                    return Err(VotingError::InvalidArgs("recipient word is not an address".into()));
                }
                let mut recipient = [0u8; 20];
                recipient.copy_from_slice(&word[WORD - 20..]);
                ProposalAction::SendDth {
                    recipient: Address(recipient),
                    amount: word_to_int(words[1], "amount")?,
                }
            }
        };
        action.validate()?;
        Ok(action)
    }

    pub fn validate(&self) -> Result<(), VotingError> {
        match self {
            ProposalAction::GlobalParams(params) => params.validate()?,
            ProposalAction::CountryFloorPrice { price, .. } if *price == 0 => {
                return Err(ParamsError::ZeroFloorPrice.into())
            }
            ProposalAction::SendDth { recipient, .. } if recipient.is_zero() => {
                return Err(VotingError::InvalidArgs("recipient is the zero address".into()))
            }
            _ => {}
        }
        Ok(())
    }

    /// Identity of (kind, args), used to reject duplicate open proposals
    pub fn args_hash(&self) -> Hash {
        hash_tagged("dether:proposal", &[&[self.kind() as u8], &self.encode_args()])
    }
}

fn expected_words(kind: ProposalKind) -> usize {
    match kind {
        ProposalKind::GlobalParams => 5,
        ProposalKind::CountryFloorPrice | ProposalKind::SendDth => 2,
    }
}

fn split_words(args: &[u8], count: usize) -> Result<Vec<&[u8]>, VotingError> {
    if args.len() != count * WORD {
        return Err(VotingError::InvalidArgs(format!(
            "expected {} bytes, got {}",
            count * WORD,
            args.len()
        )));
    }
    Ok(args.chunks(WORD).collect())
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_to_int<T: TryFrom<u128>>(word: &[u8], field: &str) -> Result<T, VotingError> {
    if word[..WORD - 16].iter().any(|b| *b != 0) {
        return Err(VotingError::InvalidArgs(format!("{} overflows", field)));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[WORD - 16..]);
    T::try_from(u128::from_be_bytes(low))
        .map_err(|_| VotingError::InvalidArgs(format!("{} out of range", field)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Open,
    Executed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Yea,
    Nay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub action: ProposalAction,
    pub args_hash: Hash,
    pub proposer: Address,
    pub start_date: u64,
    pub end_date: u64,
    /// Voting power is read at this block
    pub snapshot_block: u64,
    pub min_accept_quorum: u128,
    pub support_required: u128,
    /// Total wrapped supply at the snapshot
    pub voting_power: u128,
    pub yea: u128,
    pub nay: u128,
    pub state: ProposalState,
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.action.kind()
    }

    /// Accepting votes: unresolved and inside the voting window
    pub fn is_open(&self, now: u64) -> bool {
        self.state == ProposalState::Open && now < self.end_date
    }
}
