//! Wrapped DTH with per-block balance checkpoints
//!
//! Voting power is read "as of block N", where a checkpoint for block N holds
//! the value at the end of that block.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TokenError;
use crate::crypto::Address;
use crate::governance::VotingPowerSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: u64,
    pub value: u128,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DthWrapper {
    balances: BTreeMap<Address, Vec<Checkpoint>>,
    supply: Vec<Checkpoint>,
}

impl DthWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address that custodies wrapped DTH
    pub fn address() -> Address {
        Address::contract("wrapper", b"dth")
    }

    pub fn wrap(&mut self, holder: Address, amount: u128, block: u64) -> Result<(), TokenError> {
        let balance = self.balance_of(&holder).checked_add(amount).ok_or(TokenError::Overflow)?;
        let supply = self.total_supply().checked_add(amount).ok_or(TokenError::Overflow)?;
        write_checkpoint(self.balances.entry(holder).or_default(), block, balance);
        write_checkpoint(&mut self.supply, block, supply);
        Ok(())
    }

    pub fn unwrap(&mut self, holder: Address, amount: u128, block: u64) -> Result<(), TokenError> {
        let have = self.balance_of(&holder);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        let supply = self.total_supply() - amount;
        write_checkpoint(self.balances.entry(holder).or_default(), block, have - amount);
        write_checkpoint(&mut self.supply, block, supply);
        Ok(())
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances
            .get(holder)
            .and_then(|history| history.last())
            .map(|c| c.value)
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.supply.last().map(|c| c.value).unwrap_or(0)
    }

    pub fn balance_of_at(&self, holder: &Address, block: u64) -> u128 {
        self.balances
            .get(holder)
            .map(|history| value_at(history, block))
            .unwrap_or(0)
    }

    pub fn total_supply_at(&self, block: u64) -> u128 {
        value_at(&self.supply, block)
    }
}

impl VotingPowerSource for DthWrapper {
    fn voting_power_at(&self, holder: &Address, block: u64) -> u128 {
        self.balance_of_at(holder, block)
    }

    fn total_voting_power_at(&self, block: u64) -> u128 {
        self.total_supply_at(block)
    }
}

fn write_checkpoint(history: &mut Vec<Checkpoint>, block: u64, value: u128) {
    match history.last_mut() {
        Some(last) if last.block == block => last.value = value,
        _ => history.push(Checkpoint { block, value }),
    }
}

fn value_at(history: &[Checkpoint], block: u64) -> u128 {
    // checkpoints are pushed in block order
    let idx = history.partition_point(|c| c.block <= block);
    if idx == 0 {
        0
    } else {
        history[idx - 1].value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u8) -> Address {
        Address([tag; 20])
    }

    #[test]
    fn test_snapshot_ignores_later_changes() {
        let mut wrapper = DthWrapper::new();
        wrapper.wrap(addr(1), 10, 3).unwrap();
        wrapper.wrap(addr(1), 5, 7).unwrap();

        assert_eq!(wrapper.balance_of_at(&addr(1), 2), 0);
        assert_eq!(wrapper.balance_of_at(&addr(1), 3), 10);
        assert_eq!(wrapper.balance_of_at(&addr(1), 6), 10);
        assert_eq!(wrapper.balance_of_at(&addr(1), 7), 15);
        assert_eq!(wrapper.total_supply_at(5), 10);
    }

    #[test]
    fn test_same_block_updates_collapse() {
        let mut wrapper = DthWrapper::new();
        wrapper.wrap(addr(1), 10, 4).unwrap();
        wrapper.unwrap(addr(1), 4, 4).unwrap();

        assert_eq!(wrapper.balance_of_at(&addr(1), 4), 6);
        assert_eq!(wrapper.balances[&addr(1)].len(), 1);
    }

    #[test]
    fn test_unwrap_more_than_held() {
        let mut wrapper = DthWrapper::new();
        wrapper.wrap(addr(1), 10, 1).unwrap();
        assert!(wrapper.unwrap(addr(1), 11, 2).is_err());
        assert_eq!(wrapper.total_supply(), 10);
    }
}
