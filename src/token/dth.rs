//! DTH token ledger
//!
//! Plain balances and supply. Payload dispatch on transfer lives in the state
//! coordinator, which debits and credits here before calling the target.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TokenError;
use crate::crypto::Address;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DthToken {
    balances: BTreeMap<Address, u128>,
    total_supply: u128,
}

impl DthToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = self.balance_of(&to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let have = self.balance_of(&from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        if amount == 0 || from == to {
            return Ok(());
        }

        self.set_balance(from, have - amount);
        let credited = self.balance_of(&to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.set_balance(to, credited);
        Ok(())
    }

    fn set_balance(&mut self, owner: Address, value: u128) {
        if value == 0 {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, value);
        }
    }

    /// Number of addresses holding a non-zero balance
    pub fn holders(&self) -> usize {
        self.balances.len()
    }
}
