use serde::{Deserialize, Serialize};

/// Treasury bookkeeping. The funds themselves sit in the token ledger under
/// the controller address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    /// Tax, entry fees and direct deposits
    pub total_collected: u128,
    pub total_withdrawn: u128,
    pub failed_withdrawals: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawOutcome {
    Sent,
    /// Not enough funds; nothing moved
    TransferFailed,
}

impl Treasury {
    pub(crate) fn record_collected(&mut self, amount: u128) {
        self.total_collected = self.total_collected.saturating_add(amount);
    }

    pub(crate) fn record_withdrawal(&mut self, outcome: WithdrawOutcome, amount: u128) {
        match outcome {
            WithdrawOutcome::Sent => self.total_withdrawn = self.total_withdrawn.saturating_add(amount),
            WithdrawOutcome::TransferFailed => self.failed_withdrawals += 1,
        }
    }
}
