//! Harberger tax accrual and forced release

use super::{Zone, ZoneEffects};
use crate::constants::TAX_PERIOD;
use crate::events::Event;
use crate::params::GlobalParams;

/// Tax owed on `staked` over `elapsed` seconds at `zone_tax` percent per period
pub fn compute_tax(staked: u128, zone_tax: u32, elapsed: u64) -> u128 {
    staked
        .saturating_mul(u128::from(zone_tax))
        .saturating_mul(u128::from(elapsed))
        / (100 * u128::from(TAX_PERIOD))
}

impl Zone {
    /// Tax accrued since the last settlement, zero while an auction runs
    pub fn pending_tax(&self, now: u64, params: &GlobalParams) -> u128 {
        match &self.owner {
            Some(owner) if self.active_auction(now).is_none() && now > owner.last_tax_time => {
                compute_tax(owner.staked, params.zone_tax, now - owner.last_tax_time)
            }
            _ => 0,
        }
    }

    /// Charge accrued tax against the balance, then the stake. Exhausting the
    /// stake releases the zone. The checkpoint moves to `now` even when
    /// nothing is due.
    pub(super) fn settle_tax(&mut self, now: u64, params: &GlobalParams, effects: &mut ZoneEffects) {
        if self.active_auction(now).is_some() {
            return;
        }
        let zone = self.address();
        let Some(owner) = self.owner.as_mut() else {
            return;
        };
        if now <= owner.last_tax_time {
            return;
        }
        let tax = compute_tax(owner.staked, params.zone_tax, now - owner.last_tax_time);
        owner.last_tax_time = now;
        if tax == 0 {
            return;
        }

        let from_balance = tax.min(owner.balance);
        owner.balance -= from_balance;
        let remaining = tax - from_balance;

        if remaining < owner.staked {
            owner.staked -= remaining;
            effects.collect(tax);
            effects.events.push(Event::TaxCollected { zone, owner: owner.address, amount: tax });
            return;
        }

        let collected = from_balance + owner.staked;
        let address = owner.address;
        effects.collect(collected);
        effects.events.push(Event::TaxCollected { zone, owner: address, amount: collected });
        effects.events.push(Event::ZoneForceReleased { zone, owner: address });
        self.owner = None;
        self.teller = None;
        log::info!("zone {} force released, {} could not pay its tax", self.geohash(), address);
    }

    /// Settle whatever time has made due: a finished auction, then tax
    pub fn process_state(&mut self, now: u64, params: &GlobalParams) -> ZoneEffects {
        let mut effects = ZoneEffects::default();
        self.resolve_auction(now, &mut effects);
        self.settle_tax(now, params, &mut effects);
        effects
    }
}
