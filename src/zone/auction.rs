//! Bid / cooldown auction cycle
//!
//! An auction opened at T accepts bids while `now < T + bid_period` and is
//! settled lazily by the first zone interaction at or after its end.

use serde::{Deserialize, Serialize};

use super::{Zone, ZoneEffects, ZoneError, ZoneOwner};
use crate::crypto::Address;
use crate::events::Event;
use crate::params::GlobalParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionState {
    Started,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: u64,
    /// Stored state; see [`Auction::state_at`] for the effective one
    pub state: AuctionState,
    pub start_time: u64,
    /// Fixed when the auction opens
    pub end_time: u64,
    pub highest_bidder: Address,
    pub highest_bid: u128,
}

impl Auction {
    pub fn state_at(&self, now: u64) -> AuctionState {
        if self.state == AuctionState::Started && now < self.end_time {
            AuctionState::Started
        } else {
            AuctionState::Ended
        }
    }
}

/// Smallest bid that beats `current` by at least `min_raise` percent
pub fn min_bid_over(current: u128, min_raise: u32) -> u128 {
    let scaled = current.saturating_mul(100 + u128::from(min_raise));
    let required = scaled / 100 + u128::from(scaled % 100 != 0);
    required.max(current.saturating_add(1))
}

fn entry_fee(amount: u128, params: &GlobalParams) -> Result<u128, ZoneError> {
    amount
        .checked_mul(u128::from(params.entry_fee))
        .map(|v| v / 100)
        .ok_or(ZoneError::Overflow)
}

impl Zone {
    /// Place a bid: opens an auction when none is running, raises otherwise.
    /// An unowned zone, including one whose stake the settled tax has just
    /// used up, goes to the bidder if the bid reaches `floor_price`.
    pub fn place_bid(
        &mut self,
        bidder: Address,
        amount: u128,
        now: u64,
        params: &GlobalParams,
        floor_price: u128,
    ) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);
            if let Some(id) = zone.active_auction(now).map(|a| a.id) {
                zone.raise_bid(id, bidder, amount, params, &mut effects)?;
                return Ok(effects);
            }

            // tax is settled up to the opening and paused while bidding runs
            zone.settle_tax(now, params, &mut effects);
            if zone.owner.is_some() {
                zone.open_auction(bidder, amount, now, params, &mut effects)?;
            } else if amount < floor_price {
                return Err(ZoneError::InsufficientStake { stake: amount, floor: floor_price });
            } else {
                zone.take_ownership(bidder, amount, now, &mut effects);
            }
            Ok(effects)
        })
    }

    fn open_auction(
        &mut self,
        bidder: Address,
        amount: u128,
        now: u64,
        params: &GlobalParams,
        effects: &mut ZoneEffects,
    ) -> Result<(), ZoneError> {
        let owner = self.owner.as_ref().ok_or(ZoneError::ZoneHasNoOwner)?;
        let (owner_address, staked) = (owner.address, owner.staked);

        let base = self.cooldown_base();
        let cooldown_ends_at = base.saturating_add(params.cooldown_period);
        if now < cooldown_ends_at {
            let after_auction = self.auctions.last().map(|a| a.end_time) == Some(base);
            return Err(if after_auction {
                ZoneError::AuctionClosed { cooldown_ends_at }
            } else {
                ZoneError::CooldownNotElapsed { ends_at: cooldown_ends_at }
            });
        }
        if bidder == owner_address {
            return Err(ZoneError::OwnerCannotStartAuction);
        }

        let fee = entry_fee(amount, params)?;
        let bid = amount - fee;
        let required = min_bid_over(staked, params.min_raise);
        if bid < required {
            return Err(ZoneError::RaiseTooSmall { bid, required });
        }

        let id = self.auctions.len() as u64 + 1;
        let end_time = now.saturating_add(params.bid_period);
        self.auctions.push(Auction {
            id,
            state: AuctionState::Started,
            start_time: now,
            end_time,
            highest_bidder: bidder,
            highest_bid: bid,
        });
        // the owner defends with their current stake
        self.bids.insert((id, owner_address), staked);
        self.bids.insert((id, bidder), bid);
        if let Some(owner) = self.owner.as_mut() {
            owner.auction_id = id;
        }

        effects.collect(fee);
        if fee > 0 {
            effects.events.push(Event::EntryFeePaid { zone: self.address(), bidder, amount: fee });
        }
        effects.events.push(Event::AuctionStarted {
            zone: self.address(),
            auction_id: id,
            bidder,
            amount: bid,
            end_time,
        });
        log::info!("auction {} opened on zone {} by {} with {}", id, self.geohash(), bidder, bid);
        Ok(())
    }

    fn raise_bid(
        &mut self,
        id: u64,
        bidder: Address,
        amount: u128,
        params: &GlobalParams,
        effects: &mut ZoneEffects,
    ) -> Result<(), ZoneError> {
        let highest = match self.auction(id) {
            Some(auction) if auction.highest_bidder == bidder => {
                return Err(ZoneError::AlreadyHighestBidder)
            }
            Some(auction) => auction.highest_bid,
            None => return Err(ZoneError::AuctionNotFound(id)),
        };

        let is_owner = self.owner.as_ref().map(|o| o.address) == Some(bidder);
        let fee = if is_owner { 0 } else { entry_fee(amount, params)? };
        let total = self
            .bid_of(id, &bidder)
            .checked_add(amount - fee)
            .ok_or(ZoneError::Overflow)?;
        let required = min_bid_over(highest, params.min_raise);
        if total < required {
            return Err(ZoneError::RaiseTooSmall { bid: total, required });
        }

        self.bids.insert((id, bidder), total);
        if let Some(auction) = self.auctions.last_mut() {
            auction.highest_bidder = bidder;
            auction.highest_bid = total;
        }

        effects.collect(fee);
        if fee > 0 {
            effects.events.push(Event::EntryFeePaid { zone: self.address(), bidder, amount: fee });
        }
        effects.events.push(Event::BidPlaced { zone: self.address(), auction_id: id, bidder, amount: total });
        log::debug!("bid of {} by {} on zone {}", total, bidder, self.geohash());
        Ok(())
    }

    /// Settle the last auction if its bid period is over
    pub(super) fn resolve_auction(&mut self, now: u64, effects: &mut ZoneEffects) {
        let (id, winner, amount, end_time) = match self.auctions.last_mut() {
            Some(auction) if auction.state == AuctionState::Started && now >= auction.end_time => {
                auction.state = AuctionState::Ended;
                (auction.id, auction.highest_bidder, auction.highest_bid, auction.end_time)
            }
            _ => return,
        };
        let zone = self.address();
        effects.events.push(Event::AuctionEnded { zone, auction_id: id, winner, amount });

        let Some(previous) = self.owner.take() else {
            return;
        };
        let stake = self.bids.remove(&(id, winner)).unwrap_or(amount);

        if previous.address == winner {
            self.owner = Some(ZoneOwner { staked: stake, last_tax_time: end_time, ..previous });
        } else {
            // the old stake stays escrowed as a losing bid, prepaid tax goes back
            effects.pay(previous.address, previous.balance);
            self.owner = Some(ZoneOwner {
                address: winner,
                start_time: end_time,
                staked: stake,
                balance: 0,
                last_tax_time: end_time,
                auction_id: id,
            });
            self.teller = None;
            log::info!("zone {} changed owner from {} to {}", self.geohash(), previous.address, winner);
        }
    }

    /// Return a losing bidder's escrow once the auction has ended
    pub fn withdraw_from_auction(
        &mut self,
        auction_id: u64,
        caller: Address,
        now: u64,
    ) -> Result<ZoneEffects, ZoneError> {
        self.transact(|zone| {
            let mut effects = ZoneEffects::default();
            zone.resolve_auction(now, &mut effects);

            let auction = zone.auction(auction_id).ok_or(ZoneError::AuctionNotFound(auction_id))?;
            if auction.state_at(now) == AuctionState::Started {
                return Err(ZoneError::AuctionStillOpen(auction_id));
            }

            let amount = zone
                .bids
                .remove(&(auction_id, caller))
                .filter(|amount| *amount > 0)
                .ok_or(ZoneError::NothingToWithdraw(auction_id))?;
            effects.pay(caller, amount);
            effects.events.push(Event::AuctionWithdrawn {
                zone: zone.address(),
                auction_id,
                bidder: caller,
                amount,
            });
            Ok(effects)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::zone::zone::test_support::*;
    use super::*;
    use crate::constants::{DTH, ONE_DAY, ONE_HOUR};

    const FLOOR: u128 = 100 * DTH;

    fn untaxed() -> GlobalParams {
        GlobalParams { entry_fee: 0, zone_tax: 0, ..params() }
    }

    /// owned_zone() with an auction opened by addr(2) at 150 DTH
    fn zone_in_auction() -> (Zone, u64) {
        let mut zone = owned_zone();
        let start = ONE_DAY + untaxed().cooldown_period + ONE_HOUR;
        zone.place_bid(addr(2), 150 * DTH, start, &untaxed(), FLOOR).unwrap();
        (zone, start)
    }

    #[test]
    fn test_min_bid_rounds_up() {
        assert_eq!(min_bid_over(100, 6), 106);
        assert_eq!(min_bid_over(101, 6), 108);
        assert_eq!(min_bid_over(100, 0), 101);
        assert_eq!(min_bid_over(0, 6), 1);
    }

    #[test]
    fn test_bid_during_cooldown_rejected() {
        let mut zone = owned_zone();
        let err = zone.place_bid(addr(2), 500 * DTH, ONE_DAY + ONE_HOUR, &params(), FLOOR).unwrap_err();
        assert!(matches!(err, ZoneError::CooldownNotElapsed { .. }));
        assert!(zone.last_auction().is_none());
    }

    #[test]
    fn test_owner_cannot_open_auction() {
        let mut zone = owned_zone();
        let now = ONE_DAY + params().cooldown_period;
        assert_eq!(zone.place_bid(addr(1), 200 * DTH, now, &params(), FLOOR), Err(ZoneError::OwnerCannotStartAuction));
    }

    #[test]
    fn test_opening_bid_must_beat_stake() {
        let mut zone = owned_zone();
        let now = ONE_DAY + params().cooldown_period;
        let err = zone.place_bid(addr(2), 105 * DTH, now, &untaxed(), FLOOR).unwrap_err();
        assert!(matches!(err, ZoneError::RaiseTooSmall { .. }));
    }

    #[test]
    fn test_opening_registers_owner_stake() {
        let (zone, start) = zone_in_auction();
        let auction = zone.last_auction().unwrap();
        assert_eq!(auction.id, 1);
        assert_eq!(auction.highest_bidder, addr(2));
        assert_eq!(auction.highest_bid, 150 * DTH);
        assert_eq!(auction.end_time, start + untaxed().bid_period);
        assert_eq!(zone.bid_of(1, &addr(1)), 100 * DTH);
        assert_eq!(zone.owner().unwrap().auction_id, 1);
    }

    #[test]
    fn test_entry_fee_goes_to_treasury() {
        let mut zone = owned_zone();
        let now = ONE_DAY + params().cooldown_period;
        let effects = zone.place_bid(addr(2), 200 * DTH, now, &params(), FLOOR).unwrap();
        // one day of tax (4) settled at opening plus the 4% fee on 200
        assert_eq!(effects.to_treasury, 12 * DTH);
        assert_eq!(zone.bid_of(1, &addr(1)), 96 * DTH);
        assert_eq!(zone.bid_of(1, &addr(2)), 192 * DTH);
    }

    #[test]
    fn test_highest_bidder_cannot_outbid_self() {
        let (mut zone, start) = zone_in_auction();
        let result = zone.place_bid(addr(2), 100 * DTH, start + ONE_HOUR, &untaxed(), FLOOR);
        assert_eq!(result, Err(ZoneError::AlreadyHighestBidder));
    }

    #[test]
    fn test_raise_accumulates_prior_bid() {
        let (mut zone, start) = zone_in_auction();
        zone.place_bid(addr(3), 200 * DTH, start + ONE_HOUR, &untaxed(), FLOOR).unwrap();
        // 150 + 70 = 220 >= 200 * 1.06
        zone.place_bid(addr(2), 70 * DTH, start + 2 * ONE_HOUR, &untaxed(), FLOOR).unwrap();
        assert_eq!(zone.bid_of(1, &addr(2)), 220 * DTH);
        assert_eq!(zone.last_auction().unwrap().highest_bidder, addr(2));
    }

    #[test]
    fn test_bid_at_end_boundary_is_closed() {
        let (mut zone, start) = zone_in_auction();
        let end = start + untaxed().bid_period;
        let err = zone.place_bid(addr(3), 1_000 * DTH, end, &untaxed(), FLOOR).unwrap_err();
        assert!(err.is_auction_closed());
        assert!(err.is_cooldown());
    }

    #[test]
    fn test_challenger_wins_on_next_interaction() {
        let (mut zone, start) = zone_in_auction();
        assert_eq!(zone.top_up(addr(1), DTH, start, &untaxed()), Err(ZoneError::AuctionInProgress));
        let end = start + untaxed().bid_period;

        let effects = zone.process_state(end, &untaxed());
        assert!(effects.events.iter().any(|e| matches!(e, Event::AuctionEnded { .. })));

        let owner = zone.owner().unwrap();
        assert_eq!(owner.address, addr(2));
        assert_eq!(owner.staked, 150 * DTH);
        assert_eq!(owner.start_time, end);
        assert_eq!(zone.last_auction().unwrap().state, AuctionState::Ended);
    }

    #[test]
    fn test_owner_defends_zone() {
        let (mut zone, start) = zone_in_auction();
        // owner bids 60 on top of the 100 stake: 160 >= 150 * 1.06
        zone.place_bid(addr(1), 60 * DTH, start + ONE_HOUR, &untaxed(), FLOOR).unwrap();
        let end = start + untaxed().bid_period;
        zone.process_state(end, &untaxed());

        let owner = zone.owner().unwrap();
        assert_eq!(owner.address, addr(1));
        assert_eq!(owner.staked, 160 * DTH);
        assert_eq!(owner.last_tax_time, end);
        assert_eq!(zone.bid_of(1, &addr(2)), 150 * DTH);
    }

    #[test]
    fn test_withdraw_rules() {
        let (mut zone, start) = zone_in_auction();
        zone.place_bid(addr(3), 400 * DTH, start + ONE_HOUR, &untaxed(), FLOOR).unwrap();
        assert_eq!(
            zone.withdraw_from_auction(1, addr(2), start + 2 * ONE_HOUR),
            Err(ZoneError::AuctionStillOpen(1))
        );

        let end = start + untaxed().bid_period;
        let effects = zone.withdraw_from_auction(1, addr(2), end).unwrap();
        assert!(effects.payouts.contains(&(addr(2), 150 * DTH)));
        assert_eq!(zone.withdraw_from_auction(1, addr(2), end), Err(ZoneError::NothingToWithdraw(1)));
        assert_eq!(zone.withdraw_from_auction(1, addr(3), end), Err(ZoneError::NothingToWithdraw(1)));
        assert_eq!(zone.withdraw_from_auction(2, addr(2), end), Err(ZoneError::AuctionNotFound(2)));

        // the dethroned owner gets the old stake back
        let effects = zone.withdraw_from_auction(1, addr(1), end).unwrap();
        assert_eq!(effects.payouts, vec![(addr(1), 100 * DTH)]);
    }

    #[test]
    fn test_started_auction_keeps_its_end_time() {
        let (mut zone, start) = zone_in_auction();
        let shorter = GlobalParams { bid_period: ONE_HOUR, ..untaxed() };
        zone.place_bid(addr(3), 300 * DTH, start + 2 * ONE_HOUR, &shorter, FLOOR).unwrap();
        assert_eq!(zone.last_auction().unwrap().end_time, start + untaxed().bid_period);
    }

    #[test]
    fn test_new_auction_after_cooldown() {
        let (mut zone, start) = zone_in_auction();
        let end = start + untaxed().bid_period;
        let err = zone.place_bid(addr(3), 500 * DTH, end + ONE_HOUR, &untaxed(), FLOOR).unwrap_err();
        assert!(err.is_auction_closed());

        let reopen = end + untaxed().cooldown_period;
        zone.place_bid(addr(3), 500 * DTH, reopen, &untaxed(), FLOOR).unwrap();
        let auction = zone.last_auction().unwrap();
        assert_eq!(auction.id, 2);
        assert_eq!(zone.bid_of(2, &addr(2)), 150 * DTH);
    }

    #[test]
    fn test_bid_on_exhausted_stake_claims_zone() {
        let mut zone = owned_zone();
        // the 100 DTH stake lasts 25 days at 4% per day
        let effects = zone.place_bid(addr(2), 500 * DTH, 40 * ONE_DAY, &params(), FLOOR).unwrap();

        assert_eq!(effects.to_treasury, 100 * DTH);
        assert!(effects.events.iter().any(|e| matches!(e, Event::ZoneForceReleased { .. })));
        let owner = zone.owner().unwrap();
        assert_eq!(owner.address, addr(2));
        assert_eq!(owner.staked, 500 * DTH);
        assert_eq!(owner.start_time, 40 * ONE_DAY);
        assert!(zone.last_auction().is_none());
    }

    #[test]
    fn test_bid_on_unowned_zone_needs_floor_price() {
        let mut zone = owned_zone();
        let now = 40 * ONE_DAY;
        let err = zone.place_bid(addr(2), 50 * DTH, now, &params(), FLOOR).unwrap_err();
        assert_eq!(err, ZoneError::InsufficientStake { stake: 50 * DTH, floor: FLOOR });
        assert_eq!(zone.owner().unwrap().address, addr(1));

        zone.process_state(now, &params());
        assert!(zone.owner().is_none());
        zone.place_bid(addr(2), FLOOR, now, &params(), FLOOR).unwrap();
        assert_eq!(zone.owner().unwrap().address, addr(2));
        assert_eq!(zone.cooldown_base(), now);
    }
}
