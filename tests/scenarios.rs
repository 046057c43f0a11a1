//! End-to-end protocol scenarios
//!
//! Every step is a signed transaction sequenced through the chain with an
//! explicit block timestamp, so time moves only when a test advances it.

use dether_core::chain::{Chain, Receipt};
use dether_core::config::{CountryConfig, MintConfig, NodeConfig};
use dether_core::constants::{DTH, ONE_DAY, ONE_HOUR};
use dether_core::crypto::Address;
use dether_core::events::Event;
use dether_core::factory::{CreateZone, ZoneFactory, ZonePayload};
use dether_core::geo::{CountryCode, Geohash};
use dether_core::governance::{ProposalAction, ProposalState, ProtocolController};
use dether_core::node::{create_genesis_block, genesis_state};
use dether_core::params::GlobalParams;
use dether_core::token::DthWrapper;
use dether_core::validation::Call;
use dether_core::wallet::KeyPair;
use dether_core::zone::Zone;

struct Harness {
    chain: Chain,
    admin: KeyPair,
    now: u64,
}

impl Harness {
    /// Country CG on prefix `krcz`, every user funded with 1000 DTH
    fn new(users: &[&KeyPair]) -> Self {
        let admin = KeyPair::generate();
        let mut config = NodeConfig::default();
        config.genesis.countries.push(CountryConfig {
            code: "CG".into(),
            prefixes: vec!["krcz".into()],
            free_claim: false,
        });
        for user in users {
            config.genesis.mints.push(MintConfig { address: user.address.to_string(), amount_dth: 1_000 });
        }

        let state = genesis_state(&config, admin.address).unwrap();
        let genesis = create_genesis_block(&state, config.genesis.timestamp).unwrap();
        Self { chain: Chain::new(genesis, state), admin, now: config.genesis.timestamp }
    }

    fn advance(&mut self, secs: u64) {
        self.now += secs;
    }

    fn send(&mut self, key: &KeyPair, call: Call) -> Receipt {
        let nonce = self.chain.state().nonce_of(&key.address);
        let tx = key.sign_call(call, nonce).unwrap();
        self.chain.submit(tx, self.now).unwrap()
    }

    fn send_ok(&mut self, key: &KeyPair, call: Call) -> Vec<Event> {
        let receipt = self.send(key, call);
        assert!(receipt.success, "call failed: {:?}", receipt.error);
        receipt.events
    }

    fn admin_call(&mut self, call: Call) -> Vec<Event> {
        let admin = self.admin.clone();
        self.send_ok(&admin, call)
    }

    fn balance(&self, address: &Address) -> u128 {
        self.chain.state().token.balance_of(address)
    }

    fn zone(&self, geohash: &str) -> &Zone {
        self.chain.state().factory.zone(&geohash_of(geohash)).unwrap()
    }

    fn create_zone(&mut self, key: &KeyPair, geohash: &str, stake: u128) -> Receipt {
        let data = ZonePayload::Create(CreateZone { country: cg(), geohash: geohash_of(geohash), tier: 0 }).encode();
        self.send(key, Call::Transfer { to: ZoneFactory::address(), amount: stake, data })
    }

    fn bid(&mut self, key: &KeyPair, geohash: &str, amount: u128) -> Receipt {
        let zone = Zone::address_for(&geohash_of(geohash));
        self.send(key, Call::Transfer { to: zone, amount, data: ZonePayload::Bid.encode() })
    }

    fn wrap(&mut self, key: &KeyPair, amount: u128) {
        self.send_ok(key, Call::Transfer { to: DthWrapper::address(), amount, data: vec![] });
    }

    fn propose(&mut self, key: &KeyPair, action: &ProposalAction) -> Receipt {
        let call = Call::CreateProposal { kind: action.kind() as u8, args: action.encode_args() };
        self.send(key, call)
    }
}

fn cg() -> CountryCode {
    "CG".parse().unwrap()
}

fn geohash_of(raw: &str) -> Geohash {
    Geohash::parse(raw.as_bytes(), 6).unwrap()
}

fn untaxed() -> GlobalParams {
    GlobalParams { entry_fee: 0, zone_tax: 0, ..GlobalParams::default() }
}

// ============================================================================
// ZONES
// ============================================================================

#[test]
fn test_create_zone_requires_floor_price() {
    let alice = KeyPair::generate();
    let mut h = Harness::new(&[&alice]);

    let receipt = h.create_zone(&alice, "krczts", 100 * DTH);
    assert!(receipt.success, "{:?}", receipt.error);
    assert_eq!(h.zone("krczts").owner().unwrap().address, alice.address);
    assert_eq!(h.balance(&alice.address), 900 * DTH);

    let receipt = h.create_zone(&alice, "krczu1", 99 * DTH);
    assert!(!receipt.success);
    assert!(receipt.error.unwrap().contains("below the floor price"));
    assert!(h.chain.state().factory.zone(&geohash_of("krczu1")).is_none());
    // the stake transfer is rolled back with the failed call
    assert_eq!(h.balance(&alice.address), 900 * DTH);
}

#[test]
fn test_zone_outside_country_rejected() {
    let alice = KeyPair::generate();
    let mut h = Harness::new(&[&alice]);

    let receipt = h.create_zone(&alice, "u33dbc", 100 * DTH);
    assert!(!receipt.success);
    assert_eq!(h.balance(&alice.address), 1_000 * DTH);
}

#[test]
fn test_auction_changes_owner_and_refunds_loser() {
    let (owner, bob, carol) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
    let mut h = Harness::new(&[&owner, &bob, &carol]);
    h.admin_call(Call::UpdateGlobalParams { params: untaxed() });
    assert!(h.create_zone(&owner, "krczts", 100 * DTH).success);

    let params = untaxed();
    h.advance(params.cooldown_period + ONE_HOUR);
    let receipt = h.bid(&bob, "krczts", 150 * DTH);
    assert!(receipt.success, "{:?}", receipt.error);

    h.advance(ONE_HOUR);
    let receipt = h.bid(&carol, "krczts", 400 * DTH);
    assert!(receipt.success, "{:?}", receipt.error);
    assert_eq!(h.balance(&bob.address), 850 * DTH);

    h.advance(params.bid_period);
    let zone = h.zone("krczts").address();
    let events = h.send_ok(&bob, Call::WithdrawFromAuction { zone, auction_id: 1 });
    assert!(events.iter().any(|e| matches!(e, Event::AuctionEnded { auction_id: 1, .. })));
    assert_eq!(h.balance(&bob.address), 1_000 * DTH);
    assert_eq!(h.zone("krczts").owner().unwrap().address, carol.address);
    assert_eq!(h.zone("krczts").owner().unwrap().staked, 400 * DTH);

    // the previous owner's stake was escrowed as a losing bid
    h.send_ok(&owner, Call::WithdrawFromAuction { zone, auction_id: 1 });
    assert_eq!(h.balance(&owner.address), 1_000 * DTH);

    let receipt = h.send(&bob, Call::WithdrawFromAuction { zone, auction_id: 1 });
    assert!(!receipt.success);
}

#[test]
fn test_bid_during_cooldown_fails() {
    let (owner, bob) = (KeyPair::generate(), KeyPair::generate());
    let mut h = Harness::new(&[&owner, &bob]);
    assert!(h.create_zone(&owner, "krczts", 100 * DTH).success);

    h.advance(ONE_HOUR);
    let receipt = h.bid(&bob, "krczts", 200 * DTH);
    assert!(!receipt.success);
    assert!(h.zone("krczts").last_auction().is_none());
    assert_eq!(h.balance(&bob.address), 1_000 * DTH);
}

#[test]
fn test_entry_fee_and_tax_reach_treasury() {
    let (owner, bob) = (KeyPair::generate(), KeyPair::generate());
    let mut h = Harness::new(&[&owner, &bob]);
    assert!(h.create_zone(&owner, "krczts", 100 * DTH).success);

    // one day of 4% tax, then an opening bid of 200 pays a 4% entry fee
    h.advance(ONE_DAY + ONE_HOUR);
    let receipt = h.bid(&bob, "krczts", 200 * DTH);
    assert!(receipt.success, "{:?}", receipt.error);
    assert!(receipt.events.iter().any(|e| matches!(e, Event::EntryFeePaid { amount, .. } if *amount == 8 * DTH)));
    assert!(h.chain.state().treasury_balance() >= 8 * DTH);
    assert_eq!(
        h.chain.state().treasury_balance(),
        h.chain.state().controller.treasury().total_collected
    );
}

#[test]
fn test_release_and_free_claim() {
    let (owner, bob) = (KeyPair::generate(), KeyPair::generate());
    let mut h = Harness::new(&[&owner, &bob]);
    h.admin_call(Call::UpdateGlobalParams { params: untaxed() });
    assert!(h.create_zone(&owner, "krczts", 100 * DTH).success);
    let zone = h.zone("krczts").address();

    h.advance(ONE_HOUR);
    h.send_ok(&owner, Call::Release { zone });
    assert_eq!(h.balance(&owner.address), 1_000 * DTH);
    assert!(h.zone("krczts").owner().is_none());

    let claim = |amount| Call::Transfer { to: zone, amount, data: ZonePayload::ClaimFree.encode() };
    assert!(!h.send(&bob, claim(10 * DTH)).success);

    h.admin_call(Call::SetFreeClaim { country: cg(), enabled: true });
    h.send_ok(&bob, claim(10 * DTH));
    assert_eq!(h.zone("krczts").owner().unwrap().address, bob.address);
}

#[test]
fn test_bid_after_stake_exhausted_takes_zone() {
    let (owner, bob) = (KeyPair::generate(), KeyPair::generate());
    let mut h = Harness::new(&[&owner, &bob]);
    assert!(h.create_zone(&owner, "krczts", 100 * DTH).success);
    let zone = h.zone("krczts").address();

    // 4% per day uses up the 100 DTH stake after 25 days
    h.advance(40 * ONE_DAY);
    let events = h.send_ok(&bob, Call::Transfer { to: zone, amount: 300 * DTH, data: ZonePayload::Bid.encode() });
    assert!(events.iter().any(|e| matches!(e, Event::ZoneForceReleased { .. })));
    assert!(events.iter().any(|e| matches!(e, Event::ZoneClaimed { stake, .. } if *stake == 300 * DTH)));

    assert_eq!(h.zone("krczts").owner().unwrap().address, bob.address);
    assert_eq!(h.balance(&bob.address), 700 * DTH);
    assert_eq!(h.balance(&zone), 300 * DTH);
    assert_eq!(h.chain.state().treasury_balance(), 100 * DTH);

    // the former owner's top-up comes straight back
    h.advance(ONE_HOUR);
    let top_up = h.send(&owner, Call::Transfer { to: zone, amount: 5 * DTH, data: ZonePayload::TopUp.encode() });
    assert!(!top_up.success);
    assert_eq!(h.balance(&owner.address), 900 * DTH);
}

// ============================================================================
// SETTINGS
// ============================================================================

#[test]
fn test_admin_settings() {
    let alice = KeyPair::generate();
    let mut h = Harness::new(&[&alice]);

    h.admin_call(Call::SetCountryFloorPrice { country: cg(), price: 200 * DTH });
    assert_eq!(h.chain.state().controller.country_floor_price(cg()), 200 * DTH);
    assert!(!h.create_zone(&alice, "krczts", 150 * DTH).success);
    assert!(h.create_zone(&alice, "krczts", 200 * DTH).success);

    let receipt = h.send(&alice, Call::SetCountryFloorPrice { country: cg(), price: DTH });
    assert!(!receipt.success);

    let receipt = h.send(&alice, Call::UpdateGlobalParams { params: untaxed() });
    assert!(!receipt.success);
    assert_eq!(*h.chain.state().controller.params().global(), GlobalParams::default());
}

#[test]
fn test_renounced_admin_loses_rights() {
    let alice = KeyPair::generate();
    let mut h = Harness::new(&[&alice]);

    h.admin_call(Call::RenounceAdmin);
    assert_eq!(h.chain.state().controller.admin(), None);

    let admin = h.admin.clone();
    let receipt = h.send(&admin, Call::Mint { to: alice.address, amount: DTH });
    assert!(!receipt.success);
    assert!(receipt.error.unwrap().contains("renounced"));
}

#[test]
fn test_treasury_withdrawal_by_admin() {
    let alice = KeyPair::generate();
    let mut h = Harness::new(&[&alice]);
    h.send_ok(&alice, Call::Transfer { to: ProtocolController::address(), amount: 50 * DTH, data: vec![] });
    assert_eq!(h.chain.state().treasury_balance(), 50 * DTH);

    let recipient = Address([7; 20]);
    let events = h.admin_call(Call::WithdrawDth { recipient, amount: 20 * DTH, memo: "grant".into() });
    assert!(matches!(events[0], Event::WithdrawDth { .. }));
    assert_eq!(h.balance(&recipient), 20 * DTH);
    assert_eq!(h.chain.state().treasury_balance(), 30 * DTH);
}

// ============================================================================
// GOVERNANCE
// ============================================================================

/// Proposer wraps 1 DTH, the voters the rest of `weights`
fn voting_setup(weights: &[u128]) -> (Harness, Vec<KeyPair>) {
    let keys: Vec<KeyPair> = weights.iter().map(|_| KeyPair::generate()).collect();
    let refs: Vec<&KeyPair> = keys.iter().collect();
    let mut h = Harness::new(&refs);
    for (key, weight) in keys.iter().zip(weights) {
        h.wrap(key, *weight);
    }
    (h, keys)
}

fn shorter_bid_period() -> ProposalAction {
    ProposalAction::GlobalParams(GlobalParams { bid_period: ONE_DAY, ..GlobalParams::default() })
}

#[test]
fn test_proposal_passes_and_updates_params() {
    let (mut h, keys) = voting_setup(&[DTH, 6 * DTH, 3 * DTH]);
    let receipt = h.propose(&keys[0], &shorter_bid_period());
    assert!(receipt.success, "{:?}", receipt.error);

    let proposal = h.chain.state().voting.proposal(1).unwrap();
    assert_eq!(proposal.voting_power, 10 * DTH);

    h.send_ok(&keys[0], Call::PlaceVote { id: 1, support: true });
    h.send_ok(&keys[1], Call::PlaceVote { id: 1, support: true });
    h.send_ok(&keys[2], Call::PlaceVote { id: 1, support: false });

    assert!(!h.send(&keys[1], Call::ExecuteProposal { id: 1 }).success);
    let params_before = *h.chain.state().controller.params().global();
    assert_eq!(params_before.bid_period, GlobalParams::default().bid_period);

    h.advance(8 * ONE_DAY);
    let events = h.send_ok(&keys[1], Call::ExecuteProposal { id: 1 });
    assert!(matches!(events[0], Event::ProposalExecuted { id: 1 }));
    assert_eq!(h.chain.state().voting.proposal(1).unwrap().state, ProposalState::Executed);
    assert_eq!(h.chain.state().controller.params().global().bid_period, ONE_DAY);

    assert!(!h.send(&keys[1], Call::ExecuteProposal { id: 1 }).success);
}

#[test]
fn test_proposal_without_quorum_fails() {
    let (mut h, keys) = voting_setup(&[DTH, DTH, 8 * DTH]);
    assert!(h.propose(&keys[0], &shorter_bid_period()).success);

    h.send_ok(&keys[0], Call::PlaceVote { id: 1, support: true });
    h.send_ok(&keys[1], Call::PlaceVote { id: 1, support: true });

    h.advance(8 * ONE_DAY);
    let events = h.send_ok(&keys[2], Call::ExecuteProposal { id: 1 });
    assert!(matches!(events[0], Event::ProposalFailed { id: 1, .. }));
    assert_eq!(h.chain.state().voting.proposal(1).unwrap().state, ProposalState::Failed);
    assert_eq!(*h.chain.state().controller.params().global(), GlobalParams::default());
}

#[test]
fn test_send_dth_beyond_treasury_still_executes() {
    let (mut h, keys) = voting_setup(&[DTH, 9 * DTH]);
    h.send_ok(&keys[1], Call::Transfer { to: ProtocolController::address(), amount: 5 * DTH, data: vec![] });

    let recipient = Address([7; 20]);
    let action = ProposalAction::SendDth { recipient, amount: 1_000 * DTH };
    assert!(h.propose(&keys[0], &action).success);
    h.send_ok(&keys[1], Call::PlaceVote { id: 1, support: true });

    h.advance(8 * ONE_DAY);
    let events = h.send_ok(&keys[0], Call::ExecuteProposal { id: 1 });
    assert!(events.iter().any(|e| matches!(e, Event::WithdrawDthTransferFailed { .. })));
    assert_eq!(h.chain.state().voting.proposal(1).unwrap().state, ProposalState::Executed);
    assert_eq!(h.chain.state().treasury_balance(), 5 * DTH);
    assert_eq!(h.balance(&recipient), 0);
    assert_eq!(h.chain.state().controller.treasury().failed_withdrawals, 1);
}

#[test]
fn test_proposer_needs_wrapped_balance() {
    let (mut h, keys) = voting_setup(&[DTH / 2, 9 * DTH]);
    let receipt = h.propose(&keys[0], &shorter_bid_period());
    assert!(!receipt.success);
    assert!(h.chain.state().voting.proposal(1).is_none());
}

#[test]
fn test_wrapping_after_snapshot_gives_no_power() {
    let (mut h, keys) = voting_setup(&[DTH, 9 * DTH]);
    assert!(h.propose(&keys[0], &shorter_bid_period()).success);

    let late = KeyPair::generate();
    h.admin_call(Call::Mint { to: late.address, amount: 10 * DTH });
    h.wrap(&late, 10 * DTH);
    assert!(!h.send(&late, Call::PlaceVote { id: 1, support: false }).success);
}

#[test]
fn test_governance_takes_over_after_renounce() {
    let (mut h, keys) = voting_setup(&[DTH, 9 * DTH]);
    h.admin_call(Call::RenounceAdmin);

    let action = ProposalAction::CountryFloorPrice { country: cg(), price: 300 * DTH };
    assert!(h.propose(&keys[0], &action).success);
    h.send_ok(&keys[1], Call::PlaceVote { id: 1, support: true });

    h.advance(8 * ONE_DAY);
    h.send_ok(&keys[0], Call::ExecuteProposal { id: 1 });
    assert_eq!(h.chain.state().controller.country_floor_price(cg()), 300 * DTH);
}
