//! RPC Method Implementations
//!
//! Each method corresponds to a JSON-RPC call. Params are positional arrays.
//! Amounts are returned as decimal strings of base units.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chain::{Chain, Receipt};
use crate::constants::{CHAIN_NAME, PROTOCOL_VERSION, ZONE_GEOHASH_LEN};
use crate::crypto::{Address, Hash};
use crate::geo::{CountryCode, GeoError, Geohash};
use crate::governance::Proposal;
use crate::validation::SignedTransaction;
use crate::zone::{Auction, Zone};

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(-5, message)
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), result: Some(result), error: None, id }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self { jsonrpc: "2.0".to_string(), result: None, error: Some(JsonRpcError { code, message }), id }
    }
}

/// RPC Handler State
pub struct RpcState {
    pub chain: Arc<Mutex<Chain>>,
}

impl RpcState {
    pub fn new(chain: Arc<Mutex<Chain>>) -> Self {
        Self { chain }
    }

    fn chain(&self) -> Result<MutexGuard<'_, Chain>, JsonRpcError> {
        self.chain.lock().map_err(|_| JsonRpcError::new(-32603, "Chain lock poisoned"))
    }
}

type RpcResult = Result<Value, JsonRpcError>;

/// Process a JSON-RPC request and return a response
pub fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    let params = Params(request.params);
    let result = match request.method.as_str() {
        "getinfo" => get_info(state),
        "getblockcount" => get_block_count(state),
        "getblock" => get_block(state, &params),
        "gettxproof" => get_tx_proof(state, &params),
        "getbalance" => get_balance(state, &params),
        "getnonce" => get_nonce(state, &params),
        "getzone" => get_zone(state, &params),
        "getauction" => get_auction(state, &params),
        "getbid" => get_bid(state, &params),
        "getglobalparams" => get_global_params(state),
        "getfloorprice" => get_floor_price(state, &params),
        "getproposal" => get_proposal(state, &params),
        "gettreasury" => get_treasury(state),
        "sendrawtransaction" => send_raw_transaction(state, &params),
        _ => Err(JsonRpcError::new(-32601, format!("Method not found: {}", request.method))),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(err) => JsonRpcResponse::error(request.id, err.code, err.message),
    }
}

/// Positional params
struct Params(Option<Value>);

impl Params {
    fn get(&self, idx: usize) -> Option<&Value> {
        match &self.0 {
            Some(Value::Array(items)) => items.get(idx),
            Some(single) if idx == 0 => Some(single),
            _ => None,
        }
    }

    fn str(&self, idx: usize, name: &str) -> Result<&str, JsonRpcError> {
        self.get(idx)
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("expected {} at position {}", name, idx)))
    }

    fn u64(&self, idx: usize, name: &str) -> Result<u64, JsonRpcError> {
        self.get(idx)
            .and_then(Value::as_u64)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("expected {} at position {}", name, idx)))
    }

    fn address(&self, idx: usize) -> Result<Address, JsonRpcError> {
        self.str(idx, "address")?
            .parse()
            .map_err(|e| JsonRpcError::invalid_params(format!("invalid address: {}", e)))
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn receipt_json(receipt: &Receipt) -> RpcResult {
    let events = serde_json::to_value(&receipt.events)
        .map_err(|e| JsonRpcError::new(-32603, format!("Cannot render events: {}", e)))?;
    Ok(json!({
        "tx_hash": receipt.tx_hash.to_string(),
        "success": receipt.success,
        "error": receipt.error,
        "events": events,
    }))
}

fn get_info(state: &RpcState) -> RpcResult {
    let chain = state.chain()?;
    let admin = chain.state().controller.admin().map(|a| a.to_string());
    Ok(json!({
        "chain": CHAIN_NAME,
        "version": PROTOCOL_VERSION,
        "height": chain.height(),
        "tip": chain.tip_hash().to_string(),
        "admin": admin,
        "stats": chain.state().get_stats(),
    }))
}

fn get_block_count(state: &RpcState) -> RpcResult {
    Ok(json!(state.chain()?.height()))
}

fn get_block(state: &RpcState, params: &Params) -> RpcResult {
    let number = params.u64(0, "block number")?;
    let chain = state.chain()?;
    let block = chain
        .block(number)
        .ok_or_else(|| JsonRpcError::not_found(format!("Block {} not found", number)))?;

    let receipts = block.receipts.iter().map(receipt_json).collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "number": block.header.number,
        "hash": block.hash().to_string(),
        "previousblockhash": block.header.prev_hash.to_string(),
        "merkleroot": block.header.merkle_root.to_string(),
        "time": block.header.timestamp,
        "tx_count": block.transactions.len(),
        "receipts": receipts,
    }))
}

/// Merkle path proving a transaction is committed by a block header
fn get_tx_proof(state: &RpcState, params: &Params) -> RpcResult {
    let number = params.u64(0, "block number")?;
    let tx_hash = Hash::from_hex(params.str(1, "transaction hash")?)
        .map_err(|e| JsonRpcError::invalid_params(format!("invalid hash: {}", e)))?;
    let chain = state.chain()?;
    let block = chain
        .block(number)
        .ok_or_else(|| JsonRpcError::not_found(format!("Block {} not found", number)))?;
    let proof = block
        .merkle_proof(&tx_hash)
        .ok_or_else(|| JsonRpcError::not_found(format!("Transaction {} not in block {}", tx_hash, number)))?;

    let siblings: Vec<Value> = proof
        .siblings
        .iter()
        .map(|(hash, is_left)| json!({ "hash": hash.to_string(), "left": is_left }))
        .collect();
    Ok(json!({
        "block": number,
        "merkleroot": block.header.merkle_root.to_string(),
        "index": proof.index,
        "siblings": siblings,
        "verified": proof.verify(&tx_hash, &block.header.merkle_root),
    }))
}

fn get_balance(state: &RpcState, params: &Params) -> RpcResult {
    let address = params.address(0)?;
    let chain = state.chain()?;
    Ok(json!({
        "address": address.to_string(),
        "dth": chain.state().token.balance_of(&address).to_string(),
        "wrapped": chain.state().wrapper.balance_of(&address).to_string(),
    }))
}

fn get_nonce(state: &RpcState, params: &Params) -> RpcResult {
    let address = params.address(0)?;
    Ok(json!(state.chain()?.state().nonce_of(&address)))
}

/// Zone by contract address or by geohash
fn find_zone<'a>(chain: &'a Chain, key: &str) -> Result<&'a Zone, JsonRpcError> {
    let factory = &chain.state().factory;
    let zone = match key.parse::<Address>() {
        Ok(address) => factory.zone_at(&address),
        Err(_) => {
            let geohash = Geohash::parse(key.as_bytes(), ZONE_GEOHASH_LEN)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
            factory.zone(&geohash)
        }
    };
    zone.ok_or_else(|| JsonRpcError::not_found(format!("Zone {} not found", key)))
}

fn auction_json(auction: &Auction, now: u64) -> Value {
    json!({
        "id": auction.id,
        "state": format!("{:?}", auction.state_at(now)),
        "start_time": auction.start_time,
        "end_time": auction.end_time,
        "highest_bidder": auction.highest_bidder.to_string(),
        "highest_bid": auction.highest_bid.to_string(),
    })
}

fn get_zone(state: &RpcState, params: &Params) -> RpcResult {
    let key = params.str(0, "zone address or geohash")?;
    let chain = state.chain()?;
    let zone = find_zone(&chain, key)?;
    let now = unix_now().max(chain.tip().header.timestamp);
    let global = chain.state().controller.params().global();

    let owner = zone.owner().map(|o| {
        json!({
            "address": o.address.to_string(),
            "start_time": o.start_time,
            "staked": o.staked.to_string(),
            "balance": o.balance.to_string(),
            "last_tax_time": o.last_tax_time,
            "auction_id": o.auction_id,
        })
    });
    let teller = zone.teller().map(|t| serde_json::to_value(t).unwrap_or(Value::Null));

    Ok(json!({
        "address": zone.address().to_string(),
        "geohash": zone.geohash().to_string(),
        "country": zone.country().to_string(),
        "tier": zone.tier(),
        "owner": owner,
        "pending_tax": zone.pending_tax(now, global).to_string(),
        "auctions": zone.auctions().len(),
        "last_auction": zone.last_auction().map(|a| auction_json(a, now)),
        "teller": teller,
    }))
}

fn get_auction(state: &RpcState, params: &Params) -> RpcResult {
    let key = params.str(0, "zone address or geohash")?;
    let chain = state.chain()?;
    let zone = find_zone(&chain, key)?;
    let now = unix_now().max(chain.tip().header.timestamp);

    let auction = match params.get(1) {
        Some(_) => {
            let id = params.u64(1, "auction id")?;
            zone.auction(id)
                .ok_or_else(|| JsonRpcError::not_found(format!("Auction {} not found", id)))?
        }
        None => zone.last_auction().ok_or_else(|| JsonRpcError::not_found("Zone has no auctions"))?,
    };
    Ok(auction_json(auction, now))
}

fn get_bid(state: &RpcState, params: &Params) -> RpcResult {
    let key = params.str(0, "zone address or geohash")?;
    let auction_id = params.u64(1, "auction id")?;
    let bidder = params.address(2)?;
    let chain = state.chain()?;
    let zone = find_zone(&chain, key)?;
    Ok(json!(zone.bid_of(auction_id, &bidder).to_string()))
}

fn get_global_params(state: &RpcState) -> RpcResult {
    let chain = state.chain()?;
    let store = chain.state().controller.params();
    let global = store.global();
    Ok(json!({
        "bid_period": global.bid_period,
        "cooldown_period": global.cooldown_period,
        "entry_fee": global.entry_fee,
        "zone_tax": global.zone_tax,
        "min_raise": global.min_raise,
        "base_floor_price": store.base_floor_price().to_string(),
        "version": store.version(),
    }))
}

fn get_floor_price(state: &RpcState, params: &Params) -> RpcResult {
    let country: CountryCode = params
        .str(0, "country code")?
        .parse()
        .map_err(|e: GeoError| JsonRpcError::invalid_params(e.to_string()))?;
    let chain = state.chain()?;
    let store = chain.state().controller.params();
    Ok(json!({
        "country": country.to_string(),
        "floor_price": store.floor_price(country).to_string(),
        "free_claim": store.free_claim_enabled(country),
    }))
}

fn proposal_json(proposal: &Proposal, now: u64) -> Value {
    json!({
        "id": proposal.id,
        "kind": proposal.kind().to_string(),
        "args": hex::encode(proposal.action.encode_args()),
        "proposer": proposal.proposer.to_string(),
        "start_date": proposal.start_date,
        "end_date": proposal.end_date,
        "snapshot_block": proposal.snapshot_block,
        "min_accept_quorum": proposal.min_accept_quorum.to_string(),
        "support_required": proposal.support_required.to_string(),
        "voting_power": proposal.voting_power.to_string(),
        "yea": proposal.yea.to_string(),
        "nay": proposal.nay.to_string(),
        "state": format!("{:?}", proposal.state),
        "open": proposal.is_open(now),
    })
}

fn get_proposal(state: &RpcState, params: &Params) -> RpcResult {
    let id = params.u64(0, "proposal id")?;
    let chain = state.chain()?;
    let now = unix_now().max(chain.tip().header.timestamp);
    let proposal = chain
        .state()
        .voting
        .proposal(id)
        .ok_or_else(|| JsonRpcError::not_found(format!("Proposal {} not found", id)))?;
    Ok(proposal_json(proposal, now))
}

fn get_treasury(state: &RpcState) -> RpcResult {
    let chain = state.chain()?;
    let treasury = chain.state().controller.treasury();
    Ok(json!({
        "balance": chain.state().treasury_balance().to_string(),
        "total_collected": treasury.total_collected.to_string(),
        "total_withdrawn": treasury.total_withdrawn.to_string(),
        "failed_withdrawals": treasury.failed_withdrawals,
    }))
}

/// Sequence a hex-encoded signed transaction into the next block
fn send_raw_transaction(state: &RpcState, params: &Params) -> RpcResult {
    let raw = params.str(0, "hex transaction")?;
    let tx = SignedTransaction::from_hex(raw).map_err(|e| JsonRpcError::new(-22, e.to_string()))?;

    let mut chain = state.chain()?;
    let timestamp = unix_now().max(chain.tip().header.timestamp);
    let receipt = chain.submit(tx, timestamp).map_err(|e| JsonRpcError::new(-26, e.to_string()))?;

    let mut result = receipt_json(&receipt)?;
    result["block"] = json!(chain.height());
    Ok(result)
}
