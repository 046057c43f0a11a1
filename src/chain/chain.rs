//! Block sequencing
//!
//! The node is the only block producer. Transactions are checked (version,
//! signature, nonce) before a block is built; a transaction that passes those
//! checks always lands in the block, with a failed receipt if its call errors.

use std::collections::BTreeMap;
use thiserror::Error;

use super::{Block, BlockHeader, CallContext, Receipt};
use crate::constants::PROTOCOL_VERSION;
use crate::crypto::{compute_merkle_root, Address, Hash};
use crate::storage::{ChainDb, ProtocolState, StorageError};
use crate::validation::{SignedTransaction, TransactionError};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Rejected transaction: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Block timestamp {got} is before the tip timestamp {tip}")]
    TimestampRegression { tip: u64, got: u64 },
    #[error("Block has no transactions")]
    EmptyBlock,
    #[error("Stored chain does not start at this genesis block")]
    GenesisMismatch,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct Chain {
    state: ProtocolState,
    /// Never empty: index 0 is genesis
    blocks: Vec<Block>,
    db: Option<ChainDb>,
}

impl Chain {
    /// In-memory chain starting from `genesis` and its seeded state
    pub fn new(genesis: Block, state: ProtocolState) -> Self {
        Self { state, blocks: vec![genesis], db: None }
    }

    /// Persistent chain. Reloads the stored tip and state when the database
    /// already holds this chain, otherwise writes the genesis.
    pub fn open(db: ChainDb, genesis: Block, state: ProtocolState) -> Result<Self, ChainError> {
        if let Some(saved) = db.load_state()? {
            let blocks = db.load_blocks()?;
            match blocks.first() {
                Some(first) if first.hash() == genesis.hash() => {}
                _ => return Err(ChainError::GenesisMismatch),
            }
            let height = blocks.len() as u64 - 1;
            log::info!("loaded chain at height {}", height);
            return Ok(Self { state: saved, blocks, db: Some(db) });
        }

        db.save_block(&genesis)?;
        db.save_state(&state)?;
        db.update_metadata(&genesis.hash(), 0)?;
        log::info!("initialised new chain with genesis {}", genesis.hash());
        Ok(Self { state, blocks: vec![genesis], db: Some(db) })
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> Hash {
        self.tip().hash()
    }

    pub fn block(&self, number: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(number).ok()?)
    }

    /// Sequence a single transaction into its own block
    pub fn submit(&mut self, tx: SignedTransaction, timestamp: u64) -> Result<Receipt, ChainError> {
        let block = self.produce_block(vec![tx], timestamp)?;
        block.receipts.first().cloned().ok_or(ChainError::EmptyBlock)
    }

    /// Build, apply and persist the next block
    pub fn produce_block(&mut self, txs: Vec<SignedTransaction>, timestamp: u64) -> Result<&Block, ChainError> {
        if txs.is_empty() {
            return Err(ChainError::EmptyBlock);
        }
        let tip = self.tip();
        if timestamp < tip.header.timestamp {
            return Err(ChainError::TimestampRegression { tip: tip.header.timestamp, got: timestamp });
        }
        let number = tip.number() + 1;
        let prev_hash = tip.hash();

        self.check_transactions(&txs)?;

        let mut state = self.state.clone();
        let mut receipts = Vec::with_capacity(txs.len());
        for tx in &txs {
            let tx_hash = tx.hash()?;
            let sender = tx.sender();
            let ctx = CallContext { sender, block: number, now: timestamp };

            let mut draft = state.clone();
            let receipt = match draft.apply_call(&ctx, &tx.call) {
                Ok(events) => {
                    state = draft;
                    Receipt::success(tx_hash, events)
                }
                Err(err) => {
                    log::debug!("{} from {} failed in block {}: {}", tx.call.name(), sender, number, err);
                    Receipt::failure(tx_hash, err.to_string())
                }
            };
            state.bump_nonce(sender);
            receipts.push(receipt);
        }

        let ids: Vec<Hash> = receipts.iter().map(|r| r.tx_hash).collect();
        let header = BlockHeader {
            version: PROTOCOL_VERSION,
            number,
            prev_hash,
            merkle_root: compute_merkle_root(&ids),
            timestamp,
        };
        let block = Block::new(header, txs, receipts);

        if let Some(db) = &self.db {
            db.save_block(&block)?;
            db.save_state(&state)?;
            db.update_metadata(&block.hash(), number)?;
        }

        log::info!("block {} sealed with {} transaction(s)", number, block.transactions.len());
        self.state = state;
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Version, signature and nonce order for every transaction in a block
    fn check_transactions(&self, txs: &[SignedTransaction]) -> Result<(), ChainError> {
        let mut next: BTreeMap<Address, u64> = BTreeMap::new();
        for tx in txs {
            tx.verify()?;
            let sender = tx.sender();
            let expected = *next.entry(sender).or_insert_with(|| self.state.nonce_of(&sender));
            if tx.nonce != expected {
                return Err(TransactionError::BadNonce { expected, got: tx.nonce }.into());
            }
            next.insert(sender, expected + 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DTH;
    use crate::crypto::PrivateKey;
    use crate::governance::VotingParams;
    use crate::params::ParameterStore;
    use crate::validation::Call;

    fn genesis() -> Block {
        let header = BlockHeader {
            version: PROTOCOL_VERSION,
            number: 0,
            prev_hash: Hash::zero(),
            merkle_root: Hash::zero(),
            timestamp: 1_000,
        };
        Block::new(header, vec![], vec![])
    }

    fn chain(admin: &PrivateKey) -> Chain {
        let state = ProtocolState::new(admin.public_key().address(), ParameterStore::default(), VotingParams::default());
        Chain::new(genesis(), state)
    }

    fn mint(admin: &PrivateKey, nonce: u64, amount: u128) -> SignedTransaction {
        SignedTransaction::sign(Call::Mint { to: Address([5; 20]), amount }, nonce, admin).unwrap()
    }

    #[test]
    fn test_submit_appends_block() {
        let admin = PrivateKey::generate();
        let mut chain = chain(&admin);
        let receipt = chain.submit(mint(&admin, 0, DTH), 1_000).unwrap();

        assert!(receipt.success);
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tip().header.prev_hash, genesis().hash());
        assert_eq!(chain.tip().header.merkle_root, compute_merkle_root(&[receipt.tx_hash]));
        assert_eq!(chain.state().token.balance_of(&Address([5; 20])), DTH);
    }

    #[test]
    fn test_failed_call_keeps_state_and_bumps_nonce() {
        let admin = PrivateKey::generate();
        let outsider = PrivateKey::generate();
        let mut chain = chain(&admin);

        let receipt = chain.submit(mint(&outsider, 0, DTH), 1_001).unwrap();
        assert!(!receipt.success);
        assert!(receipt.error.is_some());
        assert_eq!(chain.state().token.total_supply(), 0);
        assert_eq!(chain.state().nonce_of(&outsider.public_key().address()), 1);
    }

    #[test]
    fn test_bad_nonce_rejected_without_block() {
        let admin = PrivateKey::generate();
        let mut chain = chain(&admin);
        let err = chain.submit(mint(&admin, 1, DTH), 1_000).unwrap_err();
        assert!(matches!(err, ChainError::Transaction(TransactionError::BadNonce { expected: 0, got: 1 })));
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_replay_rejected() {
        let admin = PrivateKey::generate();
        let mut chain = chain(&admin);
        let tx = mint(&admin, 0, DTH);
        chain.submit(tx.clone(), 1_000).unwrap();
        assert!(chain.submit(tx, 1_000).is_err());
        assert_eq!(chain.state().token.total_supply(), DTH);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let admin = PrivateKey::generate();
        let mut chain = chain(&admin);
        let err = chain.submit(mint(&admin, 0, DTH), 999).unwrap_err();
        assert!(matches!(err, ChainError::TimestampRegression { tip: 1_000, got: 999 }));
    }

    #[test]
    fn test_block_with_several_transactions() {
        let admin = PrivateKey::generate();
        let mut chain = chain(&admin);
        let block = chain
            .produce_block(vec![mint(&admin, 0, DTH), mint(&admin, 1, 2 * DTH)], 1_010)
            .unwrap();
        assert_eq!(block.receipts.len(), 2);
        assert_eq!(chain.state().token.total_supply(), 3 * DTH);
    }

    #[test]
    fn test_persistent_chain_reloads() {
        let admin = PrivateKey::generate();
        let path = std::env::temp_dir().join(format!("dether-chain-test-{}", rand::random::<u64>()));
        let state = ProtocolState::new(admin.public_key().address(), ParameterStore::default(), VotingParams::default());

        {
            let db = ChainDb::open(&path).unwrap();
            let mut chain = Chain::open(db, genesis(), state.clone()).unwrap();
            chain.submit(mint(&admin, 0, 7), 1_000).unwrap();
        }

        let db = ChainDb::open(&path).unwrap();
        let chain = Chain::open(db, genesis(), state).unwrap();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.state().token.total_supply(), 7);
    }
}
