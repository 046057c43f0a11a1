//! Block structure for the Dether chain
//!
//! A block carries the transactions it sequenced and one receipt per
//! transaction. The header commits to the transaction ids through a merkle root.

use serde::{Deserialize, Serialize};

use crate::crypto::{build_merkle_proof, compute_merkle_root, hash_bytes, Hash, MerkleProof};
use crate::events::Event;
use crate::validation::SignedTransaction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    /// Height, genesis is 0
    pub number: u64,
    pub prev_hash: Hash,
    /// Merkle root of the transaction ids
    pub merkle_root: Hash,
    /// Unix seconds, never lower than the parent's
    pub timestamp: u64,
}

impl BlockHeader {
    /// Serialize the header for hashing
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + 8 + 32 + 32 + 8);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.number.to_le_bytes());
        bytes.extend_from_slice(&self.prev_hash.0);
        bytes.extend_from_slice(&self.merkle_root.0);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    pub fn hash(&self) -> Hash {
        hash_bytes(&self.to_bytes())
    }
}

/// Result of applying one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: Hash,
    pub success: bool,
    pub events: Vec<Event>,
    /// Why the call was rolled back
    pub error: Option<String>,
}

impl Receipt {
    pub fn success(tx_hash: Hash, events: Vec<Event>) -> Self {
        Self { tx_hash, success: true, events, error: None }
    }

    pub fn failure(tx_hash: Hash, error: String) -> Self {
        Self { tx_hash, success: false, events: Vec::new(), error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
    pub receipts: Vec<Receipt>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<SignedTransaction>, receipts: Vec<Receipt>) -> Self {
        Self { header, transactions, receipts }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn is_genesis(&self) -> bool {
        self.header.number == 0 && self.header.prev_hash == Hash::zero()
    }

    /// Merkle root over receipt tx ids, which mirror the transactions
    pub fn compute_merkle_root(&self) -> Hash {
        let ids: Vec<Hash> = self.receipts.iter().map(|r| r.tx_hash).collect();
        compute_merkle_root(&ids)
    }

    /// Inclusion proof of `tx_hash` against the header's merkle root
    pub fn merkle_proof(&self, tx_hash: &Hash) -> Option<MerkleProof> {
        let ids: Vec<Hash> = self.receipts.iter().map(|r| r.tx_hash).collect();
        let index = ids.iter().position(|id| id == tx_hash)?;
        build_merkle_proof(&ids, index)
    }
}
