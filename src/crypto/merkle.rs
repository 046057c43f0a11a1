//! Merkle tree over transaction ids
//!
//! Each block commits to its transactions with a merkle root so a receipt can
//! be proven against the block header. Odd levels duplicate their last node.

use serde::{Deserialize, Serialize};

use super::{Hash, hash_pair};

/// Pad an odd level and fold it into its parent level
fn parent_level(level: &mut Vec<Hash>) -> Vec<Hash> {
    if level.len() % 2 == 1 {
        let last = level[level.len() - 1];
        level.push(last);
    }
    level
        .chunks(2)
        .map(|pair| hash_pair(&pair[0], &pair[1]))
        .collect()
}

/// Merkle root of the given transaction ids (zero hash when empty)
pub fn compute_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::zero();
    }

    let mut level = hashes.to_vec();
    while level.len() > 1 {
        level = parent_level(&mut level);
    }
    level[0]
}

/// Inclusion proof for a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Position of the transaction in the block
    pub index: usize,
    /// Sibling hashes from leaf to root, flagged when the sibling is on the left
    pub siblings: Vec<(Hash, bool)>,
}

impl MerkleProof {
    /// Verify this proof against a root hash
    pub fn verify(&self, tx_hash: &Hash, root: &Hash) -> bool {
        let folded = self.siblings.iter().fold(*tx_hash, |acc, (sibling, is_left)| {
            if *is_left {
                hash_pair(sibling, &acc)
            } else {
                hash_pair(&acc, sibling)
            }
        });
        folded == *root
    }
}

/// Build the inclusion proof for the transaction at `index`
pub fn build_merkle_proof(hashes: &[Hash], index: usize) -> Option<MerkleProof> {
    if index >= hashes.len() {
        return None;
    }

    let mut level = hashes.to_vec();
    let mut position = index;
    let mut siblings = Vec::new();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        let sibling = position ^ 1;
        siblings.push((level[sibling], position % 2 == 1));
        level = parent_level(&mut level);
        position /= 2;
    }

    Some(MerkleProof { index, siblings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;

    fn tx_ids(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash_bytes(format!("tx-{}", i).as_bytes())).collect()
    }

    #[test]
    fn test_empty_block_has_zero_root() {
        assert_eq!(compute_merkle_root(&[]), Hash::zero());
    }

    #[test]
    fn test_single_transaction_is_root() {
        let ids = tx_ids(1);
        assert_eq!(compute_merkle_root(&ids), ids[0]);
    }

    #[test]
    fn test_two_transactions() {
        let ids = tx_ids(2);
        assert_eq!(compute_merkle_root(&ids), hash_pair(&ids[0], &ids[1]));
    }

    #[test]
    fn test_every_proof_verifies() {
        for n in [2usize, 5, 8] {
            let ids = tx_ids(n);
            let root = compute_merkle_root(&ids);
            for (i, id) in ids.iter().enumerate() {
                let proof = build_merkle_proof(&ids, i).unwrap();
                assert!(proof.verify(id, &root));
            }
        }
    }

    #[test]
    fn test_proof_for_foreign_transaction_fails() {
        let ids = tx_ids(4);
        let root = compute_merkle_root(&ids);
        let proof = build_merkle_proof(&ids, 1).unwrap();
        assert!(!proof.verify(&hash_bytes(b"forged"), &root));
        assert!(build_merkle_proof(&ids, 4).is_none());
    }
}
