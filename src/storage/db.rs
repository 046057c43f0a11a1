//! Database persistence layer using Sled
//!
//! Blocks are keyed by number, the latest protocol state is kept as a single
//! snapshot, and the tip lives in a metadata tree.

use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;

use super::ProtocolState;
use crate::chain::Block;
use crate::crypto::Hash;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sled::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("Corrupt metadata entry {0}")]
    CorruptMetadata(&'static str),
}

#[derive(Debug, Clone)]
pub struct ChainDb {
    db: Db,
    blocks_tree: Tree,
    state_tree: Tree,
    metadata_tree: Tree,
}

const TIP_KEY: &str = "tip_hash";
const HEIGHT_KEY: &str = "height";
const SNAPSHOT_KEY: &str = "snapshot";

impl ChainDb {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let blocks_tree = db.open_tree("blocks")?;
        let state_tree = db.open_tree("state")?;
        let metadata_tree = db.open_tree("metadata")?;

        Ok(Self { db, blocks_tree, state_tree, metadata_tree })
    }

    pub fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let value = bincode::serialize(block)?;
        self.blocks_tree.insert(block.header.number.to_be_bytes(), value)?;
        Ok(())
    }

    pub fn get_block(&self, number: u64) -> Result<Option<Block>, StorageError> {
        match self.blocks_tree.get(number.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All blocks in order
    pub fn load_blocks(&self) -> Result<Vec<Block>, StorageError> {
        let mut blocks = Vec::new();
        for item in self.blocks_tree.iter() {
            let (_, value) = item?;
            blocks.push(bincode::deserialize(&value)?);
        }
        Ok(blocks)
    }

    pub fn save_state(&self, state: &ProtocolState) -> Result<(), StorageError> {
        let value = bincode::serialize(state)?;
        self.state_tree.insert(SNAPSHOT_KEY, value)?;
        Ok(())
    }

    pub fn load_state(&self) -> Result<Option<ProtocolState>, StorageError> {
        match self.state_tree.get(SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Record the new tip and flush everything written so far
    pub fn update_metadata(&self, tip: &Hash, height: u64) -> Result<(), StorageError> {
        self.metadata_tree.insert(TIP_KEY, tip.0.as_ref())?;
        self.metadata_tree.insert(HEIGHT_KEY, height.to_le_bytes().as_ref())?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_metadata(&self) -> Result<Option<(Hash, u64)>, StorageError> {
        let tip = self.metadata_tree.get(TIP_KEY)?;
        let height = self.metadata_tree.get(HEIGHT_KEY)?;

        match (tip, height) {
            (Some(tip), Some(height)) => {
                let tip: [u8; 32] = tip.as_ref().try_into().map_err(|_| StorageError::CorruptMetadata(TIP_KEY))?;
                let height: [u8; 8] =
                    height.as_ref().try_into().map_err(|_| StorageError::CorruptMetadata(HEIGHT_KEY))?;
                Ok(Some((Hash(tip), u64::from_le_bytes(height))))
            }
            _ => Ok(None),
        }
    }
}
