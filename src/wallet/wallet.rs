//! Wallet implementation
//!
//! Holds signing keys and turns protocol calls into signed transactions.
//! The wallet does not touch protocol state; nonces come from the node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::crypto::{Address, PrivateKey, PublicKey};
use crate::validation::{Call, SignedTransaction, TransactionError};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key")]
    InvalidKey,
    #[error("No key for address {0}")]
    UnknownAddress(Address),
    #[error("Signing error: {0}")]
    Signing(#[from] TransactionError),
    #[error("Wallet file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Wallet file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    private_key: PrivateKey,
    pub public_key: PublicKey,
    pub address: Address,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_private_key(PrivateKey::generate())
    }

    fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        let address = public_key.address();
        Self { private_key, public_key, address }
    }

    pub fn from_private_key_bytes(bytes: &[u8; 32]) -> Result<Self, WalletError> {
        let private_key = PrivateKey::from_bytes(bytes).map_err(|_| WalletError::InvalidKey)?;
        Ok(Self::from_private_key(private_key))
    }

    /// Parse a 64-character hex private key
    pub fn from_hex(raw: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(raw.trim()).map_err(|_| WalletError::InvalidKey)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| WalletError::InvalidKey)?;
        Self::from_private_key_bytes(&bytes)
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.private_key.to_bytes()
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key_bytes())
    }

    /// Sign `call` as this key's `nonce`-th transaction
    pub fn sign_call(&self, call: Call, nonce: u64) -> Result<SignedTransaction, WalletError> {
        Ok(SignedTransaction::sign(call, nonce, &self.private_key)?)
    }
}

#[derive(Serialize, Deserialize)]
struct WalletFile {
    keys: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Wallet {
    keys: BTreeMap<Address, KeyPair>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new key and add it to the wallet
    pub fn generate_key(&mut self) -> &KeyPair {
        let keypair = KeyPair::generate();
        self.keys.entry(keypair.address).or_insert(keypair)
    }

    pub fn import_key(&mut self, bytes: &[u8; 32]) -> Result<&KeyPair, WalletError> {
        let keypair = KeyPair::from_private_key_bytes(bytes)?;
        Ok(self.keys.entry(keypair.address).or_insert(keypair))
    }

    pub fn key_for(&self, address: &Address) -> Option<&KeyPair> {
        self.keys.get(address)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.keys.keys().copied().collect()
    }

    pub fn sign_call(&self, from: &Address, call: Call, nonce: u64) -> Result<SignedTransaction, WalletError> {
        self.key_for(from)
            .ok_or(WalletError::UnknownAddress(*from))?
            .sign_call(call, nonce)
    }

    /// Save as JSON with hex private keys
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WalletError> {
        let file = WalletFile { keys: self.keys.values().map(KeyPair::private_key_hex).collect() };
        fs::write(path, serde_json::to_vec_pretty(&file)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let file: WalletFile = serde_json::from_slice(&fs::read(path)?)?;
        let mut wallet = Wallet::new();
        for raw in &file.keys {
            let keypair = KeyPair::from_hex(raw)?;
            wallet.keys.insert(keypair.address, keypair);
        }
        Ok(wallet)
    }
}
