//! Signed transactions
//!
//! Every state change enters the node as a [`SignedTransaction`]: a protocol
//! [`Call`] plus the sender's nonce, signed with Schnorr over secp256k1. The
//! sender address is derived from the public key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::PROTOCOL_VERSION;
use crate::crypto::{hash_tagged, Address, Hash, PrivateKey, PublicKey, SchnorrSignature, SignatureError};
use crate::geo::CountryCode;
use crate::params::GlobalParams;
use crate::zone::Teller;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Unsupported transaction version {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Bad nonce: expected {expected}, got {got}")]
    BadNonce { expected: u64, got: u64 },
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Signing failed: {0}")]
    Signing(#[from] SignatureError),
}

/// Operation requested by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// DTH transfer; `data` is forwarded to protocol addresses
    Transfer { to: Address, amount: u128, data: Vec<u8> },
    Unwrap { amount: u128 },
    WithdrawFromAuction { zone: Address, auction_id: u64 },
    Release { zone: Address },
    ProcessState { zone: Address },
    AddTeller { zone: Address, teller: Teller },
    RemoveTeller { zone: Address },
    CreateProposal { kind: u8, args: Vec<u8> },
    PlaceVote { id: u64, support: bool },
    ExecuteProposal { id: u64 },

    // admin
    Mint { to: Address, amount: u128 },
    EnableCountry { country: CountryCode, prefixes: Vec<String> },
    DisableCountry { country: CountryCode },
    UpdateGlobalParams { params: GlobalParams },
    SetCountryFloorPrice { country: CountryCode, price: u128 },
    SetFreeClaim { country: CountryCode, enabled: bool },
    WithdrawDth { recipient: Address, amount: u128, memo: String },
    RenounceAdmin,
}

impl Call {
    /// Short method name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Call::Transfer { .. } => "transfer",
            Call::Unwrap { .. } => "unwrap",
            Call::WithdrawFromAuction { .. } => "withdraw_from_auction",
            Call::Release { .. } => "release",
            Call::ProcessState { .. } => "process_state",
            Call::AddTeller { .. } => "add_teller",
            Call::RemoveTeller { .. } => "remove_teller",
            Call::CreateProposal { .. } => "create_proposal",
            Call::PlaceVote { .. } => "place_vote",
            Call::ExecuteProposal { .. } => "execute_proposal",
            Call::Mint { .. } => "mint",
            Call::EnableCountry { .. } => "enable_country",
            Call::DisableCountry { .. } => "disable_country",
            Call::UpdateGlobalParams { .. } => "update_global_params",
            Call::SetCountryFloorPrice { .. } => "set_country_floor_price",
            Call::SetFreeClaim { .. } => "set_free_claim",
            Call::WithdrawDth { .. } => "withdraw_dth",
            Call::RenounceAdmin => "renounce_admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub version: u32,
    /// Must equal the sender's committed transaction count
    pub nonce: u64,
    pub call: Call,
    pub public_key: PublicKey,
    pub signature: SchnorrSignature,
}

impl SignedTransaction {
    pub fn sign(call: Call, nonce: u64, key: &PrivateKey) -> Result<Self, TransactionError> {
        let mut tx = Self {
            version: PROTOCOL_VERSION,
            nonce,
            call,
            public_key: key.public_key(),
            signature: SchnorrSignature([0u8; 64]),
        };
        tx.signature = key.sign(&tx.signing_hash()?)?;
        Ok(tx)
    }

    pub fn sender(&self) -> Address {
        self.public_key.address()
    }

    /// Hash covered by the signature
    pub fn signing_hash(&self) -> Result<Hash, TransactionError> {
        let call = bincode::serialize(&self.call).map_err(|e| TransactionError::Encoding(e.to_string()))?;
        Ok(hash_tagged(
            "dether:tx",
            &[&self.version.to_le_bytes(), &self.nonce.to_le_bytes(), &self.public_key.0, &call],
        ))
    }

    /// Transaction id, including the signature
    pub fn hash(&self) -> Result<Hash, TransactionError> {
        let signing = self.signing_hash()?;
        Ok(hash_tagged("dether:txid", &[&signing.0, &self.signature.0]))
    }

    /// Check version and signature; nonce is checked against state
    pub fn verify(&self) -> Result<(), TransactionError> {
        if self.version != PROTOCOL_VERSION {
            return Err(TransactionError::UnsupportedVersion(self.version));
        }
        if !self.public_key.verify(&self.signing_hash()?, &self.signature) {
            return Err(TransactionError::InvalidSignature);
        }
        Ok(())
    }

    /// Hex of the bincode encoding, as accepted by `sendrawtransaction`
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        let bytes = bincode::serialize(self).map_err(|e| TransactionError::Encoding(e.to_string()))?;
        Ok(hex::encode(bytes))
    }

    pub fn from_hex(raw: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(raw.trim()).map_err(|e| TransactionError::Encoding(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| TransactionError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DTH;

    fn transfer() -> Call {
        Call::Transfer { to: Address([7; 20]), amount: 5 * DTH, data: vec![0x43] }
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let key = PrivateKey::generate();
        let tx = SignedTransaction::sign(transfer(), 0, &key).unwrap();
        assert!(tx.verify().is_ok());
        assert_eq!(tx.sender(), key.public_key().address());
    }

    #[test]
    fn test_tampered_call_fails_verification() {
        let key = PrivateKey::generate();
        let mut tx = SignedTransaction::sign(transfer(), 0, &key).unwrap();
        tx.call = Call::Transfer { to: Address([8; 20]), amount: 5 * DTH, data: vec![0x43] };
        assert_eq!(tx.verify(), Err(TransactionError::InvalidSignature));
    }

    #[test]
    fn test_nonce_is_signed() {
        let key = PrivateKey::generate();
        let mut tx = SignedTransaction::sign(transfer(), 3, &key).unwrap();
        tx.nonce = 4;
        assert!(tx.verify().is_err());
    }

    #[test]
    fn test_hex_encoding() {
        let key = PrivateKey::generate();
        let tx = SignedTransaction::sign(Call::RenounceAdmin, 1, &key).unwrap();
        let decoded = SignedTransaction::from_hex(&tx.to_hex().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash().unwrap(), tx.hash().unwrap());

        assert!(SignedTransaction::from_hex("zz").is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let key = PrivateKey::generate();
        let mut tx = SignedTransaction::sign(Call::RenounceAdmin, 0, &key).unwrap();
        tx.version = 9;
        assert_eq!(tx.verify(), Err(TransactionError::UnsupportedVersion(9)));
    }
}
