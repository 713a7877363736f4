use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod error;
pub mod ledger;
pub mod pow;

pub use error::LedgerError;
pub use ledger::{validate_chain, Ledger, PeerChain};

/// A transfer between two identities. Nothing here is signed or balance-checked;
/// a transaction is just a tuple waiting to be embedded in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
}

/// One entry in the chain. Field names are wire-fixed: every node hashes the
/// same JSON keys, so renaming any of them breaks cross-node validation.
/// Blocks are never mutated after being appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

/// SHA-256 hex digest over the canonical JSON form of a block.
///
/// Serialization goes through `serde_json::Value`, whose object map keeps keys
/// sorted, so the digest does not depend on field declaration or insertion
/// order. This is the serialization every peer must reproduce byte-for-byte.
pub fn canonical_hash(block: &Block) -> String {
    let value = serde_json::to_value(block).expect("block fields are always representable as JSON");
    let canonical = serde_json::to_string(&value).expect("JSON value serialization is infallible");
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

pub(crate) fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}
