//! Raw records as returned by the block explorer
//!
//! Field names follow the explorer's JSON (`timeStamp`, `blockNumber`, ...).
//! Numeric fields stay strings here; they are only interpreted when a record
//! is turned into a [`Candidate`](crate::Candidate).

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// One ERC-20 `Transfer` event from the `tokentx` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransferRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Amount in token minor units, decimal string
    pub value: String,
    pub time_stamp: String,
    pub block_number: String,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<String>,
}

/// One top-level transaction from the `txlist` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxRecord {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    /// Native value in wei, decimal string
    pub value: String,
    pub time_stamp: String,
    pub block_number: String,
    /// `"1"` when the transaction reverted
    #[serde(default)]
    pub is_error: String,
}

impl RawTxRecord {
    /// Whether the transaction reverted on chain
    pub fn reverted(&self) -> bool {
        self.is_error == "1"
    }
}

/// One log entry from a transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emitting contract
    pub address: Address,
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments, `0x` hex
    #[serde(default)]
    pub data: String,
}

/// Identity of a record across page boundaries
///
/// A record on a later page whose key was already accepted from an earlier
/// page is a repeat and is dropped. Keys may collide within one page (two
/// equal transfers inside one transaction); the paginator keeps each of them.
pub trait PageRecord {
    type Key: std::hash::Hash + Eq + Clone + Send;

    fn record_key(&self) -> Self::Key;
}

impl PageRecord for RawTransferRecord {
    type Key = (String, String);

    fn record_key(&self) -> Self::Key {
        // The log index identifies the event when present; otherwise equal
        // transfers of one transaction share a key and are told apart by
        // their multiplicity.
        let position = match &self.log_index {
            Some(index) => index.clone(),
            None => format!("{}:{}:{}", self.from, self.to, self.value).to_ascii_lowercase(),
        };
        (self.hash.to_ascii_lowercase(), position)
    }
}

impl PageRecord for RawTxRecord {
    type Key = String;

    fn record_key(&self) -> Self::Key {
        self.hash.to_ascii_lowercase()
    }
}
