//! External data collaborators
//!
//! The engine never talks to the network directly. Each capability it needs
//! is a small async trait; [`EtherscanClient`] implements all of them over the
//! Etherscan HTTP API and tests substitute in-memory doubles.
//!
//! Every method fails with [`SourceFetchError`]. Transient failures have
//! already been retried by the time they reach the caller.

use alloy_primitives::{Address, BlockNumber, TxHash};
use async_trait::async_trait;

use crate::errors::SourceFetchError;
use crate::sources::{LogRecord, RawTransferRecord, RawTxRecord};
use crate::types::window::{BlockRange, UnixTimestamp};

mod etherscan;

pub use etherscan::{EtherscanClient, EtherscanRequest};

/// Maps timestamps to block numbers
#[async_trait]
pub trait BlockResolver: Send + Sync {
    /// Last block mined at or before `timestamp`
    async fn block_at_or_before(&self, timestamp: UnixTimestamp)
        -> Result<BlockNumber, SourceFetchError>;

    /// First block mined at or after `timestamp`
    async fn block_at_or_after(&self, timestamp: UnixTimestamp)
        -> Result<BlockNumber, SourceFetchError>;
}

/// Fetches ERC-20 transfer events of one token
///
/// Implementations paginate internally and never return the same event twice.
#[async_trait]
pub trait TransferFetcher: Send + Sync {
    async fn fetch_transfers(
        &self,
        token: Address,
        range: &BlockRange,
    ) -> Result<Vec<RawTransferRecord>, SourceFetchError>;
}

/// Fetches top-level transactions sent from or to an address
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    async fn fetch_transactions(
        &self,
        address: Address,
        range: &BlockRange,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError>;
}

/// Looks up the native value attached to a transaction
#[async_trait]
pub trait TxValueLookup: Send + Sync {
    /// Raw native value (hex or decimal wei), `None` when the transaction is
    /// unknown or carries no value field
    async fn native_value(&self, tx_hash: TxHash) -> Result<Option<String>, SourceFetchError>;
}

/// Looks up the logs emitted by a transaction
#[async_trait]
pub trait ReceiptLogLookup: Send + Sync {
    async fn logs_for(&self, tx_hash: TxHash) -> Result<Vec<LogRecord>, SourceFetchError>;
}

/// Returns the most recent transactions of an address, newest first
#[async_trait]
pub trait RecentActivityLookup: Send + Sync {
    async fn recent_transactions(
        &self,
        address: Address,
        count: usize,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError>;
}

/// Everything a full search needs from the outside world
pub trait ChainDataClient:
    BlockResolver
    + TransferFetcher
    + TransactionFetcher
    + TxValueLookup
    + ReceiptLogLookup
    + RecentActivityLookup
{
}

impl<T> ChainDataClient for T where
    T: BlockResolver
        + TransferFetcher
        + TransactionFetcher
        + TxValueLookup
        + ReceiptLogLookup
        + RecentActivityLookup
{
}
