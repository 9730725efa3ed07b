// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for txfinder integration tests
//!
//! Provides an in-memory implementation of every collaborator trait so that
//! whole searches run without a block explorer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, BlockNumber, TxHash, B256, U256};
use async_trait::async_trait;
use txfinder::config::constants::{TRANSFER_TOPIC, WETH};
use txfinder::sources::{LogRecord, RawTransferRecord, RawTxRecord};
use txfinder::{
    BlockRange, BlockResolver, ReceiptLogLookup, RecentActivityLookup, SourceFetchError,
    TransactionFetcher, TransferFetcher, TxValueLookup, UnixTimestamp,
};

/// Mock chain data for driving [`txfinder::Finder`]
///
/// # Example
///
/// ```rust,ignore
/// let chain = MockChain::new(100, 200)
///     .with_transfers(ETH_USDC, vec![transfer(1, SENDER, ROUTER, "52000000000")])
///     .with_native_value(tx_hash(1), "0x0");
/// let finder = Finder::new(chain, FinderConfig::default());
/// ```
#[derive(Default)]
pub struct MockChain {
    start_block: BlockNumber,
    end_block: BlockNumber,
    block_error: Option<SourceFetchError>,
    transfers: HashMap<Address, Result<Vec<RawTransferRecord>, SourceFetchError>>,
    transactions: HashMap<Address, Vec<RawTxRecord>>,
    native_values: HashMap<TxHash, String>,
    receipts: HashMap<TxHash, Vec<LogRecord>>,
    recent: HashMap<Address, Vec<RawTxRecord>>,
    fetch_delay: Option<Duration>,
    history_delay: Option<Duration>,
    requests: AtomicUsize,
    value_lookups: AtomicUsize,
    history_lookups: AtomicUsize,
}

impl MockChain {
    pub fn new(start_block: BlockNumber, end_block: BlockNumber) -> Self {
        Self {
            start_block,
            end_block,
            ..Default::default()
        }
    }

    pub fn with_block_error(mut self, error: SourceFetchError) -> Self {
        self.block_error = Some(error);
        self
    }

    pub fn with_transfers(mut self, token: Address, records: Vec<RawTransferRecord>) -> Self {
        self.transfers.insert(token, Ok(records));
        self
    }

    pub fn with_failing_transfers(mut self, token: Address, error: SourceFetchError) -> Self {
        self.transfers.insert(token, Err(error));
        self
    }

    pub fn with_transactions(mut self, address: Address, records: Vec<RawTxRecord>) -> Self {
        self.transactions.insert(address, records);
        self
    }

    pub fn with_native_value(mut self, hash: TxHash, value: &str) -> Self {
        self.native_values.insert(hash, value.to_string());
        self
    }

    pub fn with_receipt(mut self, hash: TxHash, logs: Vec<LogRecord>) -> Self {
        self.receipts.insert(hash, logs);
        self
    }

    pub fn with_recent(mut self, address: Address, records: Vec<RawTxRecord>) -> Self {
        self.recent.insert(address, records);
        self
    }

    /// Every list fetch sleeps this long before answering
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Every recent-activity lookup sleeps this long before answering
    pub fn with_history_delay(mut self, delay: Duration) -> Self {
        self.history_delay = Some(delay);
        self
    }

    /// Total number of calls made against this chain
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn value_lookups(&self) -> usize {
        self.value_lookups.load(Ordering::SeqCst)
    }

    pub fn history_lookups(&self) -> usize {
        self.history_lookups.load(Ordering::SeqCst)
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn delay(&self) {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BlockResolver for MockChain {
    async fn block_at_or_before(
        &self,
        _timestamp: UnixTimestamp,
    ) -> Result<BlockNumber, SourceFetchError> {
        self.record_request();
        match &self.block_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.start_block),
        }
    }

    async fn block_at_or_after(
        &self,
        _timestamp: UnixTimestamp,
    ) -> Result<BlockNumber, SourceFetchError> {
        self.record_request();
        match &self.block_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.end_block),
        }
    }
}

#[async_trait]
impl TransferFetcher for MockChain {
    async fn fetch_transfers(
        &self,
        token: Address,
        _range: &BlockRange,
    ) -> Result<Vec<RawTransferRecord>, SourceFetchError> {
        self.record_request();
        self.delay().await;
        self.transfers.get(&token).cloned().unwrap_or(Ok(Vec::new()))
    }
}

#[async_trait]
impl TransactionFetcher for MockChain {
    async fn fetch_transactions(
        &self,
        address: Address,
        _range: &BlockRange,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        self.record_request();
        self.delay().await;
        Ok(self.transactions.get(&address).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TxValueLookup for MockChain {
    async fn native_value(&self, tx_hash: TxHash) -> Result<Option<String>, SourceFetchError> {
        self.record_request();
        self.value_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.native_values.get(&tx_hash).cloned())
    }
}

#[async_trait]
impl ReceiptLogLookup for MockChain {
    async fn logs_for(&self, tx_hash: TxHash) -> Result<Vec<LogRecord>, SourceFetchError> {
        self.record_request();
        Ok(self.receipts.get(&tx_hash).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RecentActivityLookup for MockChain {
    async fn recent_transactions(
        &self,
        address: Address,
        count: usize,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        self.record_request();
        self.history_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.history_delay {
            tokio::time::sleep(delay).await;
        }
        let mut records = self.recent.get(&address).cloned().unwrap_or_default();
        records.truncate(count);
        Ok(records)
    }
}

/// Midday on 2025-07-10 UTC, inside the default test window
pub const TEST_TIMESTAMP: u64 = 1_752_148_800;

pub fn tx_hash(n: u8) -> TxHash {
    TxHash::with_last_byte(n)
}

fn hex(address: Address) -> String {
    format!("{address:#x}")
}

/// Token transfer `n` of `value` minor units
pub fn transfer(n: u8, from: Address, to: Address, value: &str) -> RawTransferRecord {
    RawTransferRecord {
        hash: format!("{:#x}", tx_hash(n)),
        from: hex(from),
        to: hex(to),
        value: value.to_string(),
        time_stamp: TEST_TIMESTAMP.to_string(),
        block_number: (150 + u64::from(n)).to_string(),
        contract_address: String::new(),
        token_symbol: String::new(),
        log_index: Some(n.to_string()),
    }
}

/// Top-level transaction `n` carrying `wei` of native value
pub fn transaction(n: u8, from: Address, to: Address, wei: &str) -> RawTxRecord {
    RawTxRecord {
        hash: format!("{:#x}", tx_hash(n)),
        from: hex(from),
        to: hex(to),
        value: wei.to_string(),
        time_stamp: TEST_TIMESTAMP.to_string(),
        block_number: (150 + u64::from(n)).to_string(),
        is_error: "0".to_string(),
    }
}

pub fn reverted(mut record: RawTxRecord) -> RawTxRecord {
    record.is_error = "1".to_string();
    record
}

/// WETH `Transfer` log moving `wei` from `from` to `to`
pub fn weth_transfer_log(from: Address, to: Address, wei: U256) -> LogRecord {
    LogRecord {
        address: WETH,
        topics: vec![TRANSFER_TOPIC, from.into_word(), to.into_word()],
        data: format!("{:#x}", B256::from(wei.to_be_bytes::<32>())),
    }
}

/// `eth` whole ETH expressed in wei
pub fn eth_in_wei(eth: u64) -> U256 {
    U256::from(eth) * U256::from(1_000_000_000_000_000_000u64)
}
