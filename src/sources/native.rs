//! Sources backed by top-level transactions and their native value

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::debug;

use super::{CandidateSource, RawTxRecord, RecordHeader};
use crate::clients::TransactionFetcher;
use crate::config::constants::WETH;
use crate::errors::{SourceFetchError, ValueError};
use crate::normalize::{normalize, parse_address};
use crate::types::candidate::{Candidate, EthValue, SourceKind};
use crate::types::decimals::TokenDecimals;
use crate::types::window::BlockRange;

/// Transactions sent from or to one watched address
///
/// Reverted transactions moved no value and are skipped at fetch time.
pub struct NativeTransactionSource<'a, F: ?Sized> {
    fetcher: &'a F,
    address: Address,
}

impl<'a, F: TransactionFetcher + ?Sized> NativeTransactionSource<'a, F> {
    pub fn new(fetcher: &'a F, address: Address) -> Self {
        Self { fetcher, address }
    }
}

#[async_trait]
impl<'a, F: TransactionFetcher + ?Sized> CandidateSource for NativeTransactionSource<'a, F> {
    type Record = RawTxRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::NativeTransaction
    }

    fn label(&self) -> String {
        format!("transactions of {:#x}", self.address)
    }

    async fn fetch(&self, range: &BlockRange) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        let records = self.fetcher.fetch_transactions(self.address, range).await?;
        Ok(drop_reverted(records))
    }

    fn to_candidate(&self, record: &RawTxRecord) -> Result<Candidate, ValueError> {
        native_candidate(record, SourceKind::NativeTransaction, "ETH")
    }
}

/// Transactions that wrap ETH by sending it to the WETH contract
pub struct WethDepositSource<'a, F: ?Sized> {
    fetcher: &'a F,
}

impl<'a, F: TransactionFetcher + ?Sized> WethDepositSource<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl<'a, F: TransactionFetcher + ?Sized> CandidateSource for WethDepositSource<'a, F> {
    type Record = RawTxRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::WethDeposit
    }

    fn label(&self) -> String {
        "WETH deposits".to_string()
    }

    async fn fetch(&self, range: &BlockRange) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        let records = self.fetcher.fetch_transactions(WETH, range).await?;
        let total = records.len();
        // The account listing also contains withdrawals and transactions that
        // merely mention WETH; only calls into the contract wrap ETH.
        let deposits: Vec<RawTxRecord> = drop_reverted(records)
            .into_iter()
            .filter(|tx| parse_address("to", &tx.to).is_ok_and(|to| to == WETH))
            .collect();
        debug!(total = total, deposits = deposits.len(), "Selected WETH deposits");
        Ok(deposits)
    }

    fn to_candidate(&self, record: &RawTxRecord) -> Result<Candidate, ValueError> {
        native_candidate(record, SourceKind::WethDeposit, "ETH")
    }
}

fn drop_reverted(records: Vec<RawTxRecord>) -> Vec<RawTxRecord> {
    let total = records.len();
    let kept: Vec<RawTxRecord> = records.into_iter().filter(|tx| !tx.reverted()).collect();
    if kept.len() < total {
        debug!(reverted = total - kept.len(), "Skipped reverted transactions");
    }
    kept
}

fn native_candidate(
    record: &RawTxRecord,
    kind: SourceKind,
    symbol: &str,
) -> Result<Candidate, ValueError> {
    let header = RecordHeader::parse(
        &record.hash,
        &record.block_number,
        &record.time_stamp,
        &record.from,
        &record.to,
    )?;
    let amount = normalize(&record.value, TokenDecimals::STANDARD)?;

    Ok(Candidate {
        source_kind: kind,
        tx_hash: header.tx_hash,
        block_number: header.block_number,
        timestamp: header.timestamp,
        from_addr: header.from_addr,
        to_addr: header.to_addr,
        eth_value: EthValue::from_amount(amount.clone()),
        asset_value: amount,
        asset_symbol: symbol.to_string(),
    })
}
