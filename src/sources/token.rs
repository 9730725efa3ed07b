//! Sources backed by ERC-20 `Transfer` events

use async_trait::async_trait;

use super::{CandidateSource, RawTransferRecord, RecordHeader};
use crate::clients::TransferFetcher;
use crate::config::constants::{TokenSpec, WETH};
use crate::errors::{SourceFetchError, ValueError};
use crate::normalize::normalize;
use crate::types::candidate::{Candidate, EthValue, SourceKind};
use crate::types::decimals::TokenDecimals;
use crate::types::window::BlockRange;

/// Transfers of a token whose value is not ETH-denominated (USDC, DAI, ...)
///
/// Candidates leave this source with `eth_value` unresolved; the resolver
/// recovers the ETH leg of the swap later.
pub struct TokenTransferSource<'a, F: ?Sized> {
    fetcher: &'a F,
    token: TokenSpec,
}

impl<'a, F: TransferFetcher + ?Sized> TokenTransferSource<'a, F> {
    pub fn new(fetcher: &'a F, token: TokenSpec) -> Self {
        Self { fetcher, token }
    }

    pub fn token(&self) -> &TokenSpec {
        &self.token
    }
}

#[async_trait]
impl<'a, F: TransferFetcher + ?Sized> CandidateSource for TokenTransferSource<'a, F> {
    type Record = RawTransferRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::TokenTransfer
    }

    fn label(&self) -> String {
        format!("{} transfers", self.token.symbol)
    }

    async fn fetch(&self, range: &BlockRange) -> Result<Vec<RawTransferRecord>, SourceFetchError> {
        self.fetcher.fetch_transfers(self.token.address, range).await
    }

    fn to_candidate(&self, record: &RawTransferRecord) -> Result<Candidate, ValueError> {
        transfer_candidate(
            record,
            SourceKind::TokenTransfer,
            self.token.symbol,
            self.token.decimals,
        )
    }
}

/// Transfers of WETH; the transferred amount is the ETH value
pub struct WethTransferSource<'a, F: ?Sized> {
    fetcher: &'a F,
}

impl<'a, F: TransferFetcher + ?Sized> WethTransferSource<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl<'a, F: TransferFetcher + ?Sized> CandidateSource for WethTransferSource<'a, F> {
    type Record = RawTransferRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::WethTransfer
    }

    fn label(&self) -> String {
        "WETH transfers".to_string()
    }

    async fn fetch(&self, range: &BlockRange) -> Result<Vec<RawTransferRecord>, SourceFetchError> {
        self.fetcher.fetch_transfers(WETH, range).await
    }

    fn to_candidate(&self, record: &RawTransferRecord) -> Result<Candidate, ValueError> {
        let mut candidate = transfer_candidate(
            record,
            SourceKind::WethTransfer,
            "WETH",
            TokenDecimals::STANDARD,
        )?;
        candidate.eth_value = EthValue::from_amount(candidate.asset_value.clone());
        Ok(candidate)
    }
}

fn transfer_candidate(
    record: &RawTransferRecord,
    kind: SourceKind,
    symbol: &str,
    decimals: TokenDecimals,
) -> Result<Candidate, ValueError> {
    let header = RecordHeader::parse(
        &record.hash,
        &record.block_number,
        &record.time_stamp,
        &record.from,
        &record.to,
    )?;

    Ok(Candidate {
        source_kind: kind,
        tx_hash: header.tx_hash,
        block_number: header.block_number,
        timestamp: header.timestamp,
        from_addr: header.from_addr,
        to_addr: header.to_addr,
        asset_value: normalize(&record.value, decimals)?,
        asset_symbol: symbol.to_string(),
        eth_value: EthValue::Unresolved,
    })
}
