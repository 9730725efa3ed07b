//! Candidate sources
//!
//! A candidate source knows how to fetch one kind of raw record for a block
//! range and how to turn each record into a [`Candidate`]. Four sources exist:
//!
//! | Source | Records | `eth_value` |
//! |--------|---------|-------------|
//! | [`TokenTransferSource`] | `Transfer` logs of a non-ETH token | unresolved |
//! | [`NativeTransactionSource`] | transactions of a watched address | native value |
//! | [`WethTransferSource`] | `Transfer` logs of WETH | transfer amount |
//! | [`WethDepositSource`] | transactions into the WETH contract | native value |
//!
//! Pagination and de-duplication across pages belong to the fetcher (see
//! [`Paginator`]); a source receives one complete sequence per range.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::{SourceFetchError, ValueError};
use crate::normalize::{parse_address, parse_tx_hash, parse_u64};
use crate::types::candidate::{Candidate, SourceKind};
use crate::types::window::{BlockRange, UnixTimestamp};

mod native;
mod paginate;
mod records;
mod token;

pub use native::{NativeTransactionSource, WethDepositSource};
pub use paginate::Paginator;
pub use records::{LogRecord, PageRecord, RawTransferRecord, RawTxRecord};
pub use token::{TokenTransferSource, WethTransferSource};

/// A producer of candidates of one [`SourceKind`]
#[async_trait]
pub trait CandidateSource: Send + Sync {
    type Record: Send + Sync;

    fn kind(&self) -> SourceKind;

    /// Human-readable name used in logs and reports, e.g. `"USDC transfers"`
    fn label(&self) -> String;

    async fn fetch(&self, range: &BlockRange) -> Result<Vec<Self::Record>, SourceFetchError>;

    fn to_candidate(&self, record: &Self::Record) -> Result<Candidate, ValueError>;
}

/// Candidates normalized from one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedCandidates {
    pub candidates: Vec<Candidate>,
    /// Records dropped because a field failed to normalize
    pub malformed: usize,
}

/// Fetches `range` from `source` and normalizes every record.
///
/// Records that fail normalization are logged and counted, never fatal. A
/// fetch failure is returned as is so the caller can discount this source
/// alone.
pub async fn collect_candidates<S>(
    source: &S,
    range: &BlockRange,
) -> Result<CollectedCandidates, SourceFetchError>
where
    S: CandidateSource + ?Sized,
{
    let label = CandidateSource::label(source);
    let records = source.fetch(range).await?;
    let mut collected = CollectedCandidates {
        candidates: Vec::with_capacity(records.len()),
        malformed: 0,
    };

    for record in &records {
        match source.to_candidate(record) {
            Ok(candidate) => collected.candidates.push(candidate),
            Err(e) => {
                warn!(source = %label, error = %e, "Dropping malformed record");
                collected.malformed += 1;
            }
        }
    }

    info!(
        source = %label,
        kind = %CandidateSource::kind(source),
        records = records.len(),
        candidates = collected.candidates.len(),
        malformed = collected.malformed,
        "Collected candidates"
    );

    Ok(collected)
}

/// Object-safe view of a [`CandidateSource`], so sources with different
/// record types can be driven from one list.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn label(&self) -> String;

    async fn collect(&self, range: &BlockRange) -> Result<CollectedCandidates, SourceFetchError>;
}

#[async_trait]
impl<S: CandidateSource> SourceCollector for S {
    fn kind(&self) -> SourceKind {
        CandidateSource::kind(self)
    }

    fn label(&self) -> String {
        CandidateSource::label(self)
    }

    async fn collect(&self, range: &BlockRange) -> Result<CollectedCandidates, SourceFetchError> {
        collect_candidates(self, range).await
    }
}

/// Identity fields shared by every record shape
struct RecordHeader {
    tx_hash: alloy_primitives::TxHash,
    block_number: u64,
    timestamp: UnixTimestamp,
    from_addr: alloy_primitives::Address,
    to_addr: alloy_primitives::Address,
}

impl RecordHeader {
    fn parse(
        hash: &str,
        block_number: &str,
        time_stamp: &str,
        from: &str,
        to: &str,
    ) -> Result<Self, ValueError> {
        let timestamp = UnixTimestamp::from_u64(parse_u64("timeStamp", time_stamp)?)
            .ok_or_else(|| {
                ValueError::malformed("timeStamp", time_stamp, "out of the signed 64-bit range")
            })?;
        Ok(Self {
            tx_hash: parse_tx_hash(hash)?,
            block_number: parse_u64("blockNumber", block_number)?,
            timestamp,
            from_addr: parse_address("from", from)?,
            to_addr: parse_address("to", to)?,
        })
    }
}
