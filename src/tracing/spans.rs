//! Span creation helpers for txfinder operations.
//!
//! Each instrumented operation has a matching helper here instead of an
//! `#[instrument]` attribute on the operation itself, keeping telemetry out of
//! the business logic.
//!
//! Usage pattern:
//! ```rust,ignore
//! pub async fn my_operation(&self, param: Type) -> Result<T> {
//!     let span = spans::my_operation(param_value);
//!     async move {
//!         // Business logic here
//!     }
//!     .instrument(span)
//!     .await
//! }
//! ```

use alloy_primitives::{Address, TxHash};
use tracing::{Level, Span};

use crate::types::window::{BlockRange, TimeWindow};

/// Create span for a complete search run.
///
/// Parent: None (root span for this operation)
/// Children: resolve_block_range, collect_source, resolve_values, find_matches
#[inline]
pub(crate) fn run_search(mode: &str, window: &TimeWindow) -> Span {
    tracing::span!(
        Level::INFO,
        "txfinder.run_search",
        mode = mode,
        start_ts = window.start().0,
        end_ts = window.end().0,
    )
}

/// Create span for turning the time window into a block range.
///
/// Parent: run_search span
/// Children: explorer requests
#[inline]
pub(crate) fn resolve_block_range(window: &TimeWindow) -> Span {
    tracing::debug_span!(
        "txfinder.resolve_block_range",
        start_ts = window.start().0,
        end_ts = window.end().0,
    )
}

/// Create span for fetching and normalizing one candidate source.
///
/// Parent: run_search span
/// Children: paginated explorer requests
#[inline]
pub(crate) fn collect_source(label: &str, range: &BlockRange) -> Span {
    tracing::info_span!(
        "txfinder.collect_source",
        source = label,
        start_block = range.start_block,
        end_block = range.end_block,
    )
}

/// Create span for the value resolution fan-out.
///
/// Parent: run_search span
/// Children: resolve_candidate spans (one per unresolved candidate)
#[inline]
pub(crate) fn resolve_values(pending: usize, concurrency: usize) -> Span {
    tracing::info_span!(
        "txfinder.resolve_values",
        pending = pending,
        concurrency = concurrency,
    )
}

/// Create span for resolving the ETH value of one candidate.
///
/// Parent: resolve_values span
#[inline]
pub(crate) fn resolve_candidate(tx_hash: TxHash) -> Span {
    tracing::trace_span!("txfinder.resolve_candidate", tx_hash = %tx_hash)
}

/// Create span for the sender-history check.
///
/// Parent: run_search span
#[inline]
pub(crate) fn sender_history(senders: usize, lookback: usize) -> Span {
    tracing::debug_span!(
        "txfinder.sender_history",
        senders = senders,
        lookback = lookback,
    )
}

/// Create span for checking the recent activity of one sender.
///
/// Parent: sender_history span
#[inline]
pub(crate) fn check_sender(sender: Address) -> Span {
    tracing::trace_span!("txfinder.check_sender", sender = %sender)
}

/// Create span for the combination search.
///
/// Parent: run_search span
#[inline]
pub(crate) fn find_matches(candidates: usize, max_size: usize) -> Span {
    tracing::debug_span!(
        "txfinder.find_matches",
        candidates = candidates,
        max_size = max_size,
    )
}
