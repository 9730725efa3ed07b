// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! ETH-equivalent value resolution
//!
//! A stablecoin swap rarely shows its ETH leg as `tx.value`: the router pulls
//! WETH instead. For every candidate whose ETH value is still unknown the
//! resolver tries, in order:
//!
//! 1. the native value of the enclosing transaction, if non-zero
//! 2. the sum of WETH `Transfer` logs in that transaction whose recipient is
//!    the candidate's router counterparty, if positive
//!
//! and otherwise leaves the candidate [`EthValue::Unresolved`]. A failed
//! lookup counts as "no signal" for its tier; it never aborts the batch.
//!
//! Lookups fan out with bounded concurrency. Results are written back in
//! input order once every lookup has finished, so the outcome never depends
//! on completion order and an interrupted run leaves the candidates untouched.

use alloy_primitives::{Address, U256};
use bigdecimal::{BigDecimal, Zero};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn, Instrument};

use crate::config::constants::{TRANSFER_TOPIC, WETH};
use crate::normalize::{native_value_to_eth, wei_to_eth};
use crate::sources::LogRecord;
use crate::tracing::spans;
use crate::types::address_set::RouterSet;
use crate::types::candidate::{Candidate, EthValue};

pub use crate::clients::{ReceiptLogLookup, TxValueLookup};

/// Which step produced a candidate's ETH value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    NativeValue,
    WethLogs,
}

/// Outcome counts of one [`ValueResolver::resolve_all`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Candidates that already carried an ETH value and were not looked up
    pub already_resolved: usize,
    pub from_native_value: usize,
    pub from_weth_logs: usize,
    pub unresolved: usize,
}

impl ResolutionStats {
    pub fn resolved(&self) -> usize {
        self.already_resolved + self.from_native_value + self.from_weth_logs
    }
}

/// Fills in missing ETH values from transaction data
pub struct ValueResolver<'a, L: ?Sized> {
    lookup: &'a L,
    routers: RouterSet,
    concurrency: usize,
}

impl<'a, L> ValueResolver<'a, L>
where
    L: TxValueLookup + ReceiptLogLookup + ?Sized,
{
    pub fn new(lookup: &'a L, routers: RouterSet) -> Self {
        Self {
            lookup,
            routers,
            concurrency: 1,
        }
    }

    /// Maximum number of candidates looked up at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// ETH value of one candidate; an already resolved value is returned as is
    /// without any lookup.
    pub async fn resolve_one(&self, candidate: &Candidate) -> EthValue {
        self.resolve_with_tier(candidate).await.0
    }

    async fn resolve_with_tier(&self, candidate: &Candidate) -> (EthValue, Option<Tier>) {
        if candidate.eth_value.is_resolved() {
            return (candidate.eth_value.clone(), None);
        }

        let span = spans::resolve_candidate(candidate.tx_hash);
        async move {
            if let Some(amount) = self.native_value(candidate).await {
                return (EthValue::Resolved(amount), Some(Tier::NativeValue));
            }

            let Some(router) = self.routers.counterparty(candidate) else {
                debug!("No router counterparty, leaving unresolved");
                return (EthValue::Unresolved, None);
            };

            match self.lookup.logs_for(candidate.tx_hash).await {
                Ok(logs) => {
                    let value = EthValue::from_amount(weth_inflow(&logs, router));
                    let tier = value.is_resolved().then_some(Tier::WethLogs);
                    (value, tier)
                }
                Err(e) => {
                    warn!(tx_hash = %candidate.tx_hash, error = %e, "Receipt lookup failed");
                    (EthValue::Unresolved, None)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Positive native value of the candidate's transaction, if any
    async fn native_value(&self, candidate: &Candidate) -> Option<BigDecimal> {
        let raw = match self.lookup.native_value(candidate.tx_hash).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(tx_hash = %candidate.tx_hash, error = %e, "Native value lookup failed");
                return None;
            }
        };

        match native_value_to_eth(&raw) {
            Ok(amount) if amount > BigDecimal::zero() => Some(amount),
            Ok(_) => None,
            Err(e) => {
                warn!(tx_hash = %candidate.tx_hash, error = %e, "Unparseable native value");
                None
            }
        }
    }

    /// Resolves every unresolved candidate in place.
    pub async fn resolve_all(&self, candidates: &mut [Candidate]) -> ResolutionStats {
        let mut stats = ResolutionStats::default();
        let pending: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                (!candidate.eth_value.is_resolved()).then_some(index)
            })
            .collect();
        stats.already_resolved = candidates.len() - pending.len();

        let span = spans::resolve_values(pending.len(), self.concurrency);
        let shared: &[Candidate] = candidates;
        let mut outcomes: Vec<(usize, EthValue, Option<Tier>)> = stream::iter(pending)
            .map(|index| async move {
                let (value, tier) = self.resolve_with_tier(&shared[index]).await;
                (index, value, tier)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .instrument(span)
            .await;

        outcomes.sort_by_key(|(index, _, _)| *index);
        for (index, value, tier) in outcomes {
            match tier {
                Some(Tier::NativeValue) => stats.from_native_value += 1,
                Some(Tier::WethLogs) => stats.from_weth_logs += 1,
                None => stats.unresolved += 1,
            }
            candidates[index].eth_value = value;
        }

        debug!(
            already_resolved = stats.already_resolved,
            from_native_value = stats.from_native_value,
            from_weth_logs = stats.from_weth_logs,
            unresolved = stats.unresolved,
            "Resolved candidate values"
        );

        stats
    }
}

/// Total WETH transferred into `router` by the given receipt logs, in ETH
///
/// Counts logs emitted by the WETH contract whose topic0 is exactly the
/// `Transfer` signature and whose indexed recipient is `router`. Logs with an
/// unreadable amount are skipped.
pub fn weth_inflow(logs: &[LogRecord], router: Address) -> BigDecimal {
    let mut total = U256::ZERO;

    for log in logs {
        if log.address != WETH || log.topics.len() < 3 || log.topics[0] != TRANSFER_TOPIC {
            continue;
        }
        let recipient = Address::from_word(log.topics[2]);
        if recipient != router {
            continue;
        }

        match parse_log_amount(&log.data) {
            Some(amount) => total = total.saturating_add(amount),
            None => warn!(data = %log.data, "Skipping WETH transfer with unreadable amount"),
        }
    }

    wei_to_eth(total)
}

fn parse_log_amount(data: &str) -> Option<U256> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    if digits.is_empty() || digits.len() > 64 {
        return None;
    }
    U256::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceFetchError;
    use crate::types::candidate::SourceKind;
    use crate::types::window::UnixTimestamp;
    use alloy_primitives::{address, TxHash, B256};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ROUTER: Address = address!("7a250d5630b4cf539739df2c5dacab4c659f2488");
    const USER: Address = address!("00000000000000000000000000000000000000a1");

    #[derive(Default)]
    struct FakeChain {
        values: HashMap<TxHash, String>,
        logs: HashMap<TxHash, Vec<LogRecord>>,
        failing: Vec<TxHash>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl TxValueLookup for FakeChain {
        async fn native_value(&self, tx_hash: TxHash) -> Result<Option<String>, SourceFetchError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&tx_hash) {
                return Err(SourceFetchError::transient("eth_getTransactionByHash", "timeout"));
            }
            Ok(self.values.get(&tx_hash).cloned())
        }
    }

    #[async_trait]
    impl ReceiptLogLookup for FakeChain {
        async fn logs_for(&self, tx_hash: TxHash) -> Result<Vec<LogRecord>, SourceFetchError> {
            if self.failing.contains(&tx_hash) {
                return Err(SourceFetchError::malformed("eth_getTransactionReceipt", "bad json"));
            }
            Ok(self.logs.get(&tx_hash).cloned().unwrap_or_default())
        }
    }

    fn hash(n: u8) -> TxHash {
        TxHash::with_last_byte(n)
    }

    fn topic(address: Address) -> B256 {
        address.into_word()
    }

    fn weth_log(to: Address, wei: u128) -> LogRecord {
        LogRecord {
            address: WETH,
            topics: vec![TRANSFER_TOPIC, topic(USER), topic(to)],
            data: format!("0x{wei:064x}"),
        }
    }

    fn usdc_out(n: u8) -> Candidate {
        Candidate {
            source_kind: SourceKind::TokenTransfer,
            tx_hash: hash(n),
            block_number: n as u64,
            timestamp: UnixTimestamp(0),
            from_addr: ROUTER,
            to_addr: USER,
            asset_value: BigDecimal::from(52_000),
            asset_symbol: "USDC".into(),
            eth_value: EthValue::Unresolved,
        }
    }

    fn eth(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    const FIVE_ETH: u128 = 5_000_000_000_000_000_000;

    #[test]
    fn weth_inflow_sums_transfers_into_router() {
        let logs = vec![
            weth_log(ROUTER, FIVE_ETH),
            weth_log(ROUTER, FIVE_ETH),
            weth_log(USER, FIVE_ETH),
        ];
        assert_eq!(weth_inflow(&logs, ROUTER), eth("10"));
    }

    #[test]
    fn weth_inflow_requires_full_transfer_topic() {
        let mut prefix_only = weth_log(ROUTER, FIVE_ETH);
        let mut bytes = TRANSFER_TOPIC.0;
        bytes[31] ^= 0xff;
        prefix_only.topics[0] = B256::from(bytes);

        let mut other_emitter = weth_log(ROUTER, FIVE_ETH);
        other_emitter.address = USER;

        let mut too_few_topics = weth_log(ROUTER, FIVE_ETH);
        too_few_topics.topics.truncate(1);

        let logs = vec![prefix_only, other_emitter, too_few_topics];
        assert_eq!(weth_inflow(&logs, ROUTER), eth("0"));
    }

    #[tokio::test]
    async fn native_value_wins_when_non_zero() {
        let mut chain = FakeChain::default();
        chain.values.insert(hash(1), "0xde0b6b3a7640000".into());
        chain.logs.insert(hash(1), vec![weth_log(ROUTER, FIVE_ETH)]);

        let resolver = ValueResolver::new(&chain, RouterSet::well_known());
        assert_eq!(resolver.resolve_one(&usdc_out(1)).await, EthValue::Resolved(eth("1")));
    }

    #[tokio::test]
    async fn zero_native_value_falls_back_to_weth_logs() {
        let mut chain = FakeChain::default();
        chain.values.insert(hash(1), "0x0".into());
        chain.logs.insert(hash(1), vec![weth_log(ROUTER, FIVE_ETH)]);

        let resolver = ValueResolver::new(&chain, RouterSet::well_known());
        assert_eq!(resolver.resolve_one(&usdc_out(1)).await, EthValue::Resolved(eth("5")));
    }

    #[tokio::test]
    async fn no_router_means_unresolved() {
        let mut chain = FakeChain::default();
        chain.logs.insert(hash(1), vec![weth_log(ROUTER, FIVE_ETH)]);
        let mut candidate = usdc_out(1);
        candidate.from_addr = USER;

        let resolver = ValueResolver::new(&chain, RouterSet::well_known());
        assert_eq!(resolver.resolve_one(&candidate).await, EthValue::Unresolved);
    }

    #[tokio::test]
    async fn failures_leave_single_candidate_unresolved() {
        let mut chain = FakeChain::default();
        chain.failing.push(hash(1));
        chain.values.insert(hash(2), "1000000000000000000".into());

        let resolver = ValueResolver::new(&chain, RouterSet::well_known()).with_concurrency(4);
        let mut candidates = vec![usdc_out(1), usdc_out(2)];
        let stats = resolver.resolve_all(&mut candidates).await;

        assert_eq!(candidates[0].eth_value, EthValue::Unresolved);
        assert_eq!(candidates[1].eth_value, EthValue::Resolved(eth("1")));
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.from_native_value, 1);
    }

    #[tokio::test]
    async fn resolved_candidates_are_not_looked_up() {
        let chain = FakeChain::default();
        let mut resolved = usdc_out(1);
        resolved.eth_value = EthValue::Resolved(eth("2"));

        let resolver = ValueResolver::new(&chain, RouterSet::well_known());
        let mut candidates = vec![resolved.clone()];
        let stats = resolver.resolve_all(&mut candidates).await;

        assert_eq!(chain.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(stats.already_resolved, 1);
        assert_eq!(candidates[0], resolved);
    }

    #[tokio::test]
    async fn unresolvable_candidate_stays_unresolved_on_repeat() {
        let chain = FakeChain::default();
        let resolver = ValueResolver::new(&chain, RouterSet::well_known());
        let mut candidates = vec![usdc_out(7)];

        resolver.resolve_all(&mut candidates).await;
        let first = candidates.clone();
        resolver.resolve_all(&mut candidates).await;

        assert_eq!(candidates, first);
        assert_eq!(candidates[0].eth_value, EthValue::Unresolved);
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        let mut chain = FakeChain::default();
        for n in 1..=20u8 {
            chain.values.insert(hash(n), format!("{}", n as u128 * 1_000_000_000_000_000_000));
        }

        let resolver = ValueResolver::new(&chain, RouterSet::well_known()).with_concurrency(8);
        let mut candidates: Vec<_> = (1..=20u8).map(usdc_out).collect();
        resolver.resolve_all(&mut candidates).await;

        for (i, candidate) in candidates.iter().enumerate() {
            assert_eq!(candidate.tx_hash, hash(i as u8 + 1));
            assert_eq!(candidate.eth_value, EthValue::Resolved(BigDecimal::from(i as u32 + 1)));
        }
    }
}
