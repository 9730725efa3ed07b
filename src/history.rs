//! Sender-history check
//!
//! A sender that recently traded with a known MEV bot or other blocked
//! address is more likely to be a bot itself. This optional stage runs after
//! the filter pipeline and drops candidates whose sender's last `lookback`
//! transactions touch the blocklist.
//!
//! Lookups are one explorer request per distinct sender. A failed lookup is
//! treated as "no evidence" and the candidate is kept.

use std::collections::HashMap;

use alloy_primitives::Address;
use tracing::{debug, warn, Instrument};

use crate::normalize::parse_address;
use crate::tracing::spans;
use crate::types::address_set::AddressBlockSet;
use crate::types::candidate::Candidate;

pub use crate::clients::RecentActivityLookup;

/// Whether any of `address`'s last `lookback` transactions has a blocked
/// sender or recipient.
///
/// Records whose addresses cannot be parsed are ignored. A lookup failure is
/// logged and reported as `false`.
pub async fn has_recent_blocked_activity<L>(
    lookup: &L,
    address: Address,
    blocklist: &AddressBlockSet,
    lookback: usize,
) -> bool
where
    L: RecentActivityLookup + ?Sized,
{
    let transactions = match lookup.recent_transactions(address, lookback).await {
        Ok(transactions) => transactions,
        Err(e) => {
            warn!(address = %address, error = %e, "Recent activity lookup failed, keeping sender");
            return false;
        }
    };

    transactions.iter().take(lookback).any(|tx| {
        [("from", tx.from.as_str()), ("to", tx.to.as_str())]
            .into_iter()
            .filter_map(|(field, raw)| parse_address(field, raw).ok())
            .any(|party| blocklist.contains(&party))
    })
}

/// Post-filter stage dropping candidates whose sender recently interacted
/// with a blocked address
pub struct SenderHistoryFilter<'a, L: ?Sized> {
    lookup: &'a L,
    blocklist: &'a AddressBlockSet,
    lookback: usize,
}

impl<'a, L> SenderHistoryFilter<'a, L>
where
    L: RecentActivityLookup + ?Sized,
{
    pub fn new(lookup: &'a L, blocklist: &'a AddressBlockSet, lookback: usize) -> Self {
        Self {
            lookup,
            blocklist,
            lookback,
        }
    }

    /// Keeps the candidates whose sender shows no recent blocked activity,
    /// preserving order. Each distinct sender is looked up once.
    pub async fn retain(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.lookback == 0 || self.blocklist.is_empty() {
            return candidates;
        }

        let mut senders: Vec<Address> = Vec::new();
        for candidate in &candidates {
            if !senders.contains(&candidate.from_addr) {
                senders.push(candidate.from_addr);
            }
        }

        let span = spans::sender_history(senders.len(), self.lookback);
        let flagged = async {
            let mut flagged: HashMap<Address, bool> = HashMap::with_capacity(senders.len());
            for sender in senders {
                let suspicious = has_recent_blocked_activity(
                    self.lookup,
                    sender,
                    self.blocklist,
                    self.lookback,
                )
                .instrument(spans::check_sender(sender))
                .await;
                if suspicious {
                    debug!(sender = %sender, "Sender has recent blocked activity");
                }
                flagged.insert(sender, suspicious);
            }
            flagged
        }
        .instrument(span)
        .await;

        let before = candidates.len();
        let kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !flagged.get(&c.from_addr).copied().unwrap_or(false))
            .collect();

        debug!(
            input = before,
            kept = kept.len(),
            "Applied sender history check"
        );

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceFetchError;
    use crate::sources::RawTxRecord;
    use crate::types::candidate::{EthValue, SourceKind};
    use crate::types::window::UnixTimestamp;
    use alloy_primitives::{address, TxHash};
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::sync::Mutex;

    const BOT: Address = address!("00000000000000000000000000000000000000b0");

    struct History {
        by_address: HashMap<Address, Vec<RawTxRecord>>,
        failing: Option<Address>,
        requests: Mutex<Vec<(Address, usize)>>,
    }

    #[async_trait]
    impl RecentActivityLookup for History {
        async fn recent_transactions(
            &self,
            address: Address,
            count: usize,
        ) -> Result<Vec<RawTxRecord>, SourceFetchError> {
            self.requests.lock().unwrap().push((address, count));
            if self.failing == Some(address) {
                return Err(SourceFetchError::transient("txlist", "connection reset"));
            }
            Ok(self.by_address.get(&address).cloned().unwrap_or_default())
        }
    }

    fn tx(from: Address, to: Address) -> RawTxRecord {
        RawTxRecord {
            hash: format!("{:#x}", TxHash::ZERO),
            from: format!("{from:#x}"),
            to: format!("{to:#x}"),
            value: "0".into(),
            time_stamp: "0".into(),
            block_number: "0".into(),
            is_error: String::new(),
        }
    }

    fn candidate(from: Address) -> Candidate {
        Candidate {
            source_kind: SourceKind::NativeTransaction,
            tx_hash: TxHash::ZERO,
            block_number: 0,
            timestamp: UnixTimestamp(0),
            from_addr: from,
            to_addr: Address::ZERO,
            asset_value: BigDecimal::from(1),
            asset_symbol: "ETH".into(),
            eth_value: EthValue::Resolved(BigDecimal::from(1)),
        }
    }

    fn blocklist() -> AddressBlockSet {
        [BOT].into_iter().collect()
    }

    #[tokio::test]
    async fn detects_blocked_counterparty() {
        let alice = Address::with_last_byte(1);
        let history = History {
            by_address: HashMap::from([(alice, vec![tx(alice, Address::ZERO), tx(BOT, alice)])]),
            failing: None,
            requests: Mutex::new(Vec::new()),
        };

        assert!(has_recent_blocked_activity(&history, alice, &blocklist(), 10).await);
        assert_eq!(history.requests.lock().unwrap()[0], (alice, 10));
    }

    #[tokio::test]
    async fn only_looks_at_the_lookback_window() {
        let alice = Address::with_last_byte(1);
        let history = History {
            by_address: HashMap::from([(alice, vec![tx(alice, Address::ZERO), tx(BOT, alice)])]),
            failing: None,
            requests: Mutex::new(Vec::new()),
        };

        assert!(!has_recent_blocked_activity(&history, alice, &blocklist(), 1).await);
    }

    #[tokio::test]
    async fn lookup_failure_keeps_candidate() {
        let alice = Address::with_last_byte(1);
        let history = History {
            by_address: HashMap::new(),
            failing: Some(alice),
            requests: Mutex::new(Vec::new()),
        };

        let blocklist = blocklist();
        let filter = SenderHistoryFilter::new(&history, &blocklist, 10);
        let kept = filter.retain(vec![candidate(alice)]).await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn retain_drops_flagged_senders_and_queries_each_once() {
        let alice = Address::with_last_byte(1);
        let bob = Address::with_last_byte(2);
        let history = History {
            by_address: HashMap::from([(bob, vec![tx(bob, BOT)])]),
            failing: None,
            requests: Mutex::new(Vec::new()),
        };
        let blocklist = blocklist();
        let filter = SenderHistoryFilter::new(&history, &blocklist, 10);

        let kept = filter
            .retain(vec![candidate(alice), candidate(bob), candidate(alice)])
            .await;

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|c| c.from_addr == alice));
        assert_eq!(history.requests.lock().unwrap().len(), 2);
    }
}
