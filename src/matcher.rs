//! Combination matching
//!
//! Searches every subset of up to `max_size` value-resolved candidates for
//! sums within `tolerance` of the target. The search is exhaustive on purpose:
//! `max_size` is small and every matching combination is reported for human
//! review, including overlapping ones.
//!
//! Results come out in enumeration order: by group (in order of first
//! appearance), then by subset size, then in lexicographic index order.
//!
//! # Examples
//!
//! ```rust
//! use bigdecimal::BigDecimal;
//! use txfinder::matcher::{CombinationMatcher, GroupKey};
//!
//! let matcher = CombinationMatcher::new(BigDecimal::from(10), BigDecimal::from(0), 3)
//!     .unwrap()
//!     .grouped_by(GroupKey::Sender);
//! assert_eq!(matcher.max_size(), 3);
//! ```

use alloy_primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use tracing::debug;

use crate::errors::ConfigurationError;
use crate::tracing::spans;
use crate::types::candidate::{Candidate, MatchResult};

/// How candidates are partitioned before the search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// One group holding every candidate
    #[default]
    None,
    /// Group by `from_addr`
    Sender,
    /// Group by `to_addr`
    Recipient,
}

impl GroupKey {
    fn key_of(&self, candidate: &Candidate) -> Option<Address> {
        match self {
            GroupKey::None => None,
            GroupKey::Sender => Some(candidate.from_addr),
            GroupKey::Recipient => Some(candidate.to_addr),
        }
    }
}

impl std::str::FromStr for GroupKey {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(GroupKey::None),
            "sender" | "from" => Ok(GroupKey::Sender),
            "recipient" | "to" => Ok(GroupKey::Recipient),
            other => Err(ConfigurationError::invalid_parameter(
                "group_by",
                format!("unknown grouping {other:?}, expected none, sender or recipient"),
            )),
        }
    }
}

/// Exhaustive subset-sum search over ETH values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationMatcher {
    target: BigDecimal,
    tolerance: BigDecimal,
    max_size: usize,
    group_key: GroupKey,
}

impl CombinationMatcher {
    /// Rejects a non-positive target, a negative tolerance or `max_size == 0`.
    pub fn new(
        target: BigDecimal,
        tolerance: BigDecimal,
        max_size: usize,
    ) -> Result<Self, ConfigurationError> {
        if target <= BigDecimal::zero() {
            return Err(ConfigurationError::invalid_parameter(
                "target",
                format!("must be > 0, got {target}"),
            ));
        }
        if tolerance < BigDecimal::zero() {
            return Err(ConfigurationError::invalid_parameter(
                "tolerance",
                format!("must be >= 0, got {tolerance}"),
            ));
        }
        if max_size == 0 {
            return Err(ConfigurationError::invalid_parameter(
                "max_size",
                "combination size must be at least 1",
            ));
        }

        Ok(Self {
            target,
            tolerance,
            max_size,
            group_key: GroupKey::None,
        })
    }

    pub fn grouped_by(mut self, group_key: GroupKey) -> Self {
        self.group_key = group_key;
        self
    }

    pub fn target(&self) -> &BigDecimal {
        &self.target
    }

    pub fn tolerance(&self) -> &BigDecimal {
        &self.tolerance
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn group_key(&self) -> GroupKey {
        self.group_key
    }

    /// Every subset of resolved candidates whose ETH values sum to the target
    /// within tolerance. Unresolved candidates take no part.
    pub fn find_matches(&self, candidates: &[Candidate]) -> Vec<MatchResult> {
        let span = spans::find_matches(candidates.len(), self.max_size);
        let _guard = span.enter();

        let mut matches = Vec::new();
        let mut evaluated = 0usize;

        for (group_key, members) in self.partition(candidates) {
            let n = members.len();
            for size in 1..=self.max_size.min(n) {
                for indices in Combinations::new(n, size) {
                    evaluated += 1;
                    let total: BigDecimal = indices.iter().map(|&i| members[i].1).sum();
                    if (&total - &self.target).abs() <= self.tolerance {
                        matches.push(MatchResult {
                            total_eth_value: total,
                            member_tx_hashes: indices
                                .iter()
                                .map(|&i| members[i].0.tx_hash)
                                .collect(),
                            group_key,
                        });
                    }
                }
            }
        }

        debug!(
            evaluated = evaluated,
            matches = matches.len(),
            "Combination search finished"
        );

        matches
    }

    /// Resolved candidates split into groups, in order of first appearance
    fn partition<'c>(
        &self,
        candidates: &'c [Candidate],
    ) -> Vec<(Option<Address>, Vec<(&'c Candidate, &'c BigDecimal)>)> {
        let mut groups: Vec<(Option<Address>, Vec<(&'c Candidate, &'c BigDecimal)>)> = Vec::new();

        for candidate in candidates {
            let Some(value) = candidate.eth_value.amount() else {
                continue;
            };
            let key = self.group_key.key_of(candidate);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push((candidate, value)),
                None => groups.push((key, vec![(candidate, value)])),
            }
        }

        groups
    }
}

/// Index combinations of `size` out of `n`, in lexicographic order
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    finished: bool,
}

impl Combinations {
    fn new(n: usize, size: usize) -> Self {
        Self {
            n,
            indices: (0..size).collect(),
            started: false,
            finished: size == 0 || size > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let size = self.indices.len();
        // rightmost position that can still move forward
        let mut i = size;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - size + i {
                self.indices[i] += 1;
                for j in i + 1..size {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.indices.clone());
            }
        }

        self.finished = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::candidate::{EthValue, SourceKind};
    use crate::types::window::UnixTimestamp;
    use alloy_primitives::TxHash;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn candidate(n: u8, from: u8, eth: Option<&str>) -> Candidate {
        Candidate {
            source_kind: SourceKind::WethTransfer,
            tx_hash: TxHash::with_last_byte(n),
            block_number: n as u64,
            timestamp: UnixTimestamp(n as i64),
            from_addr: Address::with_last_byte(from),
            to_addr: Address::ZERO,
            asset_value: eth.map(dec).unwrap_or_default(),
            asset_symbol: "WETH".into(),
            eth_value: eth.map_or(EthValue::Unresolved, |v| EthValue::Resolved(dec(v))),
        }
    }

    fn members(result: &MatchResult) -> Vec<u8> {
        result.member_tx_hashes.iter().map(|h| h.0[31]).collect()
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all: Vec<_> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(5, 3).count(), 10);
        assert_eq!(Combinations::new(3, 3).count(), 1);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }

    #[test]
    fn finds_exactly_the_matching_subsets() {
        let candidates = vec![
            candidate(1, 1, Some("5.0")),
            candidate(2, 1, Some("5.0")),
            candidate(3, 1, Some("3.0")),
            candidate(4, 1, Some("2.0")),
        ];
        let matcher = CombinationMatcher::new(dec("10.0"), dec("0.0"), 3).unwrap();

        let found: Vec<_> = matcher.find_matches(&candidates).iter().map(members).collect();
        assert_eq!(found, vec![vec![1, 2], vec![1, 3, 4], vec![2, 3, 4]]);
    }

    #[test]
    fn respects_max_size() {
        let candidates = vec![
            candidate(1, 1, Some("5.0")),
            candidate(2, 1, Some("3.0")),
            candidate(3, 1, Some("2.0")),
        ];
        let matcher = CombinationMatcher::new(dec("10.0"), dec("0"), 2).unwrap();
        assert!(matcher.find_matches(&candidates).is_empty());
    }

    #[test]
    fn tolerance_is_inclusive() {
        let candidates = vec![candidate(1, 1, Some("17.5")), candidate(2, 1, Some("17.7"))];
        let matcher = CombinationMatcher::new(dec("17.6"), dec("0.1"), 1).unwrap();
        assert_eq!(matcher.find_matches(&candidates).len(), 2);
    }

    #[test]
    fn unresolved_candidates_are_skipped() {
        let candidates = vec![
            candidate(1, 1, None),
            candidate(2, 1, Some("10")),
        ];
        let matcher = CombinationMatcher::new(dec("10"), dec("0"), 2).unwrap();

        let found = matcher.find_matches(&candidates);
        assert_eq!(found.len(), 1);
        assert_eq!(members(&found[0]), vec![2]);
        assert_eq!(found[0].total_eth_value, dec("10"));
    }

    #[test]
    fn grouping_keeps_subsets_within_one_sender() {
        let candidates = vec![
            candidate(1, 2, Some("4")),
            candidate(2, 1, Some("6")),
            candidate(3, 2, Some("6")),
            candidate(4, 1, Some("4")),
        ];
        let matcher = CombinationMatcher::new(dec("10"), dec("0"), 2)
            .unwrap()
            .grouped_by(GroupKey::Sender);

        let found = matcher.find_matches(&candidates);
        assert_eq!(found.len(), 2);
        // sender 2 appears first
        assert_eq!(found[0].group_key, Some(Address::with_last_byte(2)));
        assert_eq!(members(&found[0]), vec![1, 3]);
        assert_eq!(found[1].group_key, Some(Address::with_last_byte(1)));
        assert_eq!(members(&found[1]), vec![2, 4]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(CombinationMatcher::new(dec("10"), dec("-0.1"), 3).is_err());
        assert!(CombinationMatcher::new(dec("10"), dec("0"), 0).is_err());
        assert!(CombinationMatcher::new(dec("0"), dec("0"), 1).is_err());
    }

    #[test]
    fn group_key_parses_aliases() {
        assert_eq!("sender".parse::<GroupKey>().unwrap(), GroupKey::Sender);
        assert_eq!("TO".parse::<GroupKey>().unwrap(), GroupKey::Recipient);
        assert!("wallet".parse::<GroupKey>().is_err());
    }
}
