// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! # txfinder
//!
//! Reconstructs the on-chain transactions whose ETH-equivalent value matches
//! a target amount, alone or split across several transactions.
//!
//! A search runs in phases:
//!
//! 1. the time window is resolved to a block range
//! 2. each [candidate source](sources) fetches its raw records, normalized
//!    into [`Candidate`]s
//! 3. the [filter pipeline](filter) drops blocklisted, router-less and
//!    out-of-window candidates
//! 4. the [resolver](resolve) recovers missing ETH values from native value
//!    or WETH log accounting
//! 5. the [matcher](matcher) reports every subset whose ETH values sum to the
//!    target within tolerance
//!
//! [`Finder`] drives the phases against any [`ChainDataClient`];
//! [`EtherscanClient`] is the bundled implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use txfinder::pipeline::{MatchSpec, RunControl, SearchRequest};
//! use txfinder::{EtherscanClient, Finder, FinderConfig, TimeWindow};
//!
//! # async fn example() -> Result<(), txfinder::FinderError> {
//! let config = FinderConfig::from_env()?;
//! let client = EtherscanClient::new(&config)?;
//! let finder = Finder::new(client, config);
//!
//! let window = TimeWindow::for_date(NaiveDate::from_ymd_opt(2025, 7, 10).unwrap());
//! let request = SearchRequest::swap(window, ["USDC", "USDT"])
//!     .require_router(true)
//!     .with_matching(MatchSpec::new("17.6".parse().unwrap(), "0.01".parse().unwrap(), 3));
//!
//! let report = finder.run(&request, &RunControl::new()).await?;
//! println!("{} matches", report.matches.len());
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod config;
pub mod errors;
pub mod filter;
pub mod history;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod sources;
mod tracing;
pub mod transport;
pub mod types;

pub use clients::{
    BlockResolver, ChainDataClient, EtherscanClient, EtherscanRequest, ReceiptLogLookup,
    RecentActivityLookup, TransactionFetcher, TransferFetcher, TxValueLookup,
};
pub use config::{FinderConfig, FinderConfigBuilder};
pub use errors::{ConfigurationError, FinderError, SourceFetchError, ValueError};
pub use filter::{CandidateFilterPipeline, FilterStage, ValueWindow};
pub use matcher::{CombinationMatcher, GroupKey};
pub use pipeline::{
    CancelHandle, Finder, FinderReport, Interruption, MatchSpec, Phase, RunControl, SearchMode,
    SearchRequest, SourceOutcome,
};
pub use resolve::{ResolutionStats, ValueResolver};
pub use types::address_set::{AddressBlockSet, RouterSet};
pub use types::candidate::{Candidate, EthValue, MatchResult, SourceKind};
pub use types::decimals::TokenDecimals;
pub use types::window::{BlockRange, TimeWindow, UnixTimestamp};
