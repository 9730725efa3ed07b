//! Search orchestration
//!
//! [`Finder::run`] drives one search through its phases:
//!
//! ```text
//! time window -> block range -> fetch (per source) -> filter -> resolve -> match
//! ```
//!
//! Search parameters are validated before the first request. A failing source
//! is recorded in the report and the remaining sources still contribute. A
//! [`RunControl`] can cancel the run or give it a deadline; the run then stops
//! at the current phase and the report carries everything up to the last
//! completed one.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use bigdecimal::BigDecimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::clients::ChainDataClient;
use crate::config::constants::{token_by_symbol, TokenSpec};
use crate::config::FinderConfig;
use crate::errors::{ConfigurationError, FinderError};
use crate::filter::{CandidateFilterPipeline, ValueWindow};
use crate::history::SenderHistoryFilter;
use crate::matcher::{CombinationMatcher, GroupKey};
use crate::resolve::{ResolutionStats, ValueResolver};
use crate::sources::{
    NativeTransactionSource, SourceCollector, TokenTransferSource, WethDepositSource,
    WethTransferSource,
};
use crate::tracing::spans;
use crate::types::address_set::{AddressBlockSet, RouterSet};
use crate::types::candidate::{Candidate, MatchResult, SourceKind};
use crate::types::window::{BlockRange, TimeWindow};

/// What a search scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Transfers of the given tokens (by registry symbol, e.g. `USDC`)
    Swap { tokens: Vec<String> },
    /// Native transactions of the watched addresses
    EthTransfer { addresses: Vec<Address> },
    /// Transactions wrapping ETH into WETH
    Deposit,
}

impl SearchMode {
    pub fn name(&self) -> &'static str {
        match self {
            SearchMode::Swap { .. } => "swap",
            SearchMode::EthTransfer { .. } => "eth_transfer",
            SearchMode::Deposit => "deposit",
        }
    }
}

/// Parameters of the combination search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpec {
    pub target_eth: BigDecimal,
    /// Absolute tolerance in ETH
    pub tolerance: BigDecimal,
    pub max_size: usize,
    pub group_by: GroupKey,
}

impl MatchSpec {
    pub fn new(target_eth: BigDecimal, tolerance: BigDecimal, max_size: usize) -> Self {
        Self {
            target_eth,
            tolerance,
            max_size,
            group_by: GroupKey::None,
        }
    }

    pub fn grouped_by(mut self, group_by: GroupKey) -> Self {
        self.group_by = group_by;
        self
    }

    fn matcher(&self) -> Result<CombinationMatcher, ConfigurationError> {
        Ok(CombinationMatcher::new(
            self.target_eth.clone(),
            self.tolerance.clone(),
            self.max_size,
        )?
        .grouped_by(self.group_by))
    }
}

/// One search: where to look, how to filter and what to match
///
/// # Examples
///
/// ```rust
/// use bigdecimal::BigDecimal;
/// use chrono::NaiveDate;
/// use txfinder::filter::ValueWindow;
/// use txfinder::pipeline::{MatchSpec, SearchRequest};
/// use txfinder::TimeWindow;
///
/// let window = TimeWindow::for_date(NaiveDate::from_ymd_opt(2025, 7, 10).unwrap());
/// let request = SearchRequest::swap(window, ["USDC", "USDT"])
///     .with_value_window(
///         ValueWindow::percent(BigDecimal::from(52_800), "0.02".parse().unwrap()).unwrap(),
///     )
///     .require_router(true)
///     .with_matching(MatchSpec::new("17.6".parse().unwrap(), "0.01".parse().unwrap(), 3));
/// assert_eq!(request.mode.name(), "swap");
/// ```
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub window: TimeWindow,
    pub mode: SearchMode,
    pub value_window: Option<ValueWindow>,
    pub blocklist: AddressBlockSet,
    pub require_router: bool,
    /// Drop candidates whose sender recently interacted with the blocklist
    pub sender_history: bool,
    pub matching: Option<MatchSpec>,
}

impl SearchRequest {
    fn with_mode(window: TimeWindow, mode: SearchMode) -> Self {
        Self {
            window,
            mode,
            value_window: None,
            blocklist: AddressBlockSet::new(),
            require_router: false,
            sender_history: false,
            matching: None,
        }
    }

    pub fn swap<I, S>(window: TimeWindow, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = tokens.into_iter().map(Into::into).collect();
        Self::with_mode(window, SearchMode::Swap { tokens })
    }

    pub fn eth_transfers(window: TimeWindow, addresses: Vec<Address>) -> Self {
        Self::with_mode(window, SearchMode::EthTransfer { addresses })
    }

    pub fn deposits(window: TimeWindow) -> Self {
        Self::with_mode(window, SearchMode::Deposit)
    }

    pub fn with_value_window(mut self, window: ValueWindow) -> Self {
        self.value_window = Some(window);
        self
    }

    pub fn with_blocklist(mut self, blocklist: AddressBlockSet) -> Self {
        self.blocklist = blocklist;
        self
    }

    pub fn require_router(mut self, require: bool) -> Self {
        self.require_router = require;
        self
    }

    pub fn with_sender_history(mut self, enabled: bool) -> Self {
        self.sender_history = enabled;
        self
    }

    pub fn with_matching(mut self, spec: MatchSpec) -> Self {
        self.matching = Some(spec);
        self
    }

    /// Token registry entries for a swap search.
    ///
    /// Unknown symbols are skipped with a warning; it is an error when none
    /// is known.
    fn tokens(&self) -> Result<Vec<TokenSpec>, ConfigurationError> {
        let SearchMode::Swap { tokens } = &self.mode else {
            return Ok(Vec::new());
        };

        let mut known = Vec::new();
        for symbol in tokens {
            match token_by_symbol(symbol) {
                Some(token) if !known.contains(&token) => known.push(token),
                Some(_) => {}
                None => warn!(symbol = %symbol, "Unknown token symbol, skipping"),
            }
        }

        if known.is_empty() {
            return Err(ConfigurationError::UnknownTokens {
                symbols: tokens.join(","),
            });
        }
        Ok(known)
    }

    /// Everything that can be checked without touching the network
    fn plan(&self) -> Result<SearchPlan, ConfigurationError> {
        let tokens = self.tokens()?;
        if let SearchMode::EthTransfer { addresses } = &self.mode {
            if addresses.is_empty() {
                return Err(ConfigurationError::invalid_parameter(
                    "addresses",
                    "an ETH transfer search needs at least one watched address",
                ));
            }
        }
        let matcher = self.matching.as_ref().map(MatchSpec::matcher).transpose()?;

        Ok(SearchPlan { tokens, matcher })
    }
}

struct SearchPlan {
    tokens: Vec<TokenSpec>,
    matcher: Option<CombinationMatcher>,
}

/// Phases of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BlockRange,
    Fetch,
    Filter,
    Resolve,
    Match,
}

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interruption {
    Cancelled,
    TimedOut,
}

/// Cancellation and deadline for one run
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use txfinder::pipeline::RunControl;
///
/// let control = RunControl::new().with_timeout(Duration::from_secs(600));
/// let handle = control.cancel_handle();
/// handle.cancel();
/// assert!(control.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct RunControl {
    deadline: Option<Instant>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            deadline: None,
            cancel: Arc::new(cancel),
        }
    }

    /// Stop the run once `timeout` has elapsed from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A handle that cancels this run from elsewhere (e.g. a Ctrl-C handler)
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: self.cancel.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn interruption(&self) -> Option<Interruption> {
        if self.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::TimedOut),
            _ => None,
        }
    }

    /// Runs `phase` unless the run is stopped before or while it executes.
    async fn guard<F: Future>(&self, phase: F) -> Result<F::Output, Interruption> {
        if let Some(reason) = self.interruption() {
            return Err(reason);
        }

        let mut cancelled = self.cancel.subscribe();
        let deadline = self.deadline;

        tokio::select! {
            biased;
            _ = async {
                if cancelled.wait_for(|c| *c).await.is_err() {
                    std::future::pending::<()>().await;
                }
            } => Err(Interruption::Cancelled),
            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => Err(Interruption::TimedOut),
            output = phase => Ok(output),
        }
    }
}

/// Cancels the [`RunControl`] it was taken from
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Result of fetching one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub kind: SourceKind,
    pub candidates: usize,
    pub malformed: usize,
    /// Set when the fetch failed; the source then contributed nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a run produced, up to the last completed phase
#[derive(Debug, Clone, Serialize)]
pub struct FinderReport {
    pub mode: &'static str,
    pub window: TimeWindow,
    pub block_range: Option<BlockRange>,
    pub sources: Vec<SourceOutcome>,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub malformed_records: usize,
    /// Candidates collected from all sources before filtering
    pub fetched: usize,
    /// Candidates as of the last completed phase: everything fetched after
    /// fetch, the survivors after filter, with ETH values after resolve
    pub candidates: Vec<Candidate>,
    pub resolution: Option<ResolutionStats>,
    pub matches: Vec<MatchResult>,
    pub completed_phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<Interruption>,
}

impl FinderReport {
    fn new(request: &SearchRequest) -> Self {
        Self {
            mode: request.mode.name(),
            window: request.window,
            block_range: None,
            sources: Vec::new(),
            sources_succeeded: 0,
            sources_failed: 0,
            malformed_records: 0,
            fetched: 0,
            candidates: Vec::new(),
            resolution: None,
            matches: Vec::new(),
            completed_phase: None,
            interrupted: None,
        }
    }

    fn interrupt(mut self, reason: Interruption) -> Self {
        warn!(
            reason = ?reason,
            completed_phase = ?self.completed_phase,
            "Run interrupted, reporting partial results"
        );
        self.interrupted = Some(reason);
        self
    }
}

/// Runs searches against one data client
pub struct Finder<C> {
    client: C,
    config: FinderConfig,
    routers: RouterSet,
}

impl<C: ChainDataClient> Finder<C> {
    pub fn new(client: C, config: FinderConfig) -> Self {
        Self {
            client,
            config,
            routers: RouterSet::well_known(),
        }
    }

    /// Replace the built-in router list
    pub fn with_routers(mut self, routers: RouterSet) -> Self {
        self.routers = routers;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Executes `request`.
    ///
    /// Fails before any request on invalid parameters, and when the block
    /// range cannot be resolved. Every later failure is local: it shows up in
    /// the report instead.
    pub async fn run(
        &self,
        request: &SearchRequest,
        control: &RunControl,
    ) -> Result<FinderReport, FinderError> {
        self.config.validate()?;
        let plan = request.plan()?;

        let span = spans::run_search(request.mode.name(), &request.window);
        self.execute(request, plan, control).instrument(span).await
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        plan: SearchPlan,
        control: &RunControl,
    ) -> Result<FinderReport, FinderError> {
        let mut report = FinderReport::new(request);

        let range = match control.guard(self.block_range(&request.window)).await {
            Ok(range) => range?,
            Err(reason) => return Ok(report.interrupt(reason)),
        };
        info!(start_block = range.start_block, end_block = range.end_block, "Resolved block range");
        report.block_range = Some(range);
        report.completed_phase = Some(Phase::BlockRange);

        let sources = self.sources(request, &plan);
        let fetched = match control.guard(self.fetch_all(&sources, &range)).await {
            Ok(fetched) => fetched,
            Err(reason) => return Ok(report.interrupt(reason)),
        };
        let (candidates, outcomes) = fetched;
        report.sources_succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        report.sources_failed = outcomes.len() - report.sources_succeeded;
        report.malformed_records = outcomes.iter().map(|o| o.malformed).sum();
        report.fetched = candidates.len();
        report.sources = outcomes;
        report.candidates = candidates;
        report.completed_phase = Some(Phase::Fetch);

        let filtering = control.guard(self.filter(request, &report.candidates)).await;
        let filtered = match filtering {
            Ok(filtered) => filtered,
            Err(reason) => return Ok(report.interrupt(reason)),
        };
        report.candidates = filtered;
        report.completed_phase = Some(Phase::Filter);

        let resolver = ValueResolver::new(&self.client, self.routers.clone())
            .with_concurrency(self.config.resolver_concurrency);
        let mut resolved = report.candidates.clone();
        let stats = match control.guard(resolver.resolve_all(&mut resolved)).await {
            Ok(stats) => stats,
            Err(reason) => return Ok(report.interrupt(reason)),
        };
        report.candidates = resolved;
        report.resolution = Some(stats);
        report.completed_phase = Some(Phase::Resolve);

        if let Some(reason) = control.interruption() {
            return Ok(report.interrupt(reason));
        }
        if let Some(matcher) = &plan.matcher {
            report.matches = matcher.find_matches(&report.candidates);
        }
        report.completed_phase = Some(Phase::Match);

        info!(
            sources_succeeded = report.sources_succeeded,
            sources_failed = report.sources_failed,
            candidates = report.candidates.len(),
            matches = report.matches.len(),
            "Search finished"
        );

        Ok(report)
    }

    /// Last block at or before the window start through the first block at or
    /// after its end
    async fn block_range(&self, window: &TimeWindow) -> Result<BlockRange, FinderError> {
        let span = spans::resolve_block_range(window);
        async {
            let start = self.client.block_at_or_before(window.start()).await?;
            let end = self.client.block_at_or_after(window.end()).await?;
            Ok::<_, FinderError>(BlockRange::new(start, end)?)
        }
        .instrument(span)
        .await
    }

    fn sources<'a>(
        &'a self,
        request: &SearchRequest,
        plan: &SearchPlan,
    ) -> Vec<Box<dyn SourceCollector + 'a>> {
        let client = &self.client;
        match &request.mode {
            SearchMode::Swap { .. } => plan
                .tokens
                .iter()
                .map(|token| -> Box<dyn SourceCollector + 'a> {
                    if token.is_weth() {
                        Box::new(WethTransferSource::new(client))
                    } else {
                        Box::new(TokenTransferSource::new(client, *token))
                    }
                })
                .collect(),
            SearchMode::EthTransfer { addresses } => addresses
                .iter()
                .map(|address| -> Box<dyn SourceCollector + 'a> {
                    Box::new(NativeTransactionSource::new(client, *address))
                })
                .collect(),
            SearchMode::Deposit => vec![Box::new(WethDepositSource::new(client))],
        }
    }

    /// Fetches every source in turn; a failure only discounts its own source.
    ///
    /// A transaction between two watched addresses is listed by both of their
    /// sources; it is kept once, at its first position.
    async fn fetch_all(
        &self,
        sources: &[Box<dyn SourceCollector + '_>],
        range: &BlockRange,
    ) -> (Vec<Candidate>, Vec<SourceOutcome>) {
        let mut candidates = Vec::new();
        let mut outcomes = Vec::with_capacity(sources.len());

        for source in sources {
            let label = source.label();
            let span = spans::collect_source(&label, range);
            let outcome = match source.collect(range).instrument(span).await {
                Ok(collected) => {
                    let outcome = SourceOutcome {
                        source: label,
                        kind: source.kind(),
                        candidates: collected.candidates.len(),
                        malformed: collected.malformed,
                        error: None,
                    };
                    candidates.extend(collected.candidates);
                    outcome
                }
                Err(e) => {
                    warn!(source = %label, error = %e, "Source failed, continuing without it");
                    SourceOutcome {
                        source: label,
                        kind: source.kind(),
                        candidates: 0,
                        malformed: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        (merge_shared_transactions(candidates), outcomes)
    }

    async fn filter(&self, request: &SearchRequest, candidates: &[Candidate]) -> Vec<Candidate> {
        let mut builder = CandidateFilterPipeline::builder();
        if !request.blocklist.is_empty() {
            builder = builder.blocklist(request.blocklist.clone());
        }
        if request.require_router {
            builder = builder.require_router(self.routers.clone());
        }
        if let Some(window) = &request.value_window {
            builder = builder.value_window(window.clone());
        }

        let filtered = builder.build().apply(candidates);

        if request.sender_history {
            SenderHistoryFilter::new(&self.client, &request.blocklist, self.config.mev_lookback)
                .retain(filtered)
                .await
        } else {
            filtered
        }
    }
}

/// Drops repeated transaction-level candidates, keeping the first of each hash.
///
/// Log-level candidates (token and WETH transfers) keep their multiplicity: one
/// transaction may legitimately emit several of them.
fn merge_shared_transactions(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let before = candidates.len();
    let mut seen: HashSet<TxHash> = HashSet::new();

    let merged: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| match candidate.source_kind {
            SourceKind::NativeTransaction | SourceKind::WethDeposit => {
                seen.insert(candidate.tx_hash)
            }
            SourceKind::TokenTransfer | SourceKind::WethTransfer => true,
        })
        .collect();

    if merged.len() < before {
        debug!(
            merged = before - merged.len(),
            "Merged transactions listed by several sources"
        );
    }
    merged
}
