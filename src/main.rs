use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{bail, Context};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use txfinder::pipeline::{MatchSpec, RunControl, SearchRequest};
use txfinder::{
    AddressBlockSet, EtherscanClient, Finder, FinderConfig, FinderReport, GroupKey, TimeWindow,
    ValueWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stablecoin transfers that are the output leg of an ETH swap
    Swap,
    /// Native ETH transfers of the watched addresses
    Eth,
    /// ETH wrapped into WETH
    Deposit,
}

/// Find Ethereum transactions whose ETH value matches a target amount
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Search a single UTC day (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["start", "center"])]
    date: Option<NaiveDate>,

    /// First UTC day of the search (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with = "center")]
    start: Option<NaiveDate>,

    /// Last UTC day of the search, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Center of the search window (YYYY-MM-DDTHH:MM:SS, UTC)
    #[arg(long, requires = "hours")]
    center: Option<NaiveDateTime>,

    /// Width of the window around --center, in hours
    #[arg(long)]
    hours: Option<u32>,

    #[arg(long, value_enum, default_value_t = Mode::Swap)]
    mode: Mode,

    /// Token symbols scanned by a swap search
    #[arg(long, value_delimiter = ',', default_value = "USDC,USDT")]
    tokens: Vec<String>,

    /// Addresses watched by an ETH transfer search
    #[arg(long, value_delimiter = ',')]
    addresses: Vec<Address>,

    /// Target ETH amount
    #[arg(long, default_value = "17.6")]
    eth: BigDecimal,

    /// Absolute ETH tolerance for matching (and the value window of eth/deposit searches)
    #[arg(long = "abs-tol", default_value = "0.000001")]
    abs_tol: BigDecimal,

    /// Expected token amount of a swap search, e.g. 52800 (USDC)
    #[arg(long)]
    target: Option<BigDecimal>,

    /// Relative tolerance around --target, as a fraction (0.02 = 2%)
    #[arg(long = "pct-tol", default_value = "0.02")]
    pct_tol: BigDecimal,

    /// Largest number of transactions combined into one match
    #[arg(long = "max-combo", default_value_t = 3)]
    max_combo: usize,

    /// Only combine transactions sharing this key
    #[arg(long = "group-by", default_value = "none")]
    group_by: GroupKey,

    /// File of addresses to exclude (one per line or a JSON array)
    #[arg(long)]
    blocklist: Option<PathBuf>,

    /// Keep only transfers with a known DEX router on either side
    #[arg(long)]
    require_router: bool,

    /// Drop candidates whose sender recently dealt with a blocklisted address
    #[arg(long)]
    mev_check: bool,

    /// Abort the search after this many seconds, keeping partial results
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Where to write the JSON report
    #[arg(long, default_value = "results.json")]
    out: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn window(&self) -> anyhow::Result<TimeWindow> {
        if let Some(date) = self.date {
            return Ok(TimeWindow::for_date(date));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            return Ok(TimeWindow::between_dates(start, end)?);
        }
        if let (Some(center), Some(hours)) = (self.center, self.hours) {
            let center: DateTime<Utc> = center.and_utc();
            return Ok(TimeWindow::centered_on(center, hours)?);
        }
        bail!("specify --date, --start/--end or --center/--hours")
    }

    async fn request(&self) -> anyhow::Result<SearchRequest> {
        let window = self.window()?;

        let mut request = match self.mode {
            Mode::Swap => {
                let request = SearchRequest::swap(window, self.tokens.iter().cloned());
                match &self.target {
                    Some(target) => request
                        .with_value_window(ValueWindow::percent(target.clone(), self.pct_tol.clone())?),
                    None => {
                        warn!("No --target given, every transfer in the window will be resolved");
                        request
                    }
                }
            }
            Mode::Eth => SearchRequest::eth_transfers(window, self.addresses.clone())
                .with_value_window(ValueWindow::absolute(self.eth.clone(), self.abs_tol.clone())?),
            Mode::Deposit => SearchRequest::deposits(window)
                .with_value_window(ValueWindow::absolute(self.eth.clone(), self.abs_tol.clone())?),
        };

        if let Some(path) = &self.blocklist {
            let blocklist = AddressBlockSet::load(path).await?;
            info!(path = %path.display(), addresses = blocklist.len(), "Loaded blocklist");
            request = request.with_blocklist(blocklist);
        }
        if self.mev_check && request.blocklist.is_empty() {
            warn!("--mev-check has no effect without a --blocklist");
        }

        Ok(request
            .require_router(self.require_router)
            .with_sender_history(self.mev_check)
            .with_matching(
                MatchSpec::new(self.eth.clone(), self.abs_tol.clone(), self.max_combo)
                    .grouped_by(self.group_by),
            ))
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FinderConfig::from_env()?;
    let request = cli.request().await?;

    let client = EtherscanClient::new(&config)?;
    let finder = Finder::new(client, config);

    let mut control = RunControl::new();
    if let Some(secs) = cli.timeout_secs {
        control = control.with_timeout(Duration::from_secs(secs));
    }
    let cancel = control.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current phase");
            cancel.cancel();
        }
    });

    let report = finder.run(&request, &control).await?;
    summarize(&report);

    let json = serde_json::to_vec_pretty(&report)?;
    tokio::fs::write(&cli.out, json)
        .await
        .with_context(|| format!("writing report to {}", cli.out.display()))?;
    info!(path = %cli.out.display(), "Saved report");

    Ok(())
}

fn summarize(report: &FinderReport) {
    info!(
        sources_succeeded = report.sources_succeeded,
        sources_failed = report.sources_failed,
        malformed = report.malformed_records,
        fetched = report.fetched,
        candidates = report.candidates.len(),
        matches = report.matches.len(),
        "Search summary"
    );
    for source in report.sources.iter().filter(|s| !s.succeeded()) {
        warn!(source = %source.source, error = ?source.error, "Source failed");
    }
    if let Some(reason) = report.interrupted {
        warn!(reason = ?reason, completed_phase = ?report.completed_phase, "Partial results");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli).await {
        error!("txfinder error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
