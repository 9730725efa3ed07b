//! Configuration for txfinder runs
//!
//! Everything that used to be ambient process state (API key, endpoint,
//! request spacing) lives in an explicit [`FinderConfig`] handed to the
//! collaborators at construction.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use txfinder::FinderConfig;
//!
//! // 210ms between explorer requests, 10 000 records per page
//! let config = FinderConfig::default();
//! assert_eq!(config.page_size, 10_000);
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust
//! use txfinder::FinderConfigBuilder;
//! use std::time::Duration;
//!
//! let config = FinderConfigBuilder::new()
//!     .api_key("my-key")
//!     .rate_limit_delay(Duration::from_millis(500))
//!     .resolver_concurrency(2)
//!     .build();
//! ```

use std::time::Duration;

use alloy_chains::NamedChain;

use crate::errors::ConfigurationError;
use crate::transport::RetryConfig;

pub mod constants;

/// Etherscan's multichain endpoint
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Keeps free-tier Etherscan keys under 5 requests per second
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(210);

/// Largest page the explorer returns for list endpoints
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Configuration for txfinder runs
///
/// Use [`FinderConfigBuilder`] for a fluent API to construct instances.
#[derive(Clone)]
pub struct FinderConfig {
    /// Block explorer API key
    pub api_key: Option<String>,

    /// Block explorer endpoint
    /// Default: [`DEFAULT_API_URL`]
    pub api_url: String,

    /// Chain queried through the explorer
    /// Default: Ethereum mainnet
    pub chain: NamedChain,

    /// Minimum delay between any two explorer requests, process-wide
    /// Default: 210ms
    pub rate_limit_delay: Duration,

    /// Timeout for single-object lookups (block numbers, tx values, receipts)
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Timeout for paginated list requests
    /// Default: 60 seconds
    pub list_timeout: Duration,

    /// Records requested per page; a shorter page ends pagination
    /// Default: 10 000
    pub page_size: usize,

    /// Maximum in-flight lookups during value resolution
    /// Default: 4
    pub resolver_concurrency: usize,

    /// Retry policy for transient explorer failures
    pub retry: RetryConfig,

    /// How many recent transactions of a sender the history check inspects
    /// Default: 10
    pub mev_lookback: usize,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("chain", &self.chain)
            .field("rate_limit_delay", &self.rate_limit_delay)
            .field("request_timeout", &self.request_timeout)
            .field("list_timeout", &self.list_timeout)
            .field("page_size", &self.page_size)
            .field("resolver_concurrency", &self.resolver_concurrency)
            .field("retry", &self.retry)
            .field("mev_lookback", &self.mev_lookback)
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            chain: NamedChain::Mainnet,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            request_timeout: Duration::from_secs(30),
            list_timeout: Duration::from_secs(60),
            page_size: DEFAULT_PAGE_SIZE,
            resolver_concurrency: 4,
            retry: RetryConfig::default(),
            mev_lookback: 10,
        }
    }
}

impl FinderConfig {
    /// Environment variable holding the explorer API key
    pub const ENV_API_KEY: &'static str = "ETHERSCAN_API_KEY";
    /// Environment variable overriding the explorer endpoint
    pub const ENV_API_URL: &'static str = "ETHERSCAN_API_URL";
    /// Environment variable overriding the request spacing, in milliseconds
    pub const ENV_RATE_LIMIT_MS: &'static str = "TXFINDER_RATE_LIMIT_MS";
    /// Environment variable overriding the resolver concurrency
    pub const ENV_CONCURRENCY: &'static str = "TXFINDER_CONCURRENCY";

    /// Builds a config from the process environment on top of the defaults.
    ///
    /// The API key is required; the other variables are optional overrides.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let api_key = lookup(Self::ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigurationError::environment(Self::ENV_API_KEY, "not set"))?;
        config.api_key = Some(api_key);

        if let Some(url) = lookup(Self::ENV_API_URL) {
            config.api_url = url;
        }

        if let Some(raw) = lookup(Self::ENV_RATE_LIMIT_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                ConfigurationError::environment(Self::ENV_RATE_LIMIT_MS, "expected milliseconds")
            })?;
            config.rate_limit_delay = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(Self::ENV_CONCURRENCY) {
            let n: usize = raw.trim().parse().map_err(|_| {
                ConfigurationError::environment(Self::ENV_CONCURRENCY, "expected a positive integer")
            })?;
            config.resolver_concurrency = n;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would stall or spin a run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.page_size == 0 {
            return Err(ConfigurationError::invalid_parameter(
                "page_size",
                "must be greater than 0",
            ));
        }
        if self.resolver_concurrency == 0 {
            return Err(ConfigurationError::invalid_parameter(
                "resolver_concurrency",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Numeric chain id sent with every explorer request
    pub fn chain_id(&self) -> u64 {
        self.chain as u64
    }
}

/// Builder for [`FinderConfig`]
///
/// # Example
///
/// ```rust
/// use txfinder::FinderConfigBuilder;
///
/// let config = FinderConfigBuilder::new()
///     .page_size(1_000)
///     .mev_lookback(25)
///     .build();
/// assert_eq!(config.page_size, 1_000);
/// ```
#[derive(Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn chain(mut self, chain: NamedChain) -> Self {
        self.config.chain = chain;
        self
    }

    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.config.rate_limit_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn list_timeout(mut self, timeout: Duration) -> Self {
        self.config.list_timeout = timeout;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn resolver_concurrency(mut self, concurrency: usize) -> Self {
        self.config.resolver_concurrency = concurrency;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn mev_lookback(mut self, lookback: usize) -> Self {
        self.config.mev_lookback = lookback;
        self
    }

    pub fn build(self) -> FinderConfig {
        self.config
    }
}
