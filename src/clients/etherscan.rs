// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Etherscan-backed implementation of the data collaborators
//!
//! Requests go through a small Tower stack:
//!
//! ```text
//! RetryService -> RateLimitService -> EtherscanHttp (reqwest)
//! ```
//!
//! The HTTP service classifies every failure into a [`SourceFetchError`] so
//! the retry layer only repeats what may succeed on a second attempt
//! (connection problems, timeouts, HTTP 5xx/429 and the API's own
//! "rate limit" replies). Every clone of an [`EtherscanClient`] shares one
//! request schedule.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use alloy_primitives::{Address, BlockNumber, TxHash};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{Layer, ServiceExt};
use tracing::debug;
use url::Url;

use super::{
    BlockResolver, ReceiptLogLookup, RecentActivityLookup, TransactionFetcher, TransferFetcher,
    TxValueLookup,
};
use crate::config::FinderConfig;
use crate::errors::{ConfigurationError, FinderError, SourceFetchError};
use crate::normalize::parse_u64;
use crate::sources::{LogRecord, Paginator, RawTransferRecord, RawTxRecord};
use crate::transport::{RateLimitLayer, RateLimitService, RetryLayer, RetryService};
use crate::types::window::{BlockRange, UnixTimestamp};

/// Messages the API uses for an empty result set
const EMPTY_RESULT_MESSAGES: [&str; 2] = ["No transactions found", "No records found"];

/// One API call: module/action plus query parameters
#[derive(Debug, Clone)]
pub struct EtherscanRequest {
    operation: String,
    params: Vec<(&'static str, String)>,
    timeout: Option<Duration>,
}

impl EtherscanRequest {
    pub fn new(module: &str, action: &str) -> Self {
        Self {
            operation: action.to_string(),
            params: vec![("module", module.to_string()), ("action", action.to_string())],
            timeout: None,
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Short description used in errors and logs, e.g. `tokentx page 2`
    pub fn operation(&self) -> &str {
        &self.operation
    }

    fn describe(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }
}

/// Innermost service: one HTTP GET, classified into the result payload or a
/// [`SourceFetchError`]
#[derive(Clone)]
struct EtherscanHttp {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Arc<str>,
    chain_id: u64,
}

impl tower::Service<EtherscanRequest> for EtherscanHttp {
    type Response = Value;
    type Error = SourceFetchError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, SourceFetchError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: EtherscanRequest) -> Self::Future {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let chain_id = self.chain_id;

        Box::pin(async move {
            let operation = request.operation.clone();
            let mut builder = http
                .get(endpoint)
                .query(&[("chainid", chain_id.to_string())])
                .query(&request.params)
                .query(&[("apikey", &*api_key)]);
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| classify_transport_error(&operation, e))?;

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(SourceFetchError::transient(&operation, format!("HTTP {status}")));
            }
            if !status.is_success() {
                return Err(SourceFetchError::rejected(&operation, format!("HTTP {status}")));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| classify_transport_error(&operation, e))?;

            interpret_body(&operation, body)
        })
    }
}

fn classify_transport_error(operation: &str, error: reqwest::Error) -> SourceFetchError {
    if error.is_decode() {
        SourceFetchError::malformed(operation, format!("invalid JSON body: {error}"))
    } else {
        SourceFetchError::transient(operation, error.to_string())
    }
}

fn is_rate_limit(message: &str) -> bool {
    message.to_ascii_lowercase().contains("rate limit")
}

/// Unwraps the API envelope.
///
/// Account and block endpoints answer `{status, message, result}`; proxy
/// endpoints answer JSON-RPC style `{result}` or `{error}`.
fn interpret_body(operation: &str, body: Value) -> Result<Value, SourceFetchError> {
    if let Some(status) = body.get("status").and_then(Value::as_str) {
        let message = body.get("message").and_then(Value::as_str).unwrap_or_default();
        let result = body.get("result").cloned().unwrap_or(Value::Null);

        if status == "1" {
            return Ok(result);
        }
        if EMPTY_RESULT_MESSAGES.iter().any(|m| message.starts_with(m)) {
            return Ok(Value::Array(Vec::new()));
        }

        let detail = result
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(message)
            .to_string();
        if is_rate_limit(&detail) || is_rate_limit(message) {
            return Err(SourceFetchError::transient(operation, detail));
        }
        return Err(SourceFetchError::rejected(operation, detail));
    }

    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        if is_rate_limit(&message) {
            return Err(SourceFetchError::transient(operation, message));
        }
        return Err(SourceFetchError::rejected(operation, message));
    }

    match body {
        Value::Object(mut fields) => fields
            .remove("result")
            .ok_or_else(|| SourceFetchError::malformed(operation, "response has no result field")),
        other => Err(SourceFetchError::malformed(
            operation,
            format!("expected a JSON object, got {other}"),
        )),
    }
}

type ServiceStack = RetryService<RateLimitService<EtherscanHttp>>;

/// Etherscan API client implementing every collaborator trait
///
/// Cheap to clone; clones share the rate limit schedule.
///
/// # Examples
///
/// ```rust,no_run
/// use txfinder::{EtherscanClient, FinderConfig};
///
/// # fn main() -> Result<(), txfinder::FinderError> {
/// let config = FinderConfig::from_env()?;
/// let client = EtherscanClient::new(&config)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EtherscanClient {
    service: ServiceStack,
    page_size: usize,
    request_timeout: Duration,
    list_timeout: Duration,
}

impl fmt::Debug for EtherscanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtherscanClient")
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("list_timeout", &self.list_timeout)
            .finish_non_exhaustive()
    }
}

impl EtherscanClient {
    /// Builds a client from `config` with a default HTTP client.
    pub fn new(config: &FinderConfig) -> Result<Self, FinderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigurationError::invalid_parameter("http_client", e.to_string()))?;
        Self::with_http_client(config, http)
    }

    /// Builds a client from `config` around an existing HTTP client.
    pub fn with_http_client(config: &FinderConfig, http: reqwest::Client) -> Result<Self, FinderError> {
        config.validate()?;
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SourceFetchError::MissingApiKey)?;
        let endpoint = Url::parse(&config.api_url).map_err(|e| {
            ConfigurationError::invalid_parameter("api_url", format!("{}: {e}", config.api_url))
        })?;

        let http = EtherscanHttp {
            http,
            endpoint,
            api_key: Arc::from(api_key),
            chain_id: config.chain_id(),
        };
        let rate_limited = RateLimitLayer::with_min_delay(config.rate_limit_delay).layer(http);
        let service = RetryLayer::new(config.retry.clone()).layer(rate_limited);

        Ok(Self {
            service,
            page_size: config.page_size,
            request_timeout: config.request_timeout,
            list_timeout: config.list_timeout,
        })
    }

    /// Sends one request through the retry and rate limit layers and returns
    /// the `result` payload.
    pub async fn call(&self, request: EtherscanRequest) -> Result<Value, SourceFetchError> {
        debug!(operation = %request.operation(), "Explorer request");
        self.service.clone().oneshot(request).await
    }

    async fn call_list<R: DeserializeOwned>(
        &self,
        request: EtherscanRequest,
    ) -> Result<Vec<R>, SourceFetchError> {
        let operation = request.operation().to_string();
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| {
            SourceFetchError::malformed(operation, format!("unexpected list shape: {e}"))
        })
    }

    async fn block_by_time(
        &self,
        timestamp: UnixTimestamp,
        closest: &str,
    ) -> Result<BlockNumber, SourceFetchError> {
        let request = EtherscanRequest::new("block", "getblocknobytime")
            .param("timestamp", timestamp.as_u64())
            .param("closest", closest)
            .timeout(self.request_timeout);
        let operation = request.operation().to_string();

        let value = self.call(request).await?;
        let raw = value.as_str().ok_or_else(|| {
            SourceFetchError::malformed(&operation, format!("expected a block number, got {value}"))
        })?;
        parse_u64("blockNumber", raw)
            .map_err(|e| SourceFetchError::malformed(&operation, e.to_string()))
    }

    /// Paginated `account` listing in ascending order over `range`
    async fn paginated<R>(
        &self,
        action: &str,
        target: (&'static str, Address),
        range: &BlockRange,
    ) -> Result<Vec<R>, SourceFetchError>
    where
        R: DeserializeOwned + crate::sources::PageRecord + Send,
    {
        let page_size = self.page_size;

        Paginator::new(page_size, |page: u32| {
            let request = EtherscanRequest::new("account", action)
                .param(target.0, format!("{:#x}", target.1))
                .param("startblock", range.start_block)
                .param("endblock", range.end_block)
                .param("page", page)
                .param("offset", page_size)
                .param("sort", "asc")
                .timeout(self.list_timeout)
                .describe(format!("{action} page {page}"));
            async move { self.call_list::<R>(request).await }
        })
        .collect_all()
        .await
    }
}

#[async_trait]
impl BlockResolver for EtherscanClient {
    async fn block_at_or_before(
        &self,
        timestamp: UnixTimestamp,
    ) -> Result<BlockNumber, SourceFetchError> {
        self.block_by_time(timestamp, "before").await
    }

    async fn block_at_or_after(
        &self,
        timestamp: UnixTimestamp,
    ) -> Result<BlockNumber, SourceFetchError> {
        self.block_by_time(timestamp, "after").await
    }
}

#[async_trait]
impl TransferFetcher for EtherscanClient {
    async fn fetch_transfers(
        &self,
        token: Address,
        range: &BlockRange,
    ) -> Result<Vec<RawTransferRecord>, SourceFetchError> {
        self.paginated("tokentx", ("contractaddress", token), range).await
    }
}

#[async_trait]
impl TransactionFetcher for EtherscanClient {
    async fn fetch_transactions(
        &self,
        address: Address,
        range: &BlockRange,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        self.paginated("txlist", ("address", address), range).await
    }
}

#[async_trait]
impl TxValueLookup for EtherscanClient {
    async fn native_value(&self, tx_hash: TxHash) -> Result<Option<String>, SourceFetchError> {
        let request = EtherscanRequest::new("proxy", "eth_getTransactionByHash")
            .param("txhash", format!("{tx_hash:#x}"))
            .timeout(self.request_timeout);
        let operation = request.operation().to_string();

        match self.call(request).await? {
            Value::Null => Ok(None),
            Value::Object(tx) => Ok(tx.get("value").and_then(Value::as_str).map(str::to_string)),
            other => Err(SourceFetchError::malformed(
                operation,
                format!("expected a transaction object, got {other}"),
            )),
        }
    }
}

#[async_trait]
impl ReceiptLogLookup for EtherscanClient {
    async fn logs_for(&self, tx_hash: TxHash) -> Result<Vec<LogRecord>, SourceFetchError> {
        let request = EtherscanRequest::new("proxy", "eth_getTransactionReceipt")
            .param("txhash", format!("{tx_hash:#x}"))
            .timeout(self.list_timeout);
        let operation = request.operation().to_string();

        match self.call(request).await? {
            Value::Null => Ok(Vec::new()),
            Value::Object(mut receipt) => {
                let logs = receipt.remove("logs").unwrap_or(Value::Array(Vec::new()));
                serde_json::from_value(logs).map_err(|e| {
                    SourceFetchError::malformed(operation, format!("unexpected log shape: {e}"))
                })
            }
            other => Err(SourceFetchError::malformed(
                operation,
                format!("expected a receipt object, got {other}"),
            )),
        }
    }
}

#[async_trait]
impl RecentActivityLookup for EtherscanClient {
    async fn recent_transactions(
        &self,
        address: Address,
        count: usize,
    ) -> Result<Vec<RawTxRecord>, SourceFetchError> {
        let request = EtherscanRequest::new("account", "txlist")
            .param("address", format!("{address:#x}"))
            .param("page", 1)
            .param("offset", count.max(1))
            .param("sort", "desc")
            .timeout(self.list_timeout)
            .describe("recent txlist");
        self.call_list(request).await
    }
}
