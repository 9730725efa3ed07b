// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transport layer utilities for the block explorer client.
//!
//! Tower middleware wrapped around the raw HTTP service:
//!
//! - [`RateLimitLayer`] spaces requests by a fixed minimum delay shared by
//!   every clone of the client
//! - [`RetryLayer`] retries transient failures with exponential backoff
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use txfinder::transport::{RateLimitLayer, RetryConfig, RetryLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(RetryLayer::new(RetryConfig::default()))
//!     .layer(RateLimitLayer::with_min_delay(Duration::from_millis(210)))
//!     .service(http);
//! ```
//!
//! Retry wraps the rate limiter so every retried attempt also waits for its
//! own slot.

mod rate_limit;
mod retry;

pub use rate_limit::{RateLimitLayer, RateLimitService};
pub use retry::{RetryConfig, RetryLayer, RetryService};
