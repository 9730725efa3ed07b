// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower-based request spacing for the block explorer client.
//!
//! This module implements a fixed minimum delay between consecutive requests
//! as a Tower `Layer`. Every clone of a layer (and of the services it wraps)
//! shares one schedule, so the ceiling holds process-wide whether calls are
//! made sequentially or from a concurrent fan-out.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tower::Layer;

/// A Tower layer that spaces requests at least `min_delay` apart.
///
/// Unlike a token bucket there is no burst allowance: the n-th request is
/// released no earlier than `(n - 1) * min_delay` after the first.
///
/// # Example
///
/// ```rust
/// use txfinder::transport::RateLimitLayer;
/// use std::time::Duration;
///
/// // At least 210ms between requests (just under 5 req/s)
/// let layer = RateLimitLayer::with_min_delay(Duration::from_millis(210));
/// assert_eq!(layer.min_delay(), Duration::from_millis(210));
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    state: Arc<Mutex<RateLimitState>>,
    min_delay: Duration,
}

impl RateLimitLayer {
    /// Creates a layer with a minimum delay between requests.
    pub fn with_min_delay(min_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState::new(min_delay))),
            min_delay,
        }
    }

    /// The configured spacing between requests.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            service,
            state: self.state.clone(),
        }
    }
}

/// Shared request schedule.
#[derive(Debug)]
struct RateLimitState {
    min_delay: Duration,
    /// Earliest instant the next request may be released
    next_slot: Option<Instant>,
}

impl RateLimitState {
    fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: None,
        }
    }

    /// Reserve the next free slot, returning how long the caller must wait.
    fn reserve(&mut self, now: Instant) -> Option<Duration> {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + self.min_delay);

        let wait = slot.saturating_duration_since(now);
        (!wait.is_zero()).then_some(wait)
    }
}

/// A Tower service that delays each request until its reserved slot.
#[derive(Clone, Debug)]
pub struct RateLimitService<S> {
    service: S,
    state: Arc<Mutex<RateLimitState>>,
}

impl<S, Request> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request> + Clone + Send + 'static,
    S::Future: Send,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let state = self.state.clone();
        let mut service = self.service.clone();

        Box::pin(async move {
            // Reserve under the lock, sleep outside it so other callers can queue up
            let wait = state.lock().await.reserve(Instant::now());
            if let Some(duration) = wait {
                tokio::time::sleep(duration).await;
            }

            service.call(request).await
        })
    }
}
