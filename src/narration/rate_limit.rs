//! HTTP 429 handling for the voice backend.
//!
//! A throttled response carries the unix time at which the limit resets.
//! The limiter sleeps until then and tells the caller to re-issue the
//! request. Retries are unbounded in count; the wait is bounded by the
//! server's own hints and recorded so callers and tests can observe it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Header carrying the reset time as a unix timestamp in seconds.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Wall clock and sleep, injectable so tests don't wait in real time.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now(&self) -> f64;

    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Not throttled, or throttled without a usable reset hint.
    Proceed,
    /// The limiter waited out the reset window; send the request again.
    Retry,
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    retries: AtomicU64,
    total_waited_ms: AtomicU64,
    max_wait_ms: AtomicU64,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            retries: AtomicU64::new(0),
            total_waited_ms: AtomicU64::new(0),
            max_wait_ms: AtomicU64::new(0),
        }
    }

    /// Inspect a response; sleep and return `Retry` if it was throttled
    /// and names a reset time.
    pub async fn check(&self, status: StatusCode, headers: &HeaderMap) -> RateLimitDecision {
        if status != StatusCode::TOO_MANY_REQUESTS {
            return RateLimitDecision::Proceed;
        }

        let Some(reset_at) = parse_reset(headers) else {
            debug!("Rate limited without a {RESET_HEADER} header, not retrying");
            return RateLimitDecision::Proceed;
        };

        let Ok(wait) = Duration::try_from_secs_f64((reset_at - self.clock.now()).max(0.0)) else {
            warn!("Unusable {RESET_HEADER} value {reset_at}, not retrying");
            return RateLimitDecision::Proceed;
        };
        warn!("Rate limit hit. Sleeping for {:.1} seconds.", wait.as_secs_f64());
        self.clock.sleep(wait).await;

        let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.total_waited_ms.fetch_add(wait_ms, Ordering::Relaxed);
        self.max_wait_ms.fetch_max(wait_ms, Ordering::Relaxed);

        RateLimitDecision::Retry
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn total_waited(&self) -> Duration {
        Duration::from_millis(self.total_waited_ms.load(Ordering::Relaxed))
    }

    /// Longest single wait so far.
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms.load(Ordering::Relaxed))
    }
}

fn parse_reset(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(RESET_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|reset| reset.is_finite())
}
