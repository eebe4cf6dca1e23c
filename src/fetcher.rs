//! Polite HTTP retrieval with bounded retry and exponential backoff.
//!
//! The module follows a decorator design:
//! - [`FetchPage`]: Core trait, fetch one URL and return its body
//! - [`HttpFetcher`]: `reqwest`-backed implementation with a per-host politeness gate
//! - [`RetryFetch`]: Decorator that retries transient failures of any [`FetchPage`]
//!
//! # Retry Strategy
//!
//! - At most `max_attempts` tries (3 by default)
//! - Exponential backoff starting at `base_delay`, capped at 30 seconds
//! - Random jitter (0-250ms) added to every backoff
//! - Permanent failures (4xx other than 429, malformed URL) are returned at once
//!
//! A failed fetch is an expected outcome, not an exceptional one: callers get
//! `Err(FetchError)` back and decide how to degrade.

use rand::{Rng, rng};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until};
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Browser-like user agent; the news source rejects obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Why a fetch produced no body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("malformed url: {0}")]
    InvalidUrl(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed reading body: {0}")]
    Body(String),
}

impl FetchError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts, connection failures, 5xx and 429 are transient; everything
    /// else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connect(_) | FetchError::Body(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 429,
            FetchError::InvalidUrl(_) => false,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Connect(e.to_string())
        }
    }
}

/// Trait for retrieving one page of text.
///
/// Implementors may be real HTTP clients, decorators, or in-memory fakes.
pub trait FetchPage {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Enforces a minimum spacing between requests to the same host.
///
/// Each caller reserves the next free slot for its host under the lock and
/// then sleeps outside it, so concurrent callers are spaced out without
/// holding the lock across the wait.
#[derive(Debug)]
pub struct PolitenessGate {
    min_interval: StdDuration,
    next_slot: Mutex<HashMap<String, tokio::time::Instant>>,
}

impl PolitenessGate {
    pub fn new(min_interval: StdDuration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until a request to `host` is allowed.
    pub async fn wait(&self, host: &str) {
        let now = tokio::time::Instant::now();
        let slot = {
            let mut slots = self.next_slot.lock().await;
            let slot = slots.get(host).copied().filter(|s| *s > now).unwrap_or(now);
            slots.insert(host.to_string(), slot + self.min_interval);
            slot
        };
        if slot > now {
            debug!(host, wait_ms = (slot - now).as_millis() as u64, "Politeness delay");
            sleep_until(slot).await;
        }
    }
}

/// `reqwest`-backed fetcher honoring a per-host politeness delay.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    gate: PolitenessGate,
}

impl HttpFetcher {
    /// Build a client with the given per-request timeout and politeness delay.
    pub fn new(timeout: StdDuration, min_interval: StdDuration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            gate: PolitenessGate::new(min_interval),
        })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?
            .to_string();

        self.gate.wait(&host).await;

        let t0 = Instant::now();
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success response");
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds bounded exponential-backoff retries to any [`FetchPage`].
///
/// The delay before retry `n` (1-based) is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    /// Total tries, including the first one.
    max_attempts: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchPage,
{
    /// Wrap `inner`; `max_attempts` below 1 is treated as 1.
    pub fn new(inner: T, max_attempts: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt - 1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchPage for RetryFetch<T>
where
    T: FetchPage,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => {
                    warn!(%url, attempt, error = %e, "Permanent fetch failure; not retrying");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    error!(
                        %url,
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "fetch() exhausted retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        %url,
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
