//! Automatic retry with exponential backoff and jitter.
//!
//! Retries transient completion errors (429, 500, 502, 503, 504, transport
//! failures) with configurable exponential backoff. Never retries client
//! errors such as 400 or 401. [`RetryingCompletion`] wraps any
//! [`CompletionService`].

use super::completion::{CompletionFuture, CompletionRequest, CompletionService};
use crate::error::CompletionError;
use futures::FutureExt;
use std::time::Duration;
use tracing::warn;

/// Retries per call used by [`RetryConfig::default`].
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Backoff schedule for [`RetryingCompletion`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 fails immediately.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Shorten delays by a per-attempt factor so parallel chunk calls that
    /// hit a rate limit together do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default schedule with `retries` retries.
    pub fn with_retries(retries: u32) -> Self {
        Self::default().with_max_retries(retries)
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let factor = if self.jitter {
            [0.75, 0.90, 0.60, 0.85][attempt as usize % 4]
        } else {
            1.0
        };
        Duration::from_secs_f64(capped * factor)
    }
}

/// A [`CompletionService`] that retries transient failures of another one.
pub struct RetryingCompletion<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: CompletionService> RetryingCompletion<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn complete_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && e.is_transient() => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        "Transient completion error (attempt {}/{}): {e}. Retrying in {delay:?}...",
                        attempt + 1,
                        self.config.max_retries,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<C: CompletionService> CompletionService for RetryingCompletion<C> {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        self.complete_with_retry(request).boxed()
    }
}
