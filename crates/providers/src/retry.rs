//! Retry decorator: bounded exponential backoff with per-attempt timeouts.
//!
//! Wraps any provider. Transient failures (timeouts, rate limits, network
//! errors, 5xx) are retried up to `max_retries` times; everything else is
//! returned on the spot. A protocol violation is never retried.

use agentloop_config::RetryConfig;
use agentloop_core::provider::*;
use agentloop_core::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff and timeout settings for [`RetryProvider`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay`, never shorter than the server's `retry-after`.
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// A provider that retries transient failures of the provider it wraps.
pub struct RetryProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0u32;
        loop {
            let result =
                match tokio::time::timeout(self.policy.timeout, self.inner.complete(request.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        self.inner.name(),
                        self.policy.timeout.as_secs()
                    ))),
                };

            let error = match result {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(provider = %self.inner.name(), attempt, "Succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= self.policy.max_retries {
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt, &error);
            attempt += 1;
            warn!(
                provider = %self.inner.name(),
                attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient provider failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
