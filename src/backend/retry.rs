// src/backend/retry.rs — Retry with exponential backoff for idempotent backend reads
//
// Wraps any Backend. Retries: rate limits (429), server errors (5xx),
// timeouts, connection failures. Does NOT retry: rejected credentials, and
// writes (registration, opt-in, checkout, order create/capture).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::types::*;
use super::Backend;
use crate::catalog::Plan;
use crate::infra::config::RetryTomlConfig;
use crate::infra::errors::ViralDailyError;
use crate::session::Session;

const JITTER_FRACTION: f64 = 0.2;
const BACKOFF_FACTOR: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::from(&RetryTomlConfig::default())
    }
}

impl From<&RetryTomlConfig> for RetryConfig {
    fn from(toml: &RetryTomlConfig) -> Self {
        Self {
            max_retries: toml.max_retries,
            initial_delay: Duration::from_millis(toml.initial_delay_ms),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(toml.max_delay_ms),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

pub struct RetryBackend {
    inner: Arc<dyn Backend>,
    config: RetryConfig,
}

impl RetryBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn Backend>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Delay before retry `attempt` (0-indexed). A server-requested wait
    /// never exceeds `max_delay`.
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay
                .saturating_add(Duration::from_millis(100))
                .min(self.config.max_delay);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(50.0);

        Duration::from_millis(final_ms as u64)
    }

    async fn retrying<T, F, Fut>(&self, endpoint: &str, op: F) -> Result<T, ViralDailyError>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<T, ViralDailyError>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !should_retry(&e) || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        backend = self.inner.id(),
                        endpoint,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn should_retry(error: &ViralDailyError) -> bool {
    match error {
        ViralDailyError::RateLimited { .. } => true,
        ViralDailyError::Backend { retriable, .. } => *retriable,
        _ => false,
    }
}

fn rate_limit_delay(error: &ViralDailyError) -> Option<Duration> {
    match error {
        ViralDailyError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Multiplier in [1 - fraction, 1 + fraction], reproducible per attempt.
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl Backend for RetryBackend {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn register(&self, email: &str) -> Result<Session, ViralDailyError> {
        self.inner.register(email).await
    }

    async fn current_user(&self, api_key: &str) -> Result<Session, ViralDailyError> {
        self.retrying("users/me", || self.inner.current_user(api_key))
            .await
    }

    async fn user_analytics(&self, api_key: &str) -> Result<UsageAnalytics, ViralDailyError> {
        self.retrying("users/me/analytics", || self.inner.user_analytics(api_key))
            .await
    }

    async fn videos(
        &self,
        query: &VideoQuery,
        api_key: Option<&str>,
    ) -> Result<VideoPage, ViralDailyError> {
        self.retrying("videos", || self.inner.videos(query, api_key))
            .await
    }

    async fn subscribe(&self, opt_in: &NotificationOptIn) -> Result<(), ViralDailyError> {
        self.inner.subscribe(opt_in).await
    }

    async fn plans(&self) -> Result<Vec<Plan>, ViralDailyError> {
        self.retrying("subscription/plans", || self.inner.plans())
            .await
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<CheckoutSessionResponse, ViralDailyError> {
        self.inner.create_checkout_session(request, api_key).await
    }

    async fn inline_config(&self) -> Result<InlineConfig, ViralDailyError> {
        self.retrying("payments/paypal/config", || self.inner.inline_config())
            .await
    }

    async fn create_inline_order(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<InlineOrder, ViralDailyError> {
        self.inner.create_inline_order(request, api_key).await
    }

    async fn capture_inline_order(
        &self,
        order_id: &str,
    ) -> Result<CaptureResponse, ViralDailyError> {
        self.inner.capture_inline_order(order_id).await
    }

    async fn transactions(&self, api_key: &str) -> Result<Vec<Transaction>, ViralDailyError> {
        self.retrying("payments/v1/transactions/me", || {
            self.inner.transactions(api_key)
        })
        .await
    }
}
