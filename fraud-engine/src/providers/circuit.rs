//! Circuit breaker in front of a provider
//!
//! Once a provider keeps failing, checks stop waiting on it and degrade
//! immediately until the open period has passed. Each call is bounded by
//! its own timeout, so a provider that hangs counts as failing.

use super::{
    BlacklistProvider, DenylistProvider, IpInfo, IpIntelligenceProvider, OrderHistoryProvider,
};
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Closed (normal operation)
    Closed,
    /// Open (rejecting requests)
    Open,
    /// Half-open (testing)
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Open after N consecutive failures
    pub failure_threshold: u32,
    /// Close after N successes in half-open
    pub success_threshold: u32,
    /// Time spent open before half-opening
    pub open_duration: Duration,
    /// Bound on a single call; expiry is recorded as a failure
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration: Duration::from_secs(30),
            call_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Check if a call may go through
    pub fn allow(&self) -> ProviderResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.config.open_duration {
                    info!("Circuit breaker {} half-opening", self.name);
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    Ok(())
                } else {
                    Err(ProviderError::CircuitOpen(self.name.clone()))
                }
            }
        }
    }

    /// Record success
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    info!("Circuit breaker {} closing", self.name);
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record failure
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    warn!(
                        "Circuit breaker {} opening after {} failures",
                        self.name, inner.failure_count
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker {} re-opening", self.name);
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run `call` unless the circuit is open, and record its outcome.
    ///
    /// `NotFound` is an answer, not a fault, and counts as success. A call
    /// still running after `call_timeout` is abandoned and counts as failure.
    pub async fn call<T, F>(&self, call: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        self.allow()?;

        let result = match timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation: self.name.clone(),
                millis: self.config.call_timeout.as_millis() as u64,
            }),
        };
        match &result {
            Ok(_) | Err(ProviderError::NotFound(_)) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result
    }
}

/// Provider decorated with a circuit breaker
#[derive(Debug)]
pub struct Guarded<P> {
    inner: P,
    breaker: CircuitBreaker,
}

impl<P> Guarded<P> {
    /// Wrap `inner`
    pub fn new(name: impl Into<String>, inner: P, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(name, config),
        }
    }

    /// The breaker guarding this provider
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl<P: OrderHistoryProvider> OrderHistoryProvider for Guarded<P> {
    async fn count_recent_orders(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<u32> {
        self.breaker
            .call(self.inner.count_recent_orders(customer_id, since))
            .await
    }

    async fn average_order_value(&self, customer_id: &str) -> ProviderResult<Option<Decimal>> {
        self.breaker.call(self.inner.average_order_value(customer_id)).await
    }

    async fn account_created_at(&self, customer_id: &str) -> ProviderResult<Option<DateTime<Utc>>> {
        self.breaker.call(self.inner.account_created_at(customer_id)).await
    }

    async fn cancelled_order_count_by_phone(&self, phone: &str) -> ProviderResult<u32> {
        self.breaker
            .call(self.inner.cancelled_order_count_by_phone(phone))
            .await
    }
}

#[async_trait]
impl<P: DenylistProvider> DenylistProvider for Guarded<P> {
    async fn is_email_flagged(&self, email: &str) -> ProviderResult<bool> {
        self.breaker.call(self.inner.is_email_flagged(email)).await
    }

    async fn is_device_flagged(&self, fingerprint: &str) -> ProviderResult<bool> {
        self.breaker.call(self.inner.is_device_flagged(fingerprint)).await
    }
}

#[async_trait]
impl<P: IpIntelligenceProvider> IpIntelligenceProvider for Guarded<P> {
    async fn lookup(&self, ip: &str) -> ProviderResult<IpInfo> {
        self.breaker.call(self.inner.lookup(ip)).await
    }
}

#[async_trait]
impl<P: BlacklistProvider> BlacklistProvider for Guarded<P> {
    async fn is_ip_blacklisted(&self, ip: &str) -> ProviderResult<bool> {
        self.breaker.call(self.inner.is_ip_blacklisted(ip)).await
    }
}
