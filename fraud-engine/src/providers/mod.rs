//! Data providers consulted by the signal checks
//!
//! The engine owns none of this state. Each trait is the contract the
//! surrounding platform implements; this module ships production adapters
//! (Redis, HTTP, PostgreSQL) and deterministic in-memory fakes.

pub mod circuit;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod redis_store;

use crate::config::ProviderConfig;
use crate::error::ProviderResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Guarded};
pub use http::HttpIpIntelligence;
pub use memory::{InMemoryBlacklist, InMemoryDenylist, InMemoryOrderHistory, StaticIpIntelligence};
pub use postgres::PgOrderHistory;
pub use redis_store::RedisDenylist;

/// Past orders and account facts per customer
#[async_trait]
pub trait OrderHistoryProvider: Send + Sync {
    /// Orders placed by the customer at or after `since`
    async fn count_recent_orders(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<u32>;

    /// Average order value, `None` when the customer has no history
    async fn average_order_value(&self, customer_id: &str) -> ProviderResult<Option<Decimal>>;

    /// Account creation time, `None` when unknown
    async fn account_created_at(&self, customer_id: &str) -> ProviderResult<Option<DateTime<Utc>>>;

    /// Cancelled orders placed with this phone number, compared by [`phone_key`]
    async fn cancelled_order_count_by_phone(&self, phone: &str) -> ProviderResult<u32>;
}

/// Comparable form of a phone number: its digits and `+`, nothing else
pub fn phone_key(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect()
}

/// Previously flagged emails and devices
#[async_trait]
pub trait DenylistProvider: Send + Sync {
    /// Whether the email was flagged before
    async fn is_email_flagged(&self, email: &str) -> ProviderResult<bool>;

    /// Whether the device fingerprint was flagged before
    async fn is_device_flagged(&self, fingerprint: &str) -> ProviderResult<bool>;
}

/// Geolocation and anonymizer detection for an IP
#[async_trait]
pub trait IpIntelligenceProvider: Send + Sync {
    /// Look up an IP address
    async fn lookup(&self, ip: &str) -> ProviderResult<IpInfo>;
}

/// Known-bad IP addresses
#[async_trait]
pub trait BlacklistProvider: Send + Sync {
    /// Whether the IP is blacklisted
    async fn is_ip_blacklisted(&self, ip: &str) -> ProviderResult<bool>;
}

/// IP lookup answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
    /// City, when resolved
    #[serde(default)]
    pub city: Option<String>,
    /// Open or commercial proxy
    #[serde(default)]
    pub is_proxy: bool,
    /// VPN endpoint
    #[serde(default)]
    pub is_vpn: bool,
    /// Tor exit node
    #[serde(default)]
    pub is_tor: bool,
}

impl IpInfo {
    /// Plain residential address in `country`/`city`
    pub fn residential(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: Some(city.into()),
            is_proxy: false,
            is_vpn: false,
            is_tor: false,
        }
    }
}

/// The provider set handed to every check
#[derive(Clone)]
pub struct Providers {
    /// Order history repository
    pub order_history: Arc<dyn OrderHistoryProvider>,
    /// Email/device denylist
    pub denylist: Arc<dyn DenylistProvider>,
    /// IP intelligence service
    pub ip_intelligence: Arc<dyn IpIntelligenceProvider>,
    /// IP blacklist
    pub blacklist: Arc<dyn BlacklistProvider>,
}

impl Providers {
    /// Bundle provider implementations
    pub fn new(
        order_history: Arc<dyn OrderHistoryProvider>,
        denylist: Arc<dyn DenylistProvider>,
        ip_intelligence: Arc<dyn IpIntelligenceProvider>,
        blacklist: Arc<dyn BlacklistProvider>,
    ) -> Self {
        Self {
            order_history,
            denylist,
            ip_intelligence,
            blacklist,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}

/// Wire the production adapters, each behind its own circuit breaker
pub async fn connect(config: &ProviderConfig, timeout: Duration) -> crate::Result<Providers> {
    let breaker = CircuitBreakerConfig {
        failure_threshold: config.circuit_failure_threshold,
        success_threshold: config.circuit_success_threshold,
        open_duration: Duration::from_secs(config.circuit_open_seconds),
        // Below the check bound, so a hung call is recorded before the check gives up
        call_timeout: timeout * 4 / 5,
    };

    let redis = RedisDenylist::connect(
        &config.redis_url,
        redis_store::SetKeys {
            flagged_emails: config.flagged_emails_key.clone(),
            flagged_devices: config.flagged_devices_key.clone(),
            blacklisted_ips: config.blacklisted_ips_key.clone(),
        },
    )
    .await?;

    let ip_intelligence =
        HttpIpIntelligence::new(&config.ip_intel_url, config.ip_intel_api_key.clone(), timeout)?;

    let order_history = PgOrderHistory::connect(
        &config.database_url,
        config.database_max_connections,
        timeout,
    )
    .await?;

    info!(
        "Providers connected (redis: {}, ip intelligence: {})",
        config.redis_url, config.ip_intel_url
    );

    Ok(Providers {
        order_history: Arc::new(Guarded::new("order_history", order_history, breaker.clone())),
        denylist: Arc::new(Guarded::new("denylist", redis.clone(), breaker.clone())),
        ip_intelligence: Arc::new(Guarded::new(
            "ip_intelligence",
            ip_intelligence,
            breaker.clone(),
        )),
        blacklist: Arc::new(Guarded::new("blacklist", redis, breaker)),
    })
}
