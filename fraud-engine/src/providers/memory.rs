//! In-memory providers
//!
//! Deterministic stand-ins for the external stores. Used by tests and by
//! local runs without Redis, PostgreSQL or an IP intelligence service.

use super::{
    phone_key, BlacklistProvider, DenylistProvider, IpInfo, IpIntelligenceProvider,
    OrderHistoryProvider,
};
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Past order as the history repository sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order total
    pub amount: Decimal,
    /// Placement time
    pub placed_at: DateTime<Utc>,
    /// Phone given at checkout
    pub phone: Option<String>,
    /// Whether the order was cancelled
    pub cancelled: bool,
}

impl OrderRecord {
    /// Completed order
    pub fn new(amount: Decimal, placed_at: DateTime<Utc>) -> Self {
        Self {
            amount,
            placed_at,
            phone: None,
            cancelled: false,
        }
    }

    /// Cancelled order placed with `phone`
    pub fn cancelled_with_phone(
        amount: Decimal,
        placed_at: DateTime<Utc>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            placed_at,
            phone: Some(phone.into()),
            cancelled: true,
        }
    }
}

/// Order history held in memory
#[derive(Debug, Default)]
pub struct InMemoryOrderHistory {
    // Map: customer_id -> orders
    orders: DashMap<String, Vec<OrderRecord>>,
    // Map: customer_id -> account creation time
    accounts: DashMap<String, DateTime<Utc>>,
}

impl InMemoryOrderHistory {
    /// Create empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account
    pub fn add_account(&self, customer_id: &str, created_at: DateTime<Utc>) {
        self.accounts.insert(customer_id.to_string(), created_at);
    }

    /// Record a past order
    pub fn add_order(&self, customer_id: &str, order: OrderRecord) {
        self.orders
            .entry(customer_id.to_string())
            .or_insert_with(Vec::new)
            .push(order);
    }
}

#[async_trait]
impl OrderHistoryProvider for InMemoryOrderHistory {
    async fn count_recent_orders(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<u32> {
        let count = self
            .orders
            .get(customer_id)
            .map(|orders| orders.iter().filter(|o| o.placed_at >= since).count())
            .unwrap_or(0);
        Ok(count as u32)
    }

    async fn average_order_value(&self, customer_id: &str) -> ProviderResult<Option<Decimal>> {
        Ok(self.orders.get(customer_id).and_then(|orders| {
            if orders.is_empty() {
                return None;
            }
            let total: Decimal = orders.iter().map(|o| o.amount).sum();
            Some(total / Decimal::from(orders.len() as u64))
        }))
    }

    async fn account_created_at(&self, customer_id: &str) -> ProviderResult<Option<DateTime<Utc>>> {
        Ok(self.accounts.get(customer_id).map(|created| *created))
    }

    async fn cancelled_order_count_by_phone(&self, phone: &str) -> ProviderResult<u32> {
        let wanted = phone_key(phone);
        let count: usize = self
            .orders
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|o| o.cancelled)
                    .filter(|o| o.phone.as_deref().is_some_and(|p| phone_key(p) == wanted))
                    .count()
            })
            .sum();
        Ok(count as u32)
    }
}

/// Email/device denylist held in memory
#[derive(Debug, Default)]
pub struct InMemoryDenylist {
    emails: DashSet<String>,
    devices: DashSet<String>,
}

impl InMemoryDenylist {
    /// Create empty denylist
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag an email (case-insensitive)
    pub fn flag_email(&self, email: &str) {
        self.emails.insert(email.trim().to_lowercase());
    }

    /// Flag a device fingerprint
    pub fn flag_device(&self, fingerprint: &str) {
        self.devices.insert(fingerprint.to_string());
    }
}

#[async_trait]
impl DenylistProvider for InMemoryDenylist {
    async fn is_email_flagged(&self, email: &str) -> ProviderResult<bool> {
        Ok(self.emails.contains(&email.trim().to_lowercase()))
    }

    async fn is_device_flagged(&self, fingerprint: &str) -> ProviderResult<bool> {
        Ok(self.devices.contains(fingerprint))
    }
}

/// IP blacklist held in memory
#[derive(Debug, Default)]
pub struct InMemoryBlacklist {
    ips: DashSet<String>,
}

impl InMemoryBlacklist {
    /// Create empty blacklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Blacklist an IP
    pub fn add_ip(&self, ip: &str) {
        self.ips.insert(ip.trim().to_string());
    }
}

#[async_trait]
impl BlacklistProvider for InMemoryBlacklist {
    async fn is_ip_blacklisted(&self, ip: &str) -> ProviderResult<bool> {
        Ok(self.ips.contains(ip.trim()))
    }
}

/// Fixed IP answers; unknown IPs resolve to `fallback` or `NotFound`
#[derive(Debug, Default)]
pub struct StaticIpIntelligence {
    answers: DashMap<String, IpInfo>,
    fallback: Option<IpInfo>,
}

impl StaticIpIntelligence {
    /// Create with no answers
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `info` for every IP not registered explicitly
    pub fn with_fallback(info: IpInfo) -> Self {
        Self {
            answers: DashMap::new(),
            fallback: Some(info),
        }
    }

    /// Register the answer for an IP
    pub fn insert(&self, ip: &str, info: IpInfo) {
        self.answers.insert(ip.trim().to_string(), info);
    }
}

#[async_trait]
impl IpIntelligenceProvider for StaticIpIntelligence {
    async fn lookup(&self, ip: &str) -> ProviderResult<IpInfo> {
        if let Some(info) = self.answers.get(ip.trim()) {
            return Ok(info.clone());
        }
        self.fallback
            .clone()
            .ok_or_else(|| ProviderError::NotFound(format!("ip {}", ip)))
    }
}
