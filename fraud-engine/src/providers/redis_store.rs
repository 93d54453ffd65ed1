//! Redis-backed denylist and IP blacklist
//!
//! Each list is a Redis set; membership is a single `SISMEMBER`.

use super::{BlacklistProvider, DenylistProvider};
use crate::error::ProviderResult;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

/// Set keys holding the flagged values
#[derive(Debug, Clone)]
pub struct SetKeys {
    /// Lower-cased emails
    pub flagged_emails: String,
    /// Device fingerprints
    pub flagged_devices: String,
    /// IP addresses
    pub blacklisted_ips: String,
}

/// Denylist and blacklist stored as Redis sets
#[derive(Clone)]
pub struct RedisDenylist {
    redis: ConnectionManager,
    keys: SetKeys,
}

impl RedisDenylist {
    /// Wrap an existing connection manager
    pub fn new(redis: ConnectionManager, keys: SetKeys) -> Self {
        RedisDenylist { redis, keys }
    }

    /// Connect to `url`
    pub async fn connect(url: &str, keys: SetKeys) -> crate::Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| crate::Error::ProviderSetup(format!("redis url {}: {}", url, e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| crate::Error::ProviderSetup(format!("redis connect {}: {}", url, e)))?;

        info!("Connected to Redis denylist at {}", url);
        Ok(Self::new(manager, keys))
    }

    async fn is_member(&self, key: &str, value: &str) -> ProviderResult<bool> {
        let member: bool = self.redis.clone().sismember(key, value).await?;
        debug!("SISMEMBER {} -> {}", key, member);
        Ok(member)
    }
}

#[async_trait]
impl DenylistProvider for RedisDenylist {
    async fn is_email_flagged(&self, email: &str) -> ProviderResult<bool> {
        self.is_member(&self.keys.flagged_emails, &email.trim().to_lowercase())
            .await
    }

    async fn is_device_flagged(&self, fingerprint: &str) -> ProviderResult<bool> {
        self.is_member(&self.keys.flagged_devices, fingerprint).await
    }
}

#[async_trait]
impl BlacklistProvider for RedisDenylist {
    async fn is_ip_blacklisted(&self, ip: &str) -> ProviderResult<bool> {
        self.is_member(&self.keys.blacklisted_ips, ip.trim()).await
    }
}
