//! Configuration for fraud engine

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fraud engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Platform home country (ISO 3166-1 alpha-2)
    pub home_country: String,

    /// Upper bound on one check's provider work, in milliseconds
    pub provider_timeout_ms: u64,

    /// Velocity check
    pub velocity: VelocityConfig,

    /// Email reputation check
    pub email: EmailConfig,

    /// Phone verification check
    pub phone: PhoneConfig,

    /// Behavioral check
    pub behavioral: BehavioralConfig,

    /// Amount anomaly check
    pub amount: AmountConfig,

    /// Production adapter endpoints
    pub providers: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "fraud-engine".to_string(),
            home_country: "US".to_string(),
            provider_timeout_ms: 2_500,
            velocity: VelocityConfig::default(),
            email: EmailConfig::default(),
            phone: PhoneConfig::default(),
            behavioral: BehavioralConfig::default(),
            amount: AmountConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

/// Velocity check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Trailing window (default: 24 hours)
    pub window_hours: i64,

    /// More orders than this in the window is elevated
    pub elevated_order_count: u32,

    /// More orders than this in the window is critical
    pub critical_order_count: u32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            elevated_order_count: 5,
            critical_order_count: 10,
        }
    }
}

/// Email reputation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Domains handing out throwaway inboxes
    pub disposable_domains: Vec<String>,

    /// Digit run in the local part that counts as suspicious
    pub min_digit_run: usize,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            disposable_domains: [
                "tempmail.com",
                "temp-mail.org",
                "10minutemail.com",
                "guerrillamail.com",
                "mailinator.com",
                "throwaway.email",
                "yopmail.com",
                "trashmail.com",
                "sharklasers.com",
                "getnada.com",
                "dispostable.com",
                "fakeinbox.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            min_digit_run: 8,
        }
    }
}

/// Phone verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    /// National format, matched after stripping spaces, dashes, dots and parentheses
    pub national_pattern: String,

    /// More cancelled orders than this on one phone is suspicious
    pub max_cancelled_orders: u32,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            // NANP: optional +1/1 trunk, area code and exchange not starting with 0/1
            national_pattern: r"^(\+?1)?[2-9]\d{2}[2-9]\d{6}$".to_string(),
            max_cancelled_orders: 2,
        }
    }
}

/// Behavioral check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralConfig {
    /// Accounts younger than this at order time are suspicious
    pub min_account_age_minutes: i64,

    /// Orders above this amount are high value
    pub high_value_threshold: Decimal,

    /// More items than this in one order is unusual
    pub max_total_quantity: u64,
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        Self {
            min_account_age_minutes: 5,
            high_value_threshold: Decimal::from(10_000),
            max_total_quantity: 20,
        }
    }
}

/// Amount anomaly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountConfig {
    /// Allowed ratio between order amount and historical average, either direction
    pub deviation_factor: Decimal,
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self {
            deviation_factor: Decimal::from(3),
        }
    }
}

/// Production adapter endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Redis holding the denylist and IP blacklist sets
    pub redis_url: String,

    /// Set of flagged emails
    pub flagged_emails_key: String,

    /// Set of flagged device fingerprints
    pub flagged_devices_key: String,

    /// Set of blacklisted IPs
    pub blacklisted_ips_key: String,

    /// IP intelligence service base URL
    pub ip_intel_url: String,

    /// IP intelligence API key
    pub ip_intel_api_key: Option<String>,

    /// Order history database
    pub database_url: String,

    /// Order history pool size
    pub database_max_connections: u32,

    /// Consecutive failures before a provider circuit opens
    pub circuit_failure_threshold: u32,

    /// Successes in half-open before the circuit closes
    pub circuit_success_threshold: u32,

    /// Seconds an open circuit waits before half-opening
    pub circuit_open_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            flagged_emails_key: "fraud:flagged_emails".to_string(),
            flagged_devices_key: "fraud:flagged_devices".to_string(),
            blacklisted_ips_key: "fraud:ip_blacklist".to_string(),
            ip_intel_url: "http://127.0.0.1:8090/v1/ip".to_string(),
            ip_intel_api_key: None,
            database_url: "postgresql://marketplace@127.0.0.1:5432/marketplace".to_string(),
            database_max_connections: 10,
            circuit_failure_threshold: 5,
            circuit_success_threshold: 2,
            circuit_open_seconds: 30,
        }
    }
}

impl Config {
    /// Provider timeout as a duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Check invariants the checks rely on
    pub fn validate(&self) -> crate::Result<()> {
        if self.provider_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.velocity.window_hours <= 0 {
            return Err(crate::Error::Config(
                "velocity.window_hours must be positive".to_string(),
            ));
        }

        if self.velocity.elevated_order_count >= self.velocity.critical_order_count {
            return Err(crate::Error::Config(format!(
                "velocity.elevated_order_count ({}) must be below critical_order_count ({})",
                self.velocity.elevated_order_count, self.velocity.critical_order_count
            )));
        }

        if self.email.min_digit_run == 0 {
            return Err(crate::Error::Config(
                "email.min_digit_run must be greater than zero".to_string(),
            ));
        }

        Regex::new(&self.phone.national_pattern).map_err(|e| {
            crate::Error::Config(format!("phone.national_pattern does not compile: {}", e))
        })?;

        if self.amount.deviation_factor <= Decimal::ONE {
            return Err(crate::Error::Config(
                "amount.deviation_factor must be greater than one".to_string(),
            ));
        }

        if self.home_country.trim().is_empty() {
            return Err(crate::Error::Config("home_country is empty".to_string()));
        }

        Ok(())
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then apply `FRAUD_ENGINE_*` environment overrides
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(country) = std::env::var("FRAUD_ENGINE_HOME_COUNTRY") {
            config.home_country = country;
        }

        if let Ok(timeout) = std::env::var("FRAUD_ENGINE_PROVIDER_TIMEOUT_MS") {
            config.provider_timeout_ms = timeout.parse().map_err(|_| {
                crate::Error::Config(format!("FRAUD_ENGINE_PROVIDER_TIMEOUT_MS: {:?}", timeout))
            })?;
        }

        if let Ok(url) = std::env::var("FRAUD_ENGINE_REDIS_URL") {
            config.providers.redis_url = url;
        }

        if let Ok(url) = std::env::var("FRAUD_ENGINE_IP_INTEL_URL") {
            config.providers.ip_intel_url = url;
        }

        if let Ok(key) = std::env::var("FRAUD_ENGINE_IP_INTEL_API_KEY") {
            config.providers.ip_intel_api_key = Some(key);
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.providers.database_url = url;
        }

        config.validate()?;
        Ok(config)
    }
}
