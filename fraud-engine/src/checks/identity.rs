//! Customer identity signals: email, phone and device

use super::SignalCheck;
use crate::config::{EmailConfig, PhoneConfig};
use crate::error::ProviderResult;
use crate::providers::{phone_key, Providers};
use crate::{CheckType, Error, OrderRiskContext, Result, SignalResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;

/// Disposable domains, denylisted addresses and machine-generated local parts
pub struct EmailReputationCheck {
    disposable_domains: HashSet<String>,
    digit_run: Regex,
}

impl EmailReputationCheck {
    /// Create new email check
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let digit_run = Regex::new(&format!(r"\d{{{},}}", config.min_digit_run))
            .map_err(|e| Error::Config(format!("email digit run: {}", e)))?;

        Ok(Self {
            disposable_domains: config
                .disposable_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            digit_run,
        })
    }
}

#[async_trait]
impl SignalCheck for EmailReputationCheck {
    fn check_type(&self) -> CheckType {
        CheckType::EmailReputation
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let email = ctx.email.trim().to_lowercase();
        let (local, domain) = email.rsplit_once('@').unwrap_or((email.as_str(), ""));

        let mut result = SignalResult::clear(CheckType::EmailReputation);

        if self.disposable_domains.contains(domain) {
            result.raise(70, "Disposable email detected");
        }

        if providers.denylist.is_email_flagged(&email).await? {
            result.raise(90, "Previously flagged email");
        }

        if self.digit_run.is_match(local) {
            result.raise(30, "Suspicious email pattern");
        }

        Ok(result)
    }
}

/// National format and cancellation history of the phone number
pub struct PhoneVerificationCheck {
    national_format: Regex,
    max_cancelled_orders: u32,
}

impl PhoneVerificationCheck {
    /// Create new phone check
    pub fn new(config: &PhoneConfig) -> Result<Self> {
        let national_format = Regex::new(&config.national_pattern)
            .map_err(|e| Error::Config(format!("phone pattern: {}", e)))?;

        Ok(Self {
            national_format,
            max_cancelled_orders: config.max_cancelled_orders,
        })
    }

    fn normalize(phone: &str) -> String {
        phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect()
    }
}

#[async_trait]
impl SignalCheck for PhoneVerificationCheck {
    fn check_type(&self) -> CheckType {
        CheckType::PhoneVerification
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let mut result = SignalResult::clear(CheckType::PhoneVerification);

        let phone = match ctx.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Self::normalize(phone),
            _ => return Ok(result),
        };

        if !self.national_format.is_match(&phone) {
            result.raise(30, "Invalid phone format");
        }

        let cancelled = providers
            .order_history
            .cancelled_order_count_by_phone(&phone_key(&phone))
            .await?;
        if cancelled > self.max_cancelled_orders {
            result.raise(70, format!("Phone used in {} cancelled orders", cancelled));
        }

        Ok(result)
    }
}

/// Presence and denylist status of the device fingerprint
pub struct DeviceFingerprintCheck;

#[async_trait]
impl SignalCheck for DeviceFingerprintCheck {
    fn check_type(&self) -> CheckType {
        CheckType::DeviceFingerprint
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let mut result = SignalResult::clear(CheckType::DeviceFingerprint);

        match ctx.device_fingerprint.as_deref().map(str::trim) {
            Some(fingerprint) if !fingerprint.is_empty() => {
                if providers.denylist.is_device_flagged(fingerprint).await? {
                    result.raise(90, "Device previously flagged");
                }
            }
            _ => result.raise(20, "No device fingerprint"),
        }

        Ok(result)
    }
}
