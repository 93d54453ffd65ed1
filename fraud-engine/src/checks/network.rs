//! Network signals: IP reputation and IP location against shipping

use super::SignalCheck;
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{IpInfo, Providers};
use crate::types::same_text;
use crate::{CheckType, FlagCategory, OrderRiskContext, SignalResult};
use async_trait::async_trait;

/// Unknown IPs carry no location signal
async fn lookup_known(
    ctx: &OrderRiskContext,
    providers: &Providers,
) -> ProviderResult<Option<IpInfo>> {
    match providers.ip_intelligence.lookup(&ctx.ip_address).await {
        Ok(info) => Ok(Some(info)),
        Err(ProviderError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Anonymizers, blacklist membership and non-domestic origin
pub struct IpReputationCheck {
    home_country: String,
}

impl IpReputationCheck {
    /// Create new IP check; orders from outside `home_country` are flagged
    pub fn new(home_country: String) -> Self {
        Self { home_country }
    }
}

#[async_trait]
impl SignalCheck for IpReputationCheck {
    fn check_type(&self) -> CheckType {
        CheckType::IpReputation
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let (info, blacklisted) = tokio::join!(
            lookup_known(ctx, providers),
            providers.blacklist.is_ip_blacklisted(&ctx.ip_address)
        );
        let info = info?;
        let blacklisted = blacklisted?;

        let mut result = SignalResult::clear(CheckType::IpReputation);

        if let Some(info) = &info {
            if info.is_proxy || info.is_vpn {
                result.raise_as(FlagCategory::IpAnonymizer, 50, "Proxy/VPN detected");
            }
            if info.is_tor {
                result.raise_as(FlagCategory::IpAnonymizer, 80, "Tor network detected");
            }
        }

        if blacklisted {
            result.raise_as(FlagCategory::IpBlacklist, 95, "IP in blacklist");
        }

        if let Some(info) = &info {
            let country = info.country.trim();
            if !country.is_empty() && !same_text(country, &self.home_country) {
                let message = format!("Order from {} (non-domestic)", country);
                result.raise_as(FlagCategory::IpOrigin, 20, message);
            }
        }

        Ok(result)
    }
}

/// IP city against shipping city
pub struct GeolocationCheck;

#[async_trait]
impl SignalCheck for GeolocationCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Geolocation
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let mut result = SignalResult::clear(CheckType::Geolocation);

        let ip_city = lookup_known(ctx, providers)
            .await?
            .and_then(|info| info.city)
            .filter(|city| !city.trim().is_empty());

        if let Some(city) = ip_city {
            if !same_text(&city, &ctx.shipping_address.city) {
                result.raise(25, "IP location and shipping address mismatch");
            }
        }

        Ok(result)
    }
}
