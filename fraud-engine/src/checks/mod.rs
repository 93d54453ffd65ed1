//! Signal checks
//!
//! Each check is an independent heuristic over the order context and the
//! provider answers. Within one check, fired conditions keep the maximum
//! score and every flag.
//!
//! A check returns `Err` only when a provider call failed; the engine turns
//! that into a degraded [`SignalResult`] so one outage never fails the
//! assessment.

pub mod identity;
pub mod network;
pub mod order;
pub mod payment;
pub mod velocity;

use crate::error::ProviderResult;
use crate::providers::Providers;
use crate::{CheckType, Config, OrderRiskContext, Result, SignalResult};
use async_trait::async_trait;
use std::sync::Arc;

pub use identity::{DeviceFingerprintCheck, EmailReputationCheck, PhoneVerificationCheck};
pub use network::{GeolocationCheck, IpReputationCheck};
pub use order::{AddressMismatchCheck, AmountAnomalyCheck, BehavioralCheck};
pub use payment::PaymentInstrumentCheck;
pub use velocity::VelocityCheck;

/// One risk heuristic
#[async_trait]
pub trait SignalCheck: Send + Sync {
    /// Which check this is
    fn check_type(&self) -> CheckType;

    /// Evaluate the order. Same inputs and provider answers give the same result.
    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult>;
}

/// The ten checks, in execution order
pub fn default_checks(config: &Config) -> Result<Vec<Arc<dyn SignalCheck>>> {
    config.validate()?;

    Ok(vec![
        Arc::new(VelocityCheck::new(config.velocity.clone())),
        Arc::new(EmailReputationCheck::new(&config.email)?),
        Arc::new(IpReputationCheck::new(config.home_country.clone())),
        Arc::new(PhoneVerificationCheck::new(&config.phone)?),
        Arc::new(BehavioralCheck::new(config.behavioral.clone())),
        Arc::new(DeviceFingerprintCheck),
        Arc::new(GeolocationCheck),
        Arc::new(AmountAnomalyCheck::new(config.amount.clone())),
        Arc::new(AddressMismatchCheck),
        Arc::new(PaymentInstrumentCheck),
    ])
}
