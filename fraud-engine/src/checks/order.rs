//! Order-shape signals: account behavior, amount history and addresses

use super::SignalCheck;
use crate::config::{AmountConfig, BehavioralConfig};
use crate::error::ProviderResult;
use crate::providers::Providers;
use crate::{CheckType, OrderRiskContext, SignalResult};
use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;

/// Account age, order value and basket size
pub struct BehavioralCheck {
    config: BehavioralConfig,
}

impl BehavioralCheck {
    /// Create new behavioral check
    pub fn new(config: BehavioralConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SignalCheck for BehavioralCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Behavioral
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let created_at = providers
            .order_history
            .account_created_at(&ctx.customer_id)
            .await?;

        let mut result = SignalResult::clear(CheckType::Behavioral);

        // Unknown accounts skip the age condition
        if let Some(created_at) = created_at {
            let min_age = Duration::minutes(self.config.min_account_age_minutes);
            if ctx.order_time() - created_at < min_age {
                result.raise(
                    60,
                    format!(
                        "Account created <{} minutes ago",
                        self.config.min_account_age_minutes
                    ),
                );
            }
        }

        if ctx.amount > self.config.high_value_threshold {
            result.raise(40, "High value order");
        }

        if ctx.total_quantity() > self.config.max_total_quantity {
            result.raise(
                35,
                format!("Unusual quantity (>{} items)", self.config.max_total_quantity),
            );
        }

        Ok(result)
    }
}

/// Order value against the customer's historical average
pub struct AmountAnomalyCheck {
    config: AmountConfig,
}

impl AmountAnomalyCheck {
    /// Create new amount anomaly check
    pub fn new(config: AmountConfig) -> Self {
        Self { config }
    }

    fn deviates(&self, amount: Decimal, average: Decimal) -> bool {
        let factor = self.config.deviation_factor;
        amount > average * factor || amount < average / factor
    }
}

#[async_trait]
impl SignalCheck for AmountAnomalyCheck {
    fn check_type(&self) -> CheckType {
        CheckType::AmountAnomaly
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let average = providers
            .order_history
            .average_order_value(&ctx.customer_id)
            .await?;

        let mut result = SignalResult::clear(CheckType::AmountAnomaly);

        match average {
            Some(average) if average > Decimal::ZERO && self.deviates(ctx.amount, average) => {
                result.raise(
                    50,
                    format!(
                        "Order amount {}x different from user average",
                        self.config.deviation_factor.normalize()
                    ),
                );
            }
            _ => {}
        }

        Ok(result)
    }
}

/// Billing locality against shipping locality
pub struct AddressMismatchCheck;

#[async_trait]
impl SignalCheck for AddressMismatchCheck {
    fn check_type(&self) -> CheckType {
        CheckType::AddressMismatch
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        _providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let mut result = SignalResult::clear(CheckType::AddressMismatch);

        if let Some(billing) = &ctx.billing_address {
            if !billing.same_locality(&ctx.shipping_address) {
                result.raise(15, "Billing and shipping address mismatch");
            }
        }

        Ok(result)
    }
}
