//! Order velocity per customer

use super::SignalCheck;
use crate::config::VelocityConfig;
use crate::error::ProviderResult;
use crate::providers::Providers;
use crate::{CheckType, OrderRiskContext, SignalResult};
use async_trait::async_trait;
use chrono::Duration;

/// Counts the customer's orders in the trailing window
pub struct VelocityCheck {
    config: VelocityConfig,
}

impl VelocityCheck {
    /// Create new velocity check
    pub fn new(config: VelocityConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SignalCheck for VelocityCheck {
    fn check_type(&self) -> CheckType {
        CheckType::Velocity
    }

    async fn evaluate(
        &self,
        ctx: &OrderRiskContext,
        providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let window_start = ctx.order_time() - Duration::hours(self.config.window_hours);
        let count = providers
            .order_history
            .count_recent_orders(&ctx.customer_id, window_start)
            .await?;

        let mut result = SignalResult::clear(CheckType::Velocity);

        // The critical tier replaces the elevated one
        if count > self.config.critical_order_count {
            result.raise(
                80,
                format!(
                    "Critical velocity ({}+ orders in {}h)",
                    self.config.critical_order_count, self.config.window_hours
                ),
            );
        } else if count > self.config.elevated_order_count {
            result.raise(
                40,
                format!(
                    "High order velocity ({}+ orders in {}h)",
                    self.config.elevated_order_count, self.config.window_hours
                ),
            );
        }

        Ok(result)
    }
}
