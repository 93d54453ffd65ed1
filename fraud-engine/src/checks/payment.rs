//! Payment instrument analysis

use super::SignalCheck;
use crate::error::ProviderResult;
use crate::providers::Providers;
use crate::{CheckType, OrderRiskContext, SignalResult};
use async_trait::async_trait;

/// Placeholder for BIN-range analysis; contributes 0 to every assessment
/// but still counts in the aggregation denominator.
pub struct PaymentInstrumentCheck;

#[async_trait]
impl SignalCheck for PaymentInstrumentCheck {
    fn check_type(&self) -> CheckType {
        CheckType::PaymentInstrument
    }

    async fn evaluate(
        &self,
        _ctx: &OrderRiskContext,
        _providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        Ok(SignalResult::clear(CheckType::PaymentInstrument))
    }
}
