//! Advisory fraud probability
//!
//! A lightweight linear heuristic over a small feature vector. It is not a
//! trained model and does not replace [`FraudEngine::assess_order`]: use it
//! as an auxiliary signal only, for example to prioritise a review queue.
//!
//! [`FraudEngine::assess_order`]: crate::FraudEngine::assess_order

use crate::OrderRiskContext;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalised inputs, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Amount over the amount scale
    pub amount: f64,
    /// Line count over the line scale
    pub line_count: f64,
}

impl FeatureVector {
    fn values(&self) -> [f64; 2] {
        [self.amount, self.line_count]
    }
}

/// Mean-of-features predictor
#[derive(Debug, Clone)]
pub struct FraudPredictor {
    // Amount mapping to feature value 1.0
    amount_scale: Decimal,
    // Line count mapping to feature value 1.0
    line_scale: usize,
}

impl FraudPredictor {
    /// Create predictor with reference scales (1000 currency units, 10 lines)
    pub fn new() -> Self {
        Self {
            amount_scale: Decimal::from(1_000),
            line_scale: 10,
        }
    }

    /// Extract the feature vector for an order
    pub fn features(&self, ctx: &OrderRiskContext) -> FeatureVector {
        let amount = (ctx.amount / self.amount_scale).to_f64().unwrap_or(0.0);
        let line_count = ctx.items.len() as f64 / self.line_scale as f64;

        FeatureVector {
            amount: unit(amount),
            line_count: unit(line_count),
        }
    }

    /// Probability in [0, 1]
    pub fn predict(&self, ctx: &OrderRiskContext) -> f64 {
        let values = self.features(ctx).values();
        unit(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl Default for FraudPredictor {
    fn default() -> Self {
        Self::new()
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
