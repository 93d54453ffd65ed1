//! Fraud engine facade
//!
//! Validates the order, fans the checks out concurrently, bounds each one by
//! the provider timeout and aggregates the results. Provider failures,
//! timeouts, panics and cancellation all degrade a single check to score 0;
//! the caller always gets an assessment for valid input.

use crate::checks::{default_checks, SignalCheck};
use crate::error::ProviderError;
use crate::metrics::Metrics;
use crate::predictor::FraudPredictor;
use crate::providers::Providers;
use crate::scoring::RiskScorer;
use crate::validation::validate_context;
use crate::{CheckType, Config, FraudAssessment, OrderRiskContext, Result, SignalResult};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fraud risk-scoring engine
pub struct FraudEngine {
    config: Config,
    providers: Providers,
    checks: Vec<Arc<dyn SignalCheck>>,
    scorer: RiskScorer,
    predictor: FraudPredictor,
    metrics: Metrics,
}

impl FraudEngine {
    /// Create engine running the ten standard checks
    pub fn new(config: Config, providers: Providers) -> Result<Self> {
        let checks = default_checks(&config)?;
        Self::with_checks(config, providers, checks)
    }

    /// Create engine running a custom check list, in the given order
    pub fn with_checks(
        config: Config,
        providers: Providers,
        checks: Vec<Arc<dyn SignalCheck>>,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        info!(
            "{} ready with {} checks (provider timeout {}ms)",
            config.service_name,
            checks.len(),
            config.provider_timeout_ms
        );

        Ok(Self {
            config,
            providers,
            checks,
            scorer: RiskScorer::new(),
            predictor: FraudPredictor::new(),
            metrics,
        })
    }

    /// Assess an order
    ///
    /// Fails only with [`Error::Validation`](crate::Error::Validation).
    pub async fn assess_order(&self, ctx: &OrderRiskContext) -> Result<FraudAssessment> {
        self.assess_order_with_cancel(ctx, &CancellationToken::new())
            .await
    }

    /// Assess an order, giving up on unfinished checks once `cancel` fires
    ///
    /// Checks still running at cancellation are reported as degraded, so the
    /// score is still averaged over the full check list.
    pub async fn assess_order_with_cancel(
        &self,
        ctx: &OrderRiskContext,
        cancel: &CancellationToken,
    ) -> Result<FraudAssessment> {
        validate_context(ctx)?;
        let started = Instant::now();

        // Every check sees the same reference time
        let mut pinned = ctx.clone();
        pinned.placed_at.get_or_insert_with(Utc::now);
        let ctx = Arc::new(pinned);

        let bound = self.config.provider_timeout();
        let mut tasks = JoinSet::new();
        for (index, check) in self.checks.iter().enumerate() {
            let check = check.clone();
            let ctx = ctx.clone();
            let providers = self.providers.clone();
            tasks.spawn(async move { (index, run_check(check, ctx, providers, bound).await) });
        }

        let mut slots: Vec<Option<SignalResult>> = vec![None; self.checks.len()];
        let mut cancelled = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => slots[index] = Some(result),
                    Some(Err(e)) => warn!("Check task failed: {}", e),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    cancelled = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let reason = if cancelled {
            "assessment cancelled"
        } else {
            "check task failed"
        };
        let signals: Vec<SignalResult> = slots
            .into_iter()
            .zip(self.checks.iter())
            .map(|(slot, check)| {
                slot.unwrap_or_else(|| SignalResult::degraded(check.check_type(), reason))
            })
            .collect();

        for signal in &signals {
            match &signal.degraded {
                Some(why) => {
                    warn!("Check {} degraded: {}", signal.check_type, why);
                    self.metrics.record_degraded(signal.check_type);
                }
                None => debug!("Check {} scored {}", signal.check_type, signal.score),
            }
        }

        let assessment = self.scorer.decide(signals);

        if assessment.is_blocked() {
            info!(
                "Order for customer {} blocked (score {})",
                ctx.customer_id, assessment.risk_score
            );
        } else if assessment.requires_manual_review {
            info!(
                "Order for customer {} sent to manual review (score {})",
                ctx.customer_id, assessment.risk_score
            );
        }

        self.metrics.record_assessment(
            assessment.risk_level,
            assessment.risk_score.score(),
            started.elapsed().as_secs_f64(),
        );

        Ok(assessment)
    }

    /// Advisory fraud probability in [0, 1]
    ///
    /// Independent of [`assess_order`](Self::assess_order) and not a
    /// replacement for it.
    pub fn predict_fraud_probability(&self, ctx: &OrderRiskContext) -> f64 {
        self.predictor.predict(ctx)
    }

    /// Checks run by this engine, in execution order
    pub fn check_types(&self) -> Vec<CheckType> {
        self.checks.iter().map(|c| c.check_type()).collect()
    }

    /// Engine metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn run_check(
    check: Arc<dyn SignalCheck>,
    ctx: Arc<OrderRiskContext>,
    providers: Providers,
    bound: Duration,
) -> SignalResult {
    let check_type = check.check_type();
    let evaluation = AssertUnwindSafe(check.evaluate(&ctx, &providers)).catch_unwind();

    match timeout(bound, evaluation).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => SignalResult::degraded(check_type, e.to_string()),
        Ok(Err(_)) => SignalResult::degraded(check_type, "check panicked"),
        Err(_) => SignalResult::degraded(
            check_type,
            ProviderError::Timeout {
                operation: check_type.to_string(),
                millis: bound.as_millis() as u64,
            }
            .to_string(),
        ),
    }
}
