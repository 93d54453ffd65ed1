//! Metrics collection for observability
//!
//! Each [`FraudEngine`](crate::FraudEngine) owns its registry, so several
//! engines can live in one process.
//!
//! # Metrics
//!
//! - `fraud_assessments_total{level}` - Assessments by resulting risk level
//! - `fraud_check_degraded_total{check}` - Checks that could not complete
//! - `fraud_assessment_duration_seconds` - Histogram of assessment latencies
//! - `fraud_risk_score` - Histogram of aggregated scores

use crate::{CheckType, RiskLevel};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Assessments by level
    pub assessments_total: IntCounterVec,

    /// Degraded checks by check type
    pub check_degraded_total: IntCounterVec,

    /// Assessment duration histogram
    pub assessment_duration: Histogram,

    /// Aggregated score histogram
    pub risk_score: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let assessments_total = IntCounterVec::new(
            Opts::new("fraud_assessments_total", "Assessments by risk level"),
            &["level"],
        )?;
        registry.register(Box::new(assessments_total.clone()))?;

        let check_degraded_total = IntCounterVec::new(
            Opts::new("fraud_check_degraded_total", "Checks that could not complete"),
            &["check"],
        )?;
        registry.register(Box::new(check_degraded_total.clone()))?;

        let assessment_duration = Histogram::with_opts(
            HistogramOpts::new(
                "fraud_assessment_duration_seconds",
                "Histogram of assessment latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0]),
        )?;
        registry.register(Box::new(assessment_duration.clone()))?;

        let risk_score = Histogram::with_opts(
            HistogramOpts::new("fraud_risk_score", "Histogram of aggregated risk scores")
                .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]),
        )?;
        registry.register(Box::new(risk_score.clone()))?;

        Ok(Self {
            assessments_total,
            check_degraded_total,
            assessment_duration,
            risk_score,
            registry,
        })
    }

    /// Record a finished assessment
    pub fn record_assessment(&self, level: RiskLevel, score: u8, duration_seconds: f64) {
        self.assessments_total.with_label_values(&[level.as_str()]).inc();
        self.risk_score.observe(f64::from(score));
        self.assessment_duration.observe(duration_seconds);
    }

    /// Record a check that could not complete
    pub fn record_degraded(&self, check: CheckType) {
        self.check_degraded_total
            .with_label_values(&[check.as_str()])
            .inc();
    }

    /// Render the registry in Prometheus text format
    pub fn gather_text(&self) -> crate::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::Error::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}
