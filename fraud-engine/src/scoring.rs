//! Risk scoring: aggregation of check results and the decision derived from it

use crate::{
    FlagCategory, Flag, FraudAssessment, Recommendation, RiskLevel, RiskScore, SignalResult,
};

/// Reason attached to every critical assessment
pub const BLOCKED_REASON: &str = "High fraud risk detected";

/// Turns per-check results into a [`FraudAssessment`]
///
/// The score is the unweighted mean of every check's score, rounded half up.
/// Degraded checks count with score 0, so the denominator is always the full
/// check count.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    /// Create new risk scorer
    pub fn new() -> Self {
        Self
    }

    /// Mean of check scores, rounded half up and capped at 100
    pub fn aggregate(&self, signals: &[SignalResult]) -> RiskScore {
        if signals.is_empty() {
            return RiskScore::new(0);
        }

        let count = signals.len() as u32;
        let sum: u32 = signals.iter().map(|s| u32::from(s.score.min(100))).sum();
        let mean = (sum + count / 2) / count;

        RiskScore::new(mean.min(100) as u8)
    }

    /// Follow-up actions for a flag set, each at most once, in fixed order
    pub fn recommendations(&self, flags: &[Flag]) -> Vec<Recommendation> {
        let has = |wanted: &[FlagCategory]| flags.iter().any(|f| wanted.contains(&f.category));

        let mut recommendations = Vec::new();
        if has(&[FlagCategory::Velocity]) {
            recommendations.push(Recommendation::RateLimiting);
        }
        if has(&[FlagCategory::Email]) {
            recommendations.push(Recommendation::EmailVerification);
        }
        if has(&[FlagCategory::IpBlacklist, FlagCategory::Location]) {
            recommendations.push(Recommendation::AdditionalAuthentication);
        }
        recommendations
    }

    /// Build the assessment from results in check-execution order
    pub fn decide(&self, signals: Vec<SignalResult>) -> FraudAssessment {
        let risk_score = self.aggregate(&signals);
        let risk_level = RiskLevel::from(risk_score);

        let flags: Vec<Flag> = signals.iter().flat_map(|s| s.flags.iter().cloned()).collect();
        let recommendations = self.recommendations(&flags);

        FraudAssessment {
            risk_score,
            risk_level,
            flags,
            blocked_reason: (risk_level == RiskLevel::Critical).then(|| BLOCKED_REASON.to_string()),
            requires_manual_review: matches!(risk_level, RiskLevel::High | RiskLevel::Critical),
            recommendations,
            signals,
        }
    }
}
