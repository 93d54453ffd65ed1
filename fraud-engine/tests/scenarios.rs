//! End-to-end assessments over the in-memory providers

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fraud_engine::checks::SignalCheck;
use fraud_engine::providers::memory::OrderRecord;
use fraud_engine::providers::{
    BlacklistProvider, CircuitBreakerConfig, CircuitState, DenylistProvider, Guarded,
    InMemoryBlacklist, InMemoryDenylist, InMemoryOrderHistory, IpIntelligenceProvider,
    OrderHistoryProvider, StaticIpIntelligence,
};
use fraud_engine::{
    Address, CheckType, Config, Error, FraudEngine, IpInfo, LineItem, OrderRiskContext,
    PaymentMethod, ProviderError, ProviderResult, Providers, Recommendation, RiskLevel,
    SignalResult, BLOCKED_REASON,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

struct Stores {
    history: Arc<InMemoryOrderHistory>,
    denylist: Arc<InMemoryDenylist>,
    ip_intel: Arc<StaticIpIntelligence>,
    blacklist: Arc<InMemoryBlacklist>,
}

impl Stores {
    fn new() -> Self {
        Self {
            history: Arc::new(InMemoryOrderHistory::new()),
            denylist: Arc::new(InMemoryDenylist::new()),
            ip_intel: Arc::new(StaticIpIntelligence::with_fallback(IpInfo::residential(
                "US", "Austin",
            ))),
            blacklist: Arc::new(InMemoryBlacklist::new()),
        }
    }

    fn providers(&self) -> Providers {
        Providers::new(
            self.history.clone(),
            self.denylist.clone(),
            self.ip_intel.clone(),
            self.blacklist.clone(),
        )
    }

    fn engine(&self) -> FraudEngine {
        FraudEngine::new(Config::default(), self.providers()).unwrap()
    }
}

fn placed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

fn order() -> OrderRiskContext {
    let address = Address {
        line1: "500 Congress Ave".to_string(),
        city: "Austin".to_string(),
        postal_code: "78701".to_string(),
        country: "US".to_string(),
    };

    OrderRiskContext {
        customer_id: "cust-1001".to_string(),
        email: "sam.rivera@example.com".to_string(),
        phone: Some("512-555-0199".to_string()),
        ip_address: "198.51.100.23".to_string(),
        amount: Decimal::from(120),
        items: vec![LineItem {
            product_id: "sku-100".to_string(),
            quantity: 2,
            unit_price: Decimal::from(60),
        }],
        shipping_address: address.clone(),
        billing_address: Some(address),
        payment_method: PaymentMethod::Card {
            bin: Some("520000".to_string()),
        },
        user_agent: Some("Mozilla/5.0".to_string()),
        device_fingerprint: Some("fp-0c11".to_string()),
        placed_at: Some(placed_at()),
    }
}

fn score_of(signals: &[SignalResult], check_type: CheckType) -> u8 {
    signals
        .iter()
        .find(|s| s.check_type == check_type)
        .map(|s| s.score)
        .unwrap_or_default()
}

/// Returns a fixed score, or panics when `score` is `None`
struct FixedCheck {
    check_type: CheckType,
    score: Option<u8>,
}

#[async_trait]
impl SignalCheck for FixedCheck {
    fn check_type(&self) -> CheckType {
        self.check_type
    }

    async fn evaluate(
        &self,
        _ctx: &OrderRiskContext,
        _providers: &Providers,
    ) -> ProviderResult<SignalResult> {
        let Some(score) = self.score else {
            panic!("check exploded");
        };
        let mut result = SignalResult::clear(self.check_type);
        result.raise(score, format!("{} fixed", self.check_type));
        Ok(result)
    }
}

/// Every provider call fails, optionally after a delay
struct BrokenProvider {
    delay: std::time::Duration,
}

impl BrokenProvider {
    fn failing() -> Self {
        Self {
            delay: std::time::Duration::ZERO,
        }
    }

    fn hanging() -> Self {
        Self {
            delay: std::time::Duration::from_secs(10),
        }
    }

    async fn fail<T>(&self) -> ProviderResult<T> {
        tokio::time::sleep(self.delay).await;
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl OrderHistoryProvider for BrokenProvider {
    async fn count_recent_orders(
        &self,
        _customer_id: &str,
        _since: DateTime<Utc>,
    ) -> ProviderResult<u32> {
        self.fail().await
    }

    async fn average_order_value(&self, _customer_id: &str) -> ProviderResult<Option<Decimal>> {
        self.fail().await
    }

    async fn account_created_at(
        &self,
        _customer_id: &str,
    ) -> ProviderResult<Option<DateTime<Utc>>> {
        self.fail().await
    }

    async fn cancelled_order_count_by_phone(&self, _phone: &str) -> ProviderResult<u32> {
        self.fail().await
    }
}

#[async_trait]
impl DenylistProvider for BrokenProvider {
    async fn is_email_flagged(&self, _email: &str) -> ProviderResult<bool> {
        self.fail().await
    }

    async fn is_device_flagged(&self, _fingerprint: &str) -> ProviderResult<bool> {
        self.fail().await
    }
}

#[async_trait]
impl IpIntelligenceProvider for BrokenProvider {
    async fn lookup(&self, _ip: &str) -> ProviderResult<IpInfo> {
        self.fail().await
    }
}

#[async_trait]
impl BlacklistProvider for BrokenProvider {
    async fn is_ip_blacklisted(&self, _ip: &str) -> ProviderResult<bool> {
        self.fail().await
    }
}

fn broken_providers(make: fn() -> BrokenProvider) -> Providers {
    Providers::new(
        Arc::new(make()),
        Arc::new(make()),
        Arc::new(make()),
        Arc::new(make()),
    )
}

const PROVIDER_CHECKS: [CheckType; 8] = [
    CheckType::Velocity,
    CheckType::EmailReputation,
    CheckType::IpReputation,
    CheckType::PhoneVerification,
    CheckType::Behavioral,
    CheckType::DeviceFingerprint,
    CheckType::Geolocation,
    CheckType::AmountAnomaly,
];

#[tokio::test]
async fn scenario_velocity_alone_stays_low() {
    let stores = Stores::new();
    let ctx = order();
    for i in 0..11 {
        stores.history.add_order(
            &ctx.customer_id,
            OrderRecord::new(Decimal::from(100), placed_at() - Duration::minutes(30 * i + 5)),
        );
    }

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();

    assert_eq!(score_of(&assessment.signals, CheckType::Velocity), 80);
    assert_eq!(assessment.risk_score.score(), 8);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert_eq!(assessment.recommendations, vec![Recommendation::RateLimiting]);
    assert!(!assessment.requires_manual_review);
}

#[tokio::test]
async fn scenario_three_strong_signals_average_to_low() {
    let stores = Stores::new();
    let mut ctx = order();
    ctx.email = "test@tempmail.com".to_string();
    stores.ip_intel.insert(
        &ctx.ip_address,
        IpInfo {
            is_tor: true,
            ..IpInfo::residential("US", "Austin")
        },
    );
    stores.denylist.flag_device("fp-0c11");

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();

    assert_eq!(score_of(&assessment.signals, CheckType::EmailReputation), 70);
    assert_eq!(score_of(&assessment.signals, CheckType::IpReputation), 80);
    assert_eq!(score_of(&assessment.signals, CheckType::DeviceFingerprint), 90);
    assert_eq!(assessment.risk_score.score(), 24);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert_eq!(
        assessment.recommendations,
        vec![Recommendation::EmailVerification]
    );
}

#[tokio::test]
async fn anonymized_foreign_ip_needs_no_extra_authentication() {
    let stores = Stores::new();
    let ctx = order();
    stores.ip_intel.insert(
        &ctx.ip_address,
        IpInfo {
            is_tor: true,
            is_proxy: true,
            ..IpInfo::residential("FR", "Austin")
        },
    );

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();

    let messages: Vec<_> = assessment.flags.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Proxy/VPN detected",
            "Tor network detected",
            "Order from FR (non-domestic)"
        ]
    );
    assert!(assessment.recommendations.is_empty());
}

#[tokio::test]
async fn scenario_blacklist_new_account_rounds_half_up() {
    let stores = Stores::new();
    let mut ctx = order();
    ctx.email = "test@tempmail.com".to_string();
    stores.blacklist.add_ip(&ctx.ip_address);
    stores
        .history
        .add_account(&ctx.customer_id, placed_at() - Duration::minutes(2));
    stores.history.add_order(
        &ctx.customer_id,
        OrderRecord::new(Decimal::from(30), placed_at() - Duration::days(3)),
    );

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();

    assert_eq!(score_of(&assessment.signals, CheckType::IpReputation), 95);
    assert_eq!(score_of(&assessment.signals, CheckType::EmailReputation), 70);
    assert_eq!(score_of(&assessment.signals, CheckType::Behavioral), 60);
    assert_eq!(score_of(&assessment.signals, CheckType::AmountAnomaly), 50);
    assert_eq!(assessment.risk_score.score(), 28);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert!(assessment
        .recommendations
        .contains(&Recommendation::EmailVerification));
    assert!(assessment
        .recommendations
        .contains(&Recommendation::AdditionalAuthentication));
}

#[tokio::test]
async fn scenario_every_check_at_maximum_is_critical() {
    let stores = Stores::new();
    let checks: Vec<Arc<dyn SignalCheck>> = CheckType::ALL
        .iter()
        .map(|check_type| {
            Arc::new(FixedCheck {
                check_type: *check_type,
                score: Some(100),
            }) as Arc<dyn SignalCheck>
        })
        .collect();
    let engine = FraudEngine::with_checks(Config::default(), stores.providers(), checks).unwrap();

    let assessment = engine.assess_order(&order()).await.unwrap();

    assert_eq!(assessment.risk_score.score(), 100);
    assert_eq!(assessment.risk_level, RiskLevel::Critical);
    assert!(assessment.requires_manual_review);
    assert_eq!(assessment.blocked_reason.as_deref(), Some(BLOCKED_REASON));
}

#[tokio::test]
async fn every_standard_condition_firing_tops_out_at_medium() {
    let stores = Stores::new();
    let mut ctx = order();
    ctx.email = "12345678@mailinator.com".to_string();
    ctx.amount = Decimal::from(20_000);
    ctx.items = vec![LineItem {
        product_id: "sku-200".to_string(),
        quantity: 25,
        unit_price: Decimal::from(800),
    }];
    if let Some(billing) = ctx.billing_address.as_mut() {
        billing.city = "Houston".to_string();
        billing.postal_code = "77002".to_string();
    }

    for i in 0..11 {
        stores.history.add_order(
            &ctx.customer_id,
            OrderRecord::new(Decimal::from(50), placed_at() - Duration::minutes(10 * i + 1)),
        );
    }
    for customer in ["cust-7", "cust-8", "cust-9"] {
        stores.history.add_order(
            customer,
            OrderRecord::cancelled_with_phone(Decimal::ONE, placed_at(), "5125550199"),
        );
    }
    stores
        .history
        .add_account(&ctx.customer_id, placed_at() - Duration::minutes(1));
    stores.denylist.flag_email(&ctx.email);
    stores.denylist.flag_device("fp-0c11");
    stores.blacklist.add_ip(&ctx.ip_address);
    stores.ip_intel.insert(
        &ctx.ip_address,
        IpInfo {
            is_proxy: true,
            is_tor: true,
            ..IpInfo::residential("FR", "Paris")
        },
    );

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();

    let scores: Vec<u8> = assessment.signals.iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![80, 90, 95, 70, 60, 90, 25, 50, 15, 0]);
    assert_eq!(assessment.risk_score.score(), 58);
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert!(!assessment.is_blocked());
    assert_eq!(assessment.flags.len(), 16);
    assert_eq!(
        assessment.recommendations,
        vec![
            Recommendation::RateLimiting,
            Recommendation::EmailVerification,
            Recommendation::AdditionalAuthentication,
        ]
    );
}

#[tokio::test]
async fn failing_providers_degrade_to_low() {
    let providers = broken_providers(BrokenProvider::failing);
    let engine = FraudEngine::new(Config::default(), providers).unwrap();

    let assessment = engine.assess_order(&order()).await.unwrap();

    assert_eq!(assessment.risk_score.score(), 0);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert!(assessment.flags.is_empty());
    assert_eq!(assessment.signals.len(), 10);
    for check_type in PROVIDER_CHECKS {
        let signal = assessment
            .signals
            .iter()
            .find(|s| s.check_type == check_type)
            .unwrap();
        assert!(signal.is_degraded(), "{} should be degraded", check_type);
        assert_eq!(signal.score, 0);
    }
    assert_eq!(
        engine
            .metrics()
            .check_degraded_total
            .with_label_values(&["velocity"])
            .get(),
        1
    );
}

#[tokio::test]
async fn slow_providers_are_bounded_by_timeout() {
    let config = Config {
        provider_timeout_ms: 50,
        ..Config::default()
    };
    let engine = FraudEngine::new(config, broken_providers(BrokenProvider::hanging)).unwrap();

    let started = Instant::now();
    let assessment = engine.assess_order(&order()).await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(assessment.risk_score.score(), 0);
    let velocity = &assessment.signals[0];
    assert_eq!(
        velocity.degraded.as_deref(),
        Some("velocity timed out after 50ms")
    );
}

#[tokio::test]
async fn cancellation_degrades_unfinished_checks() {
    let providers = broken_providers(BrokenProvider::hanging);
    let engine = FraudEngine::new(Config::default(), providers).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let assessment = engine
        .assess_order_with_cancel(&order(), &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(assessment.signals.len(), 10);
    assert_eq!(assessment.risk_score.score(), 0);
    for check_type in PROVIDER_CHECKS {
        let signal = assessment
            .signals
            .iter()
            .find(|s| s.check_type == check_type)
            .unwrap();
        assert_eq!(signal.degraded.as_deref(), Some("assessment cancelled"));
    }
}

#[tokio::test]
async fn panicking_check_is_isolated() {
    let stores = Stores::new();
    let checks: Vec<Arc<dyn SignalCheck>> = CheckType::ALL
        .iter()
        .map(|check_type| {
            let score = if *check_type == CheckType::Geolocation {
                None
            } else {
                Some(100)
            };
            Arc::new(FixedCheck {
                check_type: *check_type,
                score,
            }) as Arc<dyn SignalCheck>
        })
        .collect();
    let engine = FraudEngine::with_checks(Config::default(), stores.providers(), checks).unwrap();

    let assessment = engine.assess_order(&order()).await.unwrap();

    assert_eq!(assessment.signals[6].degraded.as_deref(), Some("check panicked"));
    assert_eq!(assessment.risk_score.score(), 90);
    assert_eq!(assessment.risk_level, RiskLevel::Critical);
}

#[tokio::test]
async fn repeated_assessment_is_identical() {
    let stores = Stores::new();
    let mut ctx = order();
    ctx.email = "test@tempmail.com".to_string();
    ctx.device_fingerprint = None;
    stores.history.add_order(
        &ctx.customer_id,
        OrderRecord::new(Decimal::from(100), placed_at() - Duration::hours(2)),
    );
    let engine = stores.engine();

    let first = engine.assess_order(&ctx).await.unwrap();
    let second = engine.assess_order(&ctx).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.risk_score.score(), 9);
}

#[tokio::test]
async fn open_circuit_degrades_without_calling_provider() {
    let stores = Stores::new();
    let breaker = CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 1,
        open_duration: std::time::Duration::from_secs(60),
        call_timeout: std::time::Duration::from_secs(1),
    };
    let guarded = Arc::new(Guarded::new(
        "blacklist",
        BrokenProvider::failing(),
        breaker,
    ));
    let providers = Providers {
        blacklist: guarded,
        ..stores.providers()
    };
    let engine = FraudEngine::new(Config::default(), providers).unwrap();

    let first = engine.assess_order(&order()).await.unwrap();
    assert_eq!(
        first.signals[2].degraded.as_deref(),
        Some("Provider unavailable: connection refused")
    );

    let second = engine.assess_order(&order()).await.unwrap();
    assert_eq!(
        second.signals[2].degraded.as_deref(),
        Some("Circuit breaker open for blacklist")
    );
}

#[tokio::test]
async fn hanging_provider_opens_its_circuit() {
    let stores = Stores::new();
    let breaker = CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 1,
        open_duration: std::time::Duration::from_secs(60),
        call_timeout: std::time::Duration::from_millis(50),
    };
    let guarded = Arc::new(Guarded::new(
        "blacklist",
        BrokenProvider::hanging(),
        breaker,
    ));
    let providers = Providers {
        blacklist: guarded.clone(),
        ..stores.providers()
    };
    let config = Config {
        provider_timeout_ms: 500,
        ..Config::default()
    };
    let engine = FraudEngine::new(config, providers).unwrap();

    let first = engine.assess_order(&order()).await.unwrap();
    assert_eq!(
        first.signals[2].degraded.as_deref(),
        Some("blacklist timed out after 50ms")
    );
    assert_eq!(guarded.breaker().state(), CircuitState::Open);

    let started = Instant::now();
    let second = engine.assess_order(&order()).await.unwrap();
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
    assert_eq!(
        second.signals[2].degraded.as_deref(),
        Some("Circuit breaker open for blacklist")
    );
}

#[tokio::test]
async fn invalid_order_is_rejected_before_checks() {
    let providers = broken_providers(BrokenProvider::hanging);
    let engine = FraudEngine::new(Config::default(), providers).unwrap();
    let mut ctx = order();
    ctx.items.clear();

    let started = Instant::now();
    let result = engine.assess_order(&ctx).await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn missing_placed_at_uses_assessment_time() {
    let stores = Stores::new();
    let mut ctx = order();
    ctx.placed_at = None;
    for _ in 0..6 {
        stores.history.add_order(
            &ctx.customer_id,
            OrderRecord::new(Decimal::from(100), Utc::now() - Duration::hours(1)),
        );
    }

    let assessment = stores.engine().assess_order(&ctx).await.unwrap();
    assert_eq!(score_of(&assessment.signals, CheckType::Velocity), 40);
}

#[test]
fn predictor_is_advisory_and_bounded() {
    let stores = Stores::new();
    let engine = stores.engine();

    let p = engine.predict_fraud_probability(&order());
    assert!((0.0..=1.0).contains(&p));
}
