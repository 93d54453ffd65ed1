//! Core types for fraud engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Postal address as submitted at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street line
    #[serde(default)]
    pub line1: String,
    /// City
    pub city: String,
    /// Postal code
    #[serde(default)]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code
    #[serde(default)]
    pub country: String,
}

impl Address {
    /// Same city and postal code, ignoring case and surrounding whitespace
    pub fn same_locality(&self, other: &Address) -> bool {
        same_text(&self.city, &other.city) && same_text(&self.postal_code, &other.postal_code)
    }
}

pub(crate) fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// One order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier
    pub product_id: String,
    /// Quantity ordered
    pub quantity: u32,
    /// Unit price
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity times unit price
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Declared payment method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment; `bin` holds the leading card digits when known
    Card {
        /// Bank identification number
        #[serde(default)]
        bin: Option<String>,
    },
    /// Bank transfer
    BankTransfer,
    /// Wallet (e-money) payment
    Wallet,
    /// Cash on delivery
    CashOnDelivery,
    /// Anything else
    #[default]
    Other,
}

/// Everything the engine knows about an order at checkout
///
/// `amount` is expected to equal the sum of line-item subtotals; the engine
/// does not re-derive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRiskContext {
    /// Customer identifier
    pub customer_id: String,
    /// Customer email
    pub email: String,
    /// Customer phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Source IP address
    pub ip_address: String,
    /// Requested amount
    pub amount: Decimal,
    /// Order lines
    pub items: Vec<LineItem>,
    /// Shipping address
    pub shipping_address: Address,
    /// Billing address
    #[serde(default)]
    pub billing_address: Option<Address>,
    /// Declared payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Client user agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Opaque client device identifier
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    /// Time the order was placed; time-windowed checks are relative to it
    #[serde(default)]
    pub placed_at: Option<DateTime<Utc>>,
}

impl OrderRiskContext {
    /// Reference time for time-windowed checks
    pub fn order_time(&self) -> DateTime<Utc> {
        self.placed_at.unwrap_or_else(Utc::now)
    }

    /// Total quantity across all lines
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// Risk score (0-100)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RiskScore(u8);

impl RiskScore {
    /// Create new risk score, capped at 100
    pub fn new(score: u8) -> Self {
        Self(score.min(100))
    }

    /// Get raw score
    pub fn score(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Score below 30
    Low,
    /// Score 30-59
    Medium,
    /// Score 60-79
    High,
    /// Score 80 and above
    Critical,
}

impl RiskLevel {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl From<RiskScore> for RiskLevel {
    fn from(score: RiskScore) -> Self {
        match score.score() {
            0..=29 => RiskLevel::Low,
            30..=59 => RiskLevel::Medium,
            60..=79 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the check that produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Orders per customer in a trailing window
    Velocity,
    /// Email domain, denylist and local-part shape
    EmailReputation,
    /// Proxy/VPN/Tor, blacklist and origin country
    IpReputation,
    /// Phone format and cancellation history
    PhoneVerification,
    /// Account age, order value and quantity
    Behavioral,
    /// Device fingerprint presence and denylist
    DeviceFingerprint,
    /// IP city against shipping city
    Geolocation,
    /// Order value against the customer's average
    AmountAnomaly,
    /// Billing against shipping locality
    AddressMismatch,
    /// Payment instrument analysis
    PaymentInstrument,
}

impl CheckType {
    /// All checks in execution order
    pub const ALL: [CheckType; 10] = [
        CheckType::Velocity,
        CheckType::EmailReputation,
        CheckType::IpReputation,
        CheckType::PhoneVerification,
        CheckType::Behavioral,
        CheckType::DeviceFingerprint,
        CheckType::Geolocation,
        CheckType::AmountAnomaly,
        CheckType::AddressMismatch,
        CheckType::PaymentInstrument,
    ];

    /// Snake-case name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Velocity => "velocity",
            CheckType::EmailReputation => "email_reputation",
            CheckType::IpReputation => "ip_reputation",
            CheckType::PhoneVerification => "phone_verification",
            CheckType::Behavioral => "behavioral",
            CheckType::DeviceFingerprint => "device_fingerprint",
            CheckType::Geolocation => "geolocation",
            CheckType::AmountAnomaly => "amount_anomaly",
            CheckType::AddressMismatch => "address_mismatch",
            CheckType::PaymentInstrument => "payment_instrument",
        }
    }

    /// Category of the flags this check raises
    pub fn flag_category(&self) -> FlagCategory {
        match self {
            CheckType::Velocity => FlagCategory::Velocity,
            CheckType::EmailReputation => FlagCategory::Email,
            CheckType::IpReputation => FlagCategory::IpAnonymizer,
            CheckType::PhoneVerification => FlagCategory::Phone,
            CheckType::Behavioral => FlagCategory::Behavior,
            CheckType::DeviceFingerprint => FlagCategory::Device,
            CheckType::Geolocation => FlagCategory::Location,
            CheckType::AmountAnomaly => FlagCategory::Amount,
            CheckType::AddressMismatch => FlagCategory::Address,
            CheckType::PaymentInstrument => FlagCategory::Payment,
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a flag is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagCategory {
    /// Order rate
    Velocity,
    /// Email address
    Email,
    /// Proxy, VPN or Tor exit
    IpAnonymizer,
    /// Source IP on the blacklist
    IpBlacklist,
    /// Source IP outside the home country
    IpOrigin,
    /// Phone number
    Phone,
    /// Account and basket behavior
    Behavior,
    /// Client device
    Device,
    /// IP location against shipping location
    Location,
    /// Order value
    Amount,
    /// Billing/shipping addresses
    Address,
    /// Payment instrument
    Payment,
}

/// Human-readable reason a check contributed risk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flag {
    /// Category
    pub category: FlagCategory,
    /// Message shown to reviewers
    pub message: String,
}

impl Flag {
    /// Create new flag
    pub fn new(category: FlagCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Output of one signal check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    /// Check that produced this result
    pub check_type: CheckType,
    /// Score 0-100, higher is riskier
    pub score: u8,
    /// Every flag whose condition fired, in evaluation order
    pub flags: Vec<Flag>,
    /// Why the check could not complete; set only with score 0 and no flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl SignalResult {
    /// Result with no risk
    pub fn clear(check_type: CheckType) -> Self {
        Self {
            check_type,
            score: 0,
            flags: Vec::new(),
            degraded: None,
        }
    }

    /// Result for a check that could not complete
    pub fn degraded(check_type: CheckType, reason: impl Into<String>) -> Self {
        Self {
            degraded: Some(reason.into()),
            ..Self::clear(check_type)
        }
    }

    /// Record a fired condition. The score keeps the maximum seen so far.
    pub fn raise(&mut self, score: u8, message: impl Into<String>) {
        self.raise_as(self.check_type.flag_category(), score, message);
    }

    /// Record a fired condition under an explicit category
    pub fn raise_as(&mut self, category: FlagCategory, score: u8, message: impl Into<String>) {
        self.score = self.score.max(score.min(100));
        self.flags.push(Flag::new(category, message));
    }

    /// Whether the check could not complete
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Follow-up action derived from flag categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Velocity flags present
    RateLimiting,
    /// Email flags present
    EmailVerification,
    /// Blacklisted-IP or IP-location flags present
    AdditionalAuthentication,
}

impl Recommendation {
    /// Text shown to reviewers
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::RateLimiting => "Implement rate limiting",
            Recommendation::EmailVerification => "Require email verification",
            Recommendation::AdditionalAuthentication => "Additional authentication required",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraud assessment result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAssessment {
    /// Aggregated score
    pub risk_score: RiskScore,

    /// Level derived from the score
    pub risk_level: RiskLevel,

    /// All flags, in check execution order
    pub flags: Vec<Flag>,

    /// Set only for critical assessments
    pub blocked_reason: Option<String>,

    /// True for high and critical assessments
    pub requires_manual_review: bool,

    /// Deduplicated follow-up actions
    pub recommendations: Vec<Recommendation>,

    /// Per-check breakdown, in execution order
    pub signals: Vec<SignalResult>,
}

impl FraudAssessment {
    /// Whether checkout should stop
    pub fn is_blocked(&self) -> bool {
        self.blocked_reason.is_some()
    }
}
