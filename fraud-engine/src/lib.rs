//! Fraud Engine
//!
//! Real-time fraud risk assessment for marketplace orders at checkout.
//!
//! Ten independent signal checks run concurrently against the order context
//! and a set of external [`providers`]. Their scores are averaged into a
//! 0-100 [`RiskScore`], classified into a [`RiskLevel`] and turned into a
//! [`FraudAssessment`] carrying flags, recommendations and the block /
//! manual-review decision.
//!
//! ```no_run
//! # use fraud_engine::{OrderRiskContext, Providers};
//! # async fn run(providers: Providers, order: OrderRiskContext) -> fraud_engine::Result<()> {
//! use fraud_engine::{Config, FraudEngine};
//!
//! let engine = FraudEngine::new(Config::default(), providers)?;
//! let assessment = engine.assess_order(&order).await?;
//! if assessment.is_blocked() {
//!     // stop checkout
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod predictor;
pub mod providers;
pub mod scoring;
pub mod types;
pub mod validation;

pub use checks::SignalCheck;
pub use config::Config;
pub use engine::FraudEngine;
pub use error::{Error, ProviderError, ProviderResult, Result};
pub use metrics::Metrics;
pub use predictor::FraudPredictor;
pub use providers::{IpInfo, Providers};
pub use scoring::{RiskScorer, BLOCKED_REASON};
pub use types::*;
