//! Assess one order from a JSON file against the production providers
//!
//! Usage: `fraud-assess <order.json> [config.toml]`
//!
//! Without a config file, defaults plus `FRAUD_ENGINE_*` environment
//! overrides are used. Set `FRAUD_ENGINE_LOG_JSON=1` for JSON logs.

use anyhow::{bail, Context};
use fraud_engine::{providers, Config, FraudEngine, OrderRiskContext};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if std::env::var("FRAUD_ENGINE_LOG_JSON").is_ok() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut args = std::env::args().skip(1);
    let Some(order_path) = args.next() else {
        bail!("usage: fraud-assess <order.json> [config.toml]");
    };

    let config = match args.next() {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    let raw = std::fs::read_to_string(&order_path)
        .with_context(|| format!("reading {}", order_path))?;
    let order: OrderRiskContext =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", order_path))?;

    let providers = providers::connect(&config.providers, config.provider_timeout())
        .await
        .context("connecting providers")?;
    let engine = FraudEngine::new(config, providers)?;

    // Ctrl-C abandons unfinished checks but still prints an assessment
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let assessment = engine.assess_order_with_cancel(&order, &cancel).await?;
    tracing::info!(
        "Assessed order for {}: {} ({})",
        order.customer_id,
        assessment.risk_score,
        assessment.risk_level
    );

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    println!(
        "advisory_probability: {:.3}",
        engine.predict_fraud_probability(&order)
    );

    Ok(())
}
