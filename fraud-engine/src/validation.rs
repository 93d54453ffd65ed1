//! Input validation for order contexts
//!
//! Runs before any check; a rejected context never reaches a provider.

use crate::{Error, OrderRiskContext, Result};
use rust_decimal::Decimal;
use std::net::IpAddr;

/// Validate required fields and their shape
pub fn validate_context(ctx: &OrderRiskContext) -> Result<()> {
    if ctx.customer_id.trim().is_empty() {
        return Err(Error::Validation("customer_id is required".to_string()));
    }

    validate_email(&ctx.email)?;

    ctx.ip_address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| {
            Error::Validation(format!("ip_address {:?} is not an IP address", ctx.ip_address))
        })?;

    if ctx.amount < Decimal::ZERO {
        return Err(Error::Validation(format!("amount {} is negative", ctx.amount)));
    }

    if ctx.items.is_empty() {
        return Err(Error::Validation("items must not be empty".to_string()));
    }

    for item in &ctx.items {
        if item.product_id.trim().is_empty() {
            return Err(Error::Validation("item product_id is required".to_string()));
        }
        if item.quantity == 0 {
            return Err(Error::Validation(format!(
                "item {} has zero quantity",
                item.product_id
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(Error::Validation(format!(
                "item {} has negative unit price",
                item.product_id
            )));
        }
    }

    if ctx.shipping_address.city.trim().is_empty() {
        return Err(Error::Validation("shipping_address.city is required".to_string()));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let (local, domain) = email
        .rsplit_once('@')
        .ok_or_else(|| Error::Validation(format!("email {:?} has no domain", email)))?;

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || email.contains(char::is_whitespace)
    {
        return Err(Error::Validation(format!("email {:?} is malformed", email)));
    }

    Ok(())
}
