//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `STOREFRONT_API_URL` - Backend base URL (default: `http://localhost:5000`)
//! - `STOREFRONT_STATE_DIR` - Directory holding the persisted cart (default: `.storefront`)
//! - `STOREFRONT_CART_KEY` - Storage key for the cart (default: `cart`)
//! - `STOREFRONT_SHIPPING_FLAT` - Flat shipping fee (default: 10)
//! - `STOREFRONT_TAX_RATE` - Tax rate as a fraction (default: 0.13)
//! - `STOREFRONT_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use crate::domain::value_objects::Pricing;
use crate::storage::DEFAULT_CART_KEY;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_STATE_DIR: &str = ".storefront";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the storefront backend
    pub api_url: Url,
    /// Directory for durable client state
    pub state_dir: PathBuf,
    /// Key the cart is stored under
    pub cart_key: String,
    pub shipping_flat: Decimal,
    pub tax_rate: Decimal,
    pub http_timeout: Duration,
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|name| std::env::var(name).ok()) }

    /// Loads configuration through `lookup`, which returns the raw value of
    /// a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get("STOREFRONT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url).map_err(|e| invalid("STOREFRONT_API_URL", e))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(invalid("STOREFRONT_API_URL", "scheme must be http or https"));
        }

        let state_dir = get("STOREFRONT_STATE_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);
        let cart_key = get("STOREFRONT_CART_KEY").unwrap_or_else(|| DEFAULT_CART_KEY.to_string());

        let defaults = Pricing::default();
        let shipping_flat = parse_or("STOREFRONT_SHIPPING_FLAT", get("STOREFRONT_SHIPPING_FLAT"), defaults.shipping_flat())?;
        let tax_rate = parse_or("STOREFRONT_TAX_RATE", get("STOREFRONT_TAX_RATE"), defaults.tax_rate())?;
        if shipping_flat.is_sign_negative() {
            return Err(invalid("STOREFRONT_SHIPPING_FLAT", "must not be negative"));
        }
        if tax_rate.is_sign_negative() {
            return Err(invalid("STOREFRONT_TAX_RATE", "must not be negative"));
        }

        let timeout_secs = parse_or("STOREFRONT_HTTP_TIMEOUT_SECS", get("STOREFRONT_HTTP_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(invalid("STOREFRONT_HTTP_TIMEOUT_SECS", "must be at least 1"));
        }

        Ok(Self { api_url, state_dir, cart_key, shipping_flat, tax_rate, http_timeout: Duration::from_secs(timeout_secs) })
    }

    pub fn pricing(&self) -> Pricing { Pricing::new(self.shipping_flat, self.tax_rate) }
}

fn invalid(name: &str, reason: impl ToString) -> ConfigError { ConfigError::InvalidEnvVar(name.to_string(), reason.to_string()) }

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.map_or(Ok(default), |raw| raw.parse().map_err(|e| invalid(name, e)))
}
