//! Environment configuration

use std::time::Duration;

use checkout_payments::webhook::DEFAULT_TOLERANCE;
use checkout_payments::{CheckoutConfig, PaymentError, RecordingMode, Result};

const DEFAULT_PORT: u16 = 8080;

/// Everything the server reads from the environment
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Stripe secret API key
    pub stripe_key: String,

    /// Webhook signing secret
    pub webhook_secret: String,

    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Redirect targets for hosted checkout
    pub checkout: CheckoutConfig,

    pub port: u16,

    /// Discord webhook URL; `""`, `false` or `0` disables notifications
    pub notification_webhook: String,

    pub recording_mode: RecordingMode,

    /// Maximum webhook signature age, `None` when disabled
    pub webhook_tolerance: Option<Duration>,
}

impl ServerConfig {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| PaymentError::Config(format!("{key} not set")))
        };

        let port = match lookup("API_PORT").filter(|p| !p.trim().is_empty()) {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| PaymentError::Config(format!("API_PORT is not a port: {port}")))?,
            None => DEFAULT_PORT,
        };

        let recording_mode = lookup("PAYMENT_RECORDING_MODE")
            .unwrap_or_default()
            .parse()?;

        // 0 turns the age check off
        let webhook_tolerance = match lookup("WEBHOOK_TOLERANCE_SECS").filter(|t| !t.trim().is_empty()) {
            Some(secs) => {
                let secs = secs.trim().parse::<u64>().map_err(|_| {
                    PaymentError::Config(format!("WEBHOOK_TOLERANCE_SECS is not a number: {secs}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(DEFAULT_TOLERANCE),
        };

        Ok(Self {
            stripe_key: required("STRIPE_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: required("MONGODB_DATABASE")?,
            checkout: CheckoutConfig {
                success_url: required("CHECKOUT_SUCCESS_URL")?,
                cancel_url: required("CHECKOUT_CANCEL_URL")?,
            },
            port,
            notification_webhook: lookup("STRIPE_DISCORD_WEBHOOK").unwrap_or_default(),
            recording_mode,
            webhook_tolerance,
        })
    }
}
