//! Sale notifications
//!
//! Best-effort Discord webhook post. Callers log failures and move on.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{PaymentError, Result};

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message`. `Ok(false)` means notifications are switched off.
    async fn notify(&self, message: &str) -> Result<bool>;
}

/// Parse an env-style toggle: `""`, `"false"` and `"0"` are off, anything else on
pub fn parse_toggle(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "" | "false" | "0")
}

/// Posts `{"content": message}` to a Discord webhook URL
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    /// A URL failing [`parse_toggle`] disables the notifier
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: parse_toggle(webhook_url).then(|| webhook_url.trim().to_string()),
        }
    }

    pub fn disabled() -> Self {
        Self::new("")
    }

    pub const fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) -> Result<bool> {
        let Some(url) = &self.webhook_url else {
            return Ok(false);
        };

        let response = self
            .client
            .post(url)
            .json(&json!({ "content": message }))
            .send()
            .await
            .map_err(|e| PaymentError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::Notification(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(true)
    }
}
