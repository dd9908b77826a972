//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Product or price identifier does not resolve upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport/auth failure talking to Stripe or the document store
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    InvalidSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook decode error: {0}")]
    Decode(String),

    /// Checkout session completed without nickname/product metadata
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Product referenced by a webhook event cannot be resolved
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Payment record could not be written or read
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Sale notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PaymentError {
    /// HTTP status code this error maps to
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidSignature(_)
            | Self::Decode(_)
            | Self::MissingMetadata(_)
            | Self::InvalidProduct(_)
            | Self::InvalidRequest(_) => 400,
            Self::Upstream(_) => 502,
            Self::Persistence(_) | Self::Notification(_) | Self::Config(_) => 500,
        }
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::Decode(_) => "DECODE_ERROR",
            Self::MissingMetadata(_) => "MISSING_METADATA",
            Self::InvalidProduct(_) => "INVALID_PRODUCT",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Notification(_) => "NOTIFICATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Product not found",
            Self::Upstream(_) => "Payment provider unavailable. Please try again.",
            Self::InvalidSignature(_) => "Failed to verify webhook signature",
            Self::Decode(_) => "Error parsing event data",
            Self::MissingMetadata(_) => "nickname or product_id not provided",
            Self::InvalidProduct(_) => "Incorrect product_id",
            Self::InvalidRequest(_) => "Invalid request",
            _ => "An error occurred processing your request.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PaymentError::NotFound("prod_x".into()).status_code(), 404);
        assert_eq!(PaymentError::InvalidSignature("bad".into()).status_code(), 400);
        assert_eq!(PaymentError::MissingMetadata("nickname".into()).status_code(), 400);
        assert_eq!(PaymentError::Upstream("timeout".into()).status_code(), 502);
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = PaymentError::Upstream("api key sk_live_123 rejected".into());
        assert!(!err.user_message().contains("sk_live"));
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }
}
