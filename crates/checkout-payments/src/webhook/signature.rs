//! Stripe webhook signatures
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The HMAC-SHA256
//! is computed over `"{t}.{payload}"` with the endpoint's signing secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::event::{self, WebhookEvent};
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// A payload whose signature has been checked. Only verified payloads can
/// be decoded into events.
#[derive(Clone, Copy, Debug)]
pub struct VerifiedPayload<'a> {
    payload: &'a str,
    timestamp: i64,
}

impl<'a> VerifiedPayload<'a> {
    /// Timestamp the provider signed
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub const fn payload(&self) -> &'a str {
        self.payload
    }

    /// Whether the signature is no older than `tolerance_secs` at `now`
    pub const fn is_fresh(&self, tolerance_secs: i64, now: i64) -> bool {
        now.saturating_sub(self.timestamp) <= tolerance_secs
    }

    /// Decode the event envelope
    pub fn decode(self) -> Result<WebhookEvent> {
        event::decode(self.payload)
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let t = value
                    .parse()
                    .map_err(|_| PaymentError::InvalidSignature("invalid timestamp in header".into()))?;
                timestamp = Some(t);
            }
            // Non-hex entries cannot match, skip them
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp in header".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("missing v1 signature in header".into()));
    }

    Ok(SignatureHeader { timestamp, signatures })
}

fn mac_for(secret: &str, timestamp: i64, payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Config("invalid webhook secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Verify `header` over `payload` with `secret`.
///
/// Pure: the verdict depends only on the three inputs. Timestamp freshness
/// is checked separately with [`VerifiedPayload::is_fresh`].
pub fn verify_signature<'a>(payload: &'a str, header: &str, secret: &str) -> Result<VerifiedPayload<'a>> {
    let header = parse_header(header)?;

    for signature in &header.signatures {
        // verify_slice compares in constant time
        if mac_for(secret, header.timestamp, payload)?
            .verify_slice(signature)
            .is_ok()
        {
            return Ok(VerifiedPayload {
                payload,
                timestamp: header.timestamp,
            });
        }
    }

    Err(PaymentError::InvalidSignature("no matching v1 signature".into()))
}

/// Produce a valid `Stripe-Signature` header for `payload`
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Result<String> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}
