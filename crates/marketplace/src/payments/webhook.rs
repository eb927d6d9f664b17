//! Payment processor notifications: signature verification and event parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::stripe::CheckoutSession;
use super::{PaymentCompleted, UnpaidSession};
use common::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Event types that complete a purchase.
pub const FULFILLING_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`).
///
/// The signed payload is `{t}.{body}`; any `v1` entry may match. Timestamps
/// further than `tolerance_seconds` from `now` are rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: i64,
    now: i64,
) -> AppResult<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::bad_request("Missing signature timestamp"))?;
    if signatures.is_empty() {
        return Err(AppError::bad_request("Missing signature"));
    }
    if (now - timestamp).abs() > tolerance_seconds {
        return Err(AppError::bad_request("Signature timestamp outside tolerance"));
    }

    let matched = signatures.iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(AppError::bad_request("Invalid webhook signature"))
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

/// A parsed notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Completed(PaymentCompleted),
    /// A fulfilling event type whose session has not settled; a later
    /// `async_payment_succeeded` event completes it.
    Unpaid(UnpaidSession),
    Ignored(String),
}

/// Parse a verified notification body.
pub fn parse_event(payload: &[u8]) -> AppResult<PaymentEvent> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| AppError::bad_request(format!("Malformed event: {e}")))?;

    if !FULFILLING_EVENTS.contains(&envelope.event_type.as_str()) {
        return Ok(PaymentEvent::Ignored(envelope.event_type));
    }

    let session: CheckoutSession = serde_json::from_value(envelope.data.object)
        .map_err(|e| AppError::bad_request(format!("Malformed checkout session: {e}")))?;
    Ok(match session.into_completed() {
        Ok(completed) => PaymentEvent::Completed(completed),
        Err(unpaid) => PaymentEvent::Unpaid(unpaid),
    })
}
