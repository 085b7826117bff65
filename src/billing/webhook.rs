//! Stripe webhook verification and event interpretation.
//!
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]` signs `"{t}.{body}"`
//! with HMAC-SHA256 keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("timestamp outside tolerance")]
    Expired,

    #[error("no matching signature")]
    Mismatch,

    #[error("invalid event payload: {0}")]
    Payload(String),
}

pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => {
                if let Ok(bytes) = hex::decode(v) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now_unix - ts).abs() > TOLERANCE_SECS {
        return Err(WebhookError::Expired);
    }

    let signed = |sig: &[u8]| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice compares in constant time
        mac.verify_slice(sig).is_ok()
    };

    if signatures.iter().any(|s| signed(s)) {
        Ok(())
    } else {
        Err(WebhookError::Mismatch)
    }
}

/// Tier transition an event asks for. Every variant is an idempotent set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierChange {
    ProByUser { user_id: Uuid, customer_id: Option<String> },
    ProByEmail { email: String, customer_id: Option<String> },
    ProByCustomer { customer_id: String },
    FreeByCustomer { customer_id: String },
    Ignore,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn interpret_event(payload: &[u8]) -> Result<TierChange, WebhookError> {
    let event: Event =
        serde_json::from_slice(payload).map_err(|e| WebhookError::Payload(e.to_string()))?;
    let object = &event.data.object;
    // expanded objects carry the customer as a map; only plain ids count
    let customer_id = str_field(object, "customer");

    let change = match event.kind.as_str() {
        "checkout.session.completed" => {
            let user_id = object
                .get("metadata")
                .and_then(|m| m.get("userId"))
                .and_then(Value::as_str);
            let email = str_field(object, "customer_email")
                .or_else(|| object.get("customer_details").and_then(|d| str_field(d, "email")));

            match (user_id, email, customer_id) {
                (Some(id), _, customer_id) => match Uuid::parse_str(id) {
                    Ok(user_id) => TierChange::ProByUser { user_id, customer_id },
                    Err(_) => TierChange::Ignore,
                },
                (None, Some(email), customer_id) => TierChange::ProByEmail { email, customer_id },
                (None, None, Some(customer_id)) => TierChange::ProByCustomer { customer_id },
                (None, None, None) => TierChange::Ignore,
            }
        }
        "customer.subscription.deleted" | "invoice.payment_failed" => match customer_id {
            Some(customer_id) => TierChange::FreeByCustomer { customer_id },
            None => TierChange::Ignore,
        },
        _ => TierChange::Ignore,
    };
    Ok(change)
}
