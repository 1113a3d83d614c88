use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{errors::ClerkError, models::ClerkUserData};
use crate::utils::date::from_unix_seconds;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const DEFAULT_TOLERANCE_SECONDS: i64 = 5 * 60;

/// Svix header triples, prefixed first then the unbranded fallback.
const ID_HEADERS: [&str; 2] = ["svix-id", "webhook-id"];
const TIMESTAMP_HEADERS: [&str; 2] = ["svix-timestamp", "webhook-timestamp"];
const SIGNATURE_HEADERS: [&str; 2] = ["svix-signature", "webhook-signature"];

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Signed delivery timestamp; not part of the JSON body.
    #[serde(skip, default = "Utc::now")]
    pub delivered_at: DateTime<Utc>,
}

impl IdentityEvent {
    pub fn user_data(&self) -> Result<ClerkUserData, ClerkError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Verifies Clerk webhooks, which are delivered through Svix.
pub struct ClerkWebhookVerifier {
    key: Vec<u8>,
    tolerance: Duration,
}

impl ClerkWebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, ClerkError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ClerkError::InvalidSecret)?;
        if key.is_empty() {
            return Err(ClerkError::InvalidSecret);
        }
        Ok(Self {
            key,
            tolerance: Duration::seconds(DEFAULT_TOLERANCE_SECONDS),
        })
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<IdentityEvent, ClerkError> {
        self.verify_at(headers, body, Utc::now())
    }

    pub fn verify_at(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<IdentityEvent, ClerkError> {
        let msg_id = header(headers, &ID_HEADERS).ok_or(ClerkError::MissingHeader("svix-id"))?;
        let timestamp = header(headers, &TIMESTAMP_HEADERS)
            .ok_or(ClerkError::MissingHeader("svix-timestamp"))?;
        let signatures = header(headers, &SIGNATURE_HEADERS)
            .ok_or(ClerkError::MissingHeader("svix-signature"))?;

        let delivered_at = timestamp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(from_unix_seconds)
            .ok_or(ClerkError::TimestampOutOfRange)?;
        if (now - delivered_at).abs() > self.tolerance {
            return Err(ClerkError::TimestampOutOfRange);
        }

        let expected = self.sign(msg_id, timestamp.trim(), body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| expected.as_bytes().ct_eq(sig.as_bytes()).into());
        if !matched {
            return Err(ClerkError::SignatureMismatch);
        }

        let mut event: IdentityEvent = serde_json::from_slice(body)?;
        event.delivered_at = delivered_at;
        Ok(event)
    }

    /// Base64 HMAC-SHA256 of `"{id}.{timestamp}.{body}"`.
    pub fn sign(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<String, ClerkError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| ClerkError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
