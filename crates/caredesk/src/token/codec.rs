// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unverified decoding of bearer token payloads.
//!
//! Only the middle (payload) segment is read, to learn when the token
//! expires. Signatures are never checked here; the server stays the
//! authority. Any malformed input decodes to an empty [`TokenClaims`],
//! which callers treat as "expiration unknown".

use std::time::{SystemTime, UNIX_EPOCH};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

/// URL-safe base64 that tolerates both padded and unpadded segments.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Time claims recovered from a token payload, in epoch seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenClaims {
    pub exp: Option<f64>,
    pub iat: Option<f64>,
}

impl TokenClaims {
    pub fn is_empty(&self) -> bool {
        self.exp.is_none() && self.iat.is_none()
    }
}

/// Decode the payload segment of `token`. Never fails.
pub fn decode(token: &str) -> TokenClaims {
    if token.is_empty() {
        warn!("decode: token is empty");
        return TokenClaims::default();
    }

    let segments: Vec<&str> = token.split('.').collect();
    let payload = match segments.as_slice() {
        [_, payload, _] if !payload.is_empty() => *payload,
        _ => {
            warn!(segments = segments.len(), "decode: invalid token format");
            return TokenClaims::default();
        }
    };

    // Accept standard-alphabet characters too; some issuers mix them in.
    let normalized = payload.replace('+', "-").replace('/', "_");
    let bytes = match PAYLOAD_ENGINE.decode(normalized.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(err = %e, "decode: payload is not base64");
            return TokenClaims::default();
        }
    };
    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(err = %e, "decode: payload is not json");
            return TokenClaims::default();
        }
    };

    TokenClaims { exp: epoch_claim(&value, "exp"), iat: epoch_claim(&value, "iat") }
}

/// A numeric, non-zero claim. Zero counts as absent.
fn epoch_claim(value: &serde_json::Value, name: &str) -> Option<f64> {
    value.get(name)?.as_f64().filter(|v| *v != 0.0 && v.is_finite())
}

/// Expiration instant of `token` in epoch milliseconds, if known.
pub fn expiration_millis(token: &str) -> Option<i64> {
    decode(token).exp.map(|exp| (exp * 1000.0) as i64)
}

/// True when the expiration is unknown or already reached.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis())
}

/// [`is_expired`] against an explicit clock reading.
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match expiration_millis(token) {
        Some(exp_ms) => now_ms >= exp_ms,
        None => true,
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
