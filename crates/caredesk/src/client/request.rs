// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound request and response envelopes.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ErrorCode, SessionError};

/// A request routed through [`ApiClient`](super::ApiClient).
///
/// Carries its own retry flag: once a request has been replayed after a
/// token refresh, another 401 is returned to the caller instead of starting
/// a second refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) retried: bool,
    pub(crate) id: Uuid,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
            id: Uuid::new_v4(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, SessionError> {
        self.body = Some(serde_json::to_value(body).map_err(SessionError::Encode)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Opt out of the refresh-and-replay path: a 401 goes straight back to
    /// the caller. Used by the auth endpoints themselves.
    pub fn without_refresh(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Correlation id sent as `X-Request-Id`. Stable across the replay.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Parse a raw response body. Empty bodies read as `null`.
    pub(crate) fn parse(status: u16, text: &str) -> Result<Self, ApiError> {
        if text.trim().is_empty() {
            return Ok(Self { status, body: Value::Null });
        }
        serde_json::from_str(text).map(|body| Self { status, body }).map_err(|e| {
            ApiError::new(ErrorCode::Decode, status, format!("invalid response body: {e}"))
        })
    }

    /// The `data` member of the response envelope, or the whole body when
    /// the server did not wrap it.
    pub fn data(self) -> Value {
        match self.body {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            other => other,
        }
    }
}
