// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message used when neither the response body nor the transport says anything useful.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// Status reported for failures that never produced an HTTP response.
pub const NO_RESPONSE_STATUS: u16 = 500;

/// Machine-readable error codes carried by [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    Network,
    BadResponse,
    Decode,
    Internal,
}

impl ErrorCode {
    /// Classify a non-2xx response status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::Timeout,
            400..=499 => Self::BadRequest,
            500..=599 => Self::BadResponse,
            _ => Self::Internal,
        }
    }

    /// Canonical status for errors raised locally rather than read off a response.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Timeout => 408,
            Self::BadResponse => 502,
            Self::Network | Self::Decode | Self::Internal => NO_RESPONSE_STATUS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Network => "NETWORK",
            Self::BadResponse => "BAD_RESPONSE",
            Self::Decode => "DECODE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform shape for every HTTP failure handed back to callers.
///
/// Transport-library error types never cross the client boundary; they are
/// normalized into this struct first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (status {status}, {code})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self { message: message.into(), status, code }
    }

    /// Normalize a non-2xx response. The body's `message` field wins when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = body_message(body)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        Self { message, status, code: ErrorCode::from_status(status) }
    }

    /// Normalize a failure that happened below HTTP (connect, timeout, decode).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::Timeout
        } else if err.is_connect() || err.is_request() {
            ErrorCode::Network
        } else if err.is_decode() {
            ErrorCode::Decode
        } else {
            ErrorCode::Internal
        };
        let status = err.status().map(|s| s.as_u16()).unwrap_or(NO_RESPONSE_STATUS);
        let message = err.to_string();
        let message = if message.is_empty() { DEFAULT_ERROR_MESSAGE.to_owned() } else { message };
        Self { message, status, code }
    }
}

/// Extract a non-empty `message` string from a JSON error body.
pub(crate) fn body_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

/// Why a token refresh cycle failed. Cloned to every request waiting on the cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("refresh response carried no access token")]
    MissingToken,
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh cycle ended without an outcome")]
    Interrupted,
}

/// Durable storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the session manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A login was attempted without an access token.
    #[error("access token missing; session not started")]
    InvalidCredentialsState,
    /// The refresh cycle failed; the session has been ended.
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("oauth: {0}")]
    OAuth(String),
    #[error("request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SessionError {
    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(e) => Some(e.status),
            Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Whether this error ended the session (tokens cleared, logout signalled).
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Refresh(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
