// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login, registration, logout and Google OAuth endpoints.
//!
//! All of these go out with [`ApiRequest::without_refresh`]: a 401 from an
//! auth endpoint means bad credentials, not an expired session.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ApiClient, ApiRequest, ApiResponse};
use crate::config::endpoints;
use crate::error::{ApiError, ErrorCode, SessionError};

/// Cached identity of the signed-in user. Never proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    /// "First Last", falling back to the email when no name is known.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_owned()
        }
    }
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Session material returned by login, registration and the OAuth exchange.
///
/// The bearer arrives as either `accessToken` or the older `token`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl AuthPayload {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: Option<UserProfile>,
    ) -> Self {
        Self { access_token: Some(access_token.into()), token: None, refresh_token, user }
    }

    /// The access token under either field name. Empty strings count as absent.
    pub fn bearer(&self) -> Option<&str> {
        non_empty(&self.access_token).or_else(|| non_empty(&self.token))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPayload")
            .field("has_bearer", &self.bearer().is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user)
            .finish()
    }
}

/// Query parameters the OAuth provider redirected back with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Typed access to the auth endpoints.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, SessionError> {
        debug!("login");
        let request = ApiRequest::post(endpoints::LOGIN).json(credentials)?.without_refresh();
        auth_payload(self.client.send(request).await?)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload, SessionError> {
        debug!("register");
        let request = ApiRequest::post(endpoints::REGISTER).json(registration)?.without_refresh();
        auth_payload(self.client.send(request).await?)
    }

    /// Invalidate the session server-side.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.client.send(ApiRequest::post(endpoints::LOGOUT).without_refresh()).await?;
        Ok(())
    }

    /// URL of the backend endpoint that starts the Google sign-in flow.
    pub fn google_login_url(&self) -> String {
        format!("{}{}", self.client.base_url(), endpoints::GOOGLE)
    }

    /// Exchange the provider's authorization code for a session.
    pub async fn oauth_callback(&self, params: &OAuthCallback) -> Result<AuthPayload, SessionError> {
        if let Some(ref error) = params.error {
            let message =
                if error.is_empty() { "OAuth authentication failed" } else { error.as_str() };
            return Err(SessionError::OAuth(message.to_owned()));
        }
        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            return Err(SessionError::OAuth("No authorization code received".to_owned()));
        };

        let mut request = ApiRequest::get(endpoints::GOOGLE_CALLBACK).query("code", code);
        if let Some(ref state) = params.state {
            request = request.query("state", state.as_str());
        }
        auth_payload(self.client.send(request.without_refresh()).await?)
    }
}

fn auth_payload(response: ApiResponse) -> Result<AuthPayload, SessionError> {
    let status = response.status;
    serde_json::from_value(response.data()).map_err(|e| {
        ApiError::new(ErrorCode::Decode, status, format!("unexpected auth response: {e}")).into()
    })
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
