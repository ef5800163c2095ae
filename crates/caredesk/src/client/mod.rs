// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP client with single-flight reactive token refresh.
//!
//! Every request carries the stored access token. A 401 on a request that
//! has not been replayed yet closes the [`RefreshGate`]: the first such
//! request refreshes the token, every other one queues behind it, and all of
//! them observe the same outcome. On success each request is replayed once
//! with the new token. On failure the session is ended: tokens and the cached
//! user are cleared, `auth:logout` is broadcast and the navigator is sent to
//! the login route.

pub mod refresh;
pub mod request;

use std::sync::{Arc, Once, Weak};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::{endpoints, ClientConfig};
use crate::error::{ApiError, ErrorCode, RefreshError, SessionError};
use crate::event::{LogoutReason, SessionEvent};
use crate::navigate::Navigator;
use crate::token::TokenStore;

pub use refresh::{Entry, RefreshCycle, RefreshGate, RefreshOutcome, TokenGrant, Waiter};
pub use request::{ApiRequest, ApiResponse};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const UNAUTHORIZED: u16 = 401;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls. Only the first call has effect.
fn ensure_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

struct ClientInner {
    http: reqwest::Client,
    base: String,
    login_route: String,
    store: TokenStore,
    gate: RefreshGate,
    events: broadcast::Sender<SessionEvent>,
    navigator: Arc<dyn Navigator>,
}

/// Cheap to clone; clones share the token store and the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

/// Non-owning handle, for callbacks that must not keep the client alive.
#[derive(Clone)]
pub struct WeakApiClient {
    inner: Weak<ClientInner>,
}

impl WeakApiClient {
    pub fn upgrade(&self) -> Option<ApiClient> {
        self.inner.upgrade().map(|inner| ApiClient { inner })
    }
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: TokenStore,
        events: broadcast::Sender<SessionEvent>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(|e| SessionError::Config(format!("{e:#}")))?;
        ensure_crypto_provider();
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SessionError::Config(format!("http client: {e}")))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base: config.base().to_owned(),
                login_route: config.login_route.clone(),
                store,
                gate: RefreshGate::new(),
                events,
                navigator,
            }),
        })
    }

    pub fn downgrade(&self) -> WeakApiClient {
        WeakApiClient { inner: Arc::downgrade(&self.inner) }
    }

    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base
    }

    pub fn login_route(&self) -> &str {
        &self.inner.login_route
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn events(&self) -> &broadcast::Sender<SessionEvent> {
        &self.inner.events
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.gate.is_refreshing()
    }

    /// Requests parked behind the running refresh.
    pub fn queued_requests(&self) -> usize {
        self.inner.gate.queued()
    }

    /// Send `request`, refreshing and replaying it once on a 401.
    ///
    /// Non-2xx responses and transport failures come back as
    /// [`SessionError::Api`]; a failed refresh comes back as
    /// [`SessionError::Refresh`] after the session has been ended.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let token = self.inner.store.access_token();
        let (status, body) = self.dispatch(&request, token.as_deref()).await?;
        if status != UNAUTHORIZED || request.retried {
            return Ok(into_response(status, &body)?);
        }

        request.retried = true;
        debug!(request = %request.id, path = %request.path, "unauthorized; refreshing token");
        let fresh = self.refresh().await?;
        let (status, body) = self.dispatch(&request, Some(&fresh)).await?;
        Ok(into_response(status, &body)?)
    }

    /// Obtain a new access token, joining the refresh already in flight if any.
    ///
    /// The refresh itself runs on its own task: dropping this future does not
    /// abort the cycle that other callers are queued behind.
    pub async fn refresh(&self) -> Result<String, SessionError> {
        let rx = match self.inner.gate.enter() {
            Entry::Waiter(waiter) => {
                debug!(position = waiter.position(), "waiting on in-flight token refresh");
                return Ok(waiter.outcome().await?);
            }
            Entry::Leader(cycle) => {
                let (tx, rx) = oneshot::channel();
                let client = self.clone();
                tokio::spawn(async move {
                    let _ = tx.send(client.lead_refresh(cycle).await);
                });
                rx
            }
        };
        Ok(rx.await.unwrap_or(Err(RefreshError::Interrupted))?)
    }

    async fn lead_refresh(&self, cycle: RefreshCycle) -> RefreshOutcome {
        match self.request_grant().await {
            Ok(grant) => {
                let store = &self.inner.store;
                // The grant is still good for this cycle even if it could not be persisted.
                if let Err(e) =
                    store.set_tokens(&grant.access_token, grant.refresh_token.as_deref(), None)
                {
                    warn!(err = %e, "refreshed token not persisted");
                }
                store.scheduler().schedule(&grant.access_token);
                cycle.settle(Ok(grant.access_token.clone()));
                info!(rotated = grant.refresh_token.is_some(), "access token refreshed");
                let _ = self.inner.events.send(SessionEvent::TokenRefreshed);
                Ok(grant.access_token)
            }
            Err(err) => {
                error!(err = %err, "token refresh failed; ending session");
                self.force_logout();
                cycle.settle(Err(err.clone()));
                Err(err)
            }
        }
    }

    async fn request_grant(&self) -> Result<TokenGrant, RefreshError> {
        let Some(refresh_token) = self.inner.store.refresh_token() else {
            return Err(RefreshError::MissingRefreshToken);
        };
        let url = format!("{}{}", self.inner.base, endpoints::REFRESH);
        let resp = self
            .inner
            .http
            .post(url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(ApiError::from_transport(&e).message))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| RefreshError::Transport(ApiError::from_transport(&e).message))?;
        if !(200..300).contains(&status) {
            let message = ApiError::from_response(status, &text).message;
            return Err(RefreshError::Rejected { status, message });
        }
        let body: Value = serde_json::from_str(&text).map_err(|_| RefreshError::MissingToken)?;
        TokenGrant::from_body(&body).ok_or(RefreshError::MissingToken)
    }

    /// Clear the local session, broadcast the forced logout and navigate to login.
    ///
    /// Teardown completes before `auth:logout` is sent, so a login made in
    /// response to the signal is never undone by it.
    fn force_logout(&self) {
        let _ = self.inner.store.clear_session();
        let _ = self.inner.events.send(SessionEvent::LoggedOut { reason: LogoutReason::Forced });
        self.inner.navigator.redirect(&self.inner.login_route);
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<(u16, String), ApiError> {
        let url = self.url(request)?;
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, request.id.to_string());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            debug!(request = %request.id, err = %e, "request failed");
            ApiError::from_transport(&e)
        })?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| ApiError::from_transport(&e))?;
        debug!(request = %request.id, method = %request.method, path = %request.path, status, "response");
        Ok((status, text))
    }

    fn url(&self, request: &ApiRequest) -> Result<reqwest::Url, ApiError> {
        let raw = format!("{}/{}", self.inner.base, request.path.trim_start_matches('/'));
        let mut url = reqwest::Url::parse(&raw).map_err(|e| {
            let code = ErrorCode::BadRequest;
            ApiError::new(code, code.http_status(), format!("invalid request url {raw:?}: {e}"))
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    pub async fn get(&self, path: &str) -> Result<Value, SessionError> {
        Ok(self.send(ApiRequest::get(path)).await?.data())
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, SessionError> {
        Ok(self.send(ApiRequest::post(path).json(body)?).await?.data())
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, SessionError> {
        Ok(self.send(ApiRequest::put(path).json(body)?).await?.data())
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, SessionError> {
        Ok(self.send(ApiRequest::patch(path).json(body)?).await?.data())
    }

    pub async fn delete(&self, path: &str) -> Result<Value, SessionError> {
        Ok(self.send(ApiRequest::delete(path)).await?.data())
    }
}

fn into_response(status: u16, body: &str) -> Result<ApiResponse, ApiError> {
    if (200..300).contains(&status) {
        ApiResponse::parse(status, body)
    } else {
        Err(ApiError::from_response(status, body))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
