// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: login, logout and startup restore.
//!
//! The coordinator owns the wiring between the token store, the refresh
//! scheduler and the API client. It is the only writer of tokens apart from
//! the client's refresh path.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthPayload, AuthService, Credentials, OAuthCallback, Registration, UserProfile};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::event::{self, LogoutReason, SessionEvent};
use crate::navigate::Navigator;
use crate::scheduler::RefreshScheduler;
use crate::token::{codec, KeyValueStore, TokenStore};

/// Point-in-time view of the session, safe to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    /// Seconds until the proactive refresh fires, if one is armed.
    pub refresh_in_secs: Option<u64>,
    pub has_refresh_token: bool,
}

pub struct SessionCoordinator {
    client: ApiClient,
    auth: AuthService,
}

impl SessionCoordinator {
    /// Wire a session over `storage`.
    ///
    /// A forced logout needs no reaction here: the client clears tokens and
    /// the cached user before it broadcasts `auth:logout`.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Arc<Self>, SessionError> {
        let scheduler = RefreshScheduler::new(config.refresh_lead());
        let store = TokenStore::new(storage, scheduler.clone());
        let (events, _) = event::channel();
        let client = ApiClient::new(config, store, events, navigator)?;
        install_fire_hook(&scheduler, &client, config.proactive_refresh);

        Ok(Arc::new(Self { auth: AuthService::new(client.clone()), client }))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn store(&self) -> &TokenStore {
        self.client.store()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.client.subscribe()
    }

    /// Restore a persisted session at startup.
    ///
    /// A live stored token arms the refresh timer; an expired or undecodable
    /// one is cleared. Returns whether a live session was found.
    pub fn initialize(&self) -> bool {
        let store = self.store();
        let Some(token) = store.access_token() else {
            debug!("no stored session");
            return false;
        };
        if codec::is_expired(&token) {
            info!("stored access token expired; clearing");
            let _ = store.clear_tokens();
            return false;
        }
        store.scheduler().schedule(&token);
        info!("session restored");
        true
    }

    /// Start a session from a login, registration or OAuth payload.
    pub fn login(&self, payload: &AuthPayload) -> Result<(), SessionError> {
        let Some(access_token) = payload.bearer() else {
            error!("login payload carried no access token; session not started");
            return Err(SessionError::InvalidCredentialsState);
        };
        let store = self.store();
        store.set_tokens(access_token, payload.refresh_token.as_deref(), payload.user.as_ref())?;
        if payload.user.is_none() {
            // A previous user's profile must not survive into this session.
            let _ = store.clear_user();
        }
        store.scheduler().schedule(access_token);

        info!(has_refresh_token = payload.refresh_token.is_some(), "session started");
        let _ = self.client.events().send(SessionEvent::LoggedIn { user: payload.user.clone() });
        Ok(())
    }

    pub async fn login_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<UserProfile>, SessionError> {
        let payload = self.auth.login(credentials).await?;
        self.login(&payload)?;
        Ok(payload.user)
    }

    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Option<UserProfile>, SessionError> {
        let payload = self.auth.register(registration).await?;
        self.login(&payload)?;
        Ok(payload.user)
    }

    pub async fn complete_oauth(
        &self,
        params: &OAuthCallback,
    ) -> Result<Option<UserProfile>, SessionError> {
        let payload = self.auth.oauth_callback(params).await?;
        self.login(&payload)?;
        Ok(payload.user)
    }

    /// End the session.
    ///
    /// The server-side invalidation is best effort. Local teardown and the
    /// `auth:logout` signal always happen; only a local storage failure is
    /// reported back.
    pub async fn logout(&self) -> Result<(), SessionError> {
        if let Err(e) = self.auth.logout().await {
            warn!(err = %e, "remote logout failed; clearing local session anyway");
        }
        let cleared = self.store().clear_session();
        let _ = self.client.events().send(SessionEvent::LoggedOut { reason: LogoutReason::Explicit });
        info!("logged out");
        cleared.map_err(SessionError::from)
    }

    /// Whether an access token is stored. A cached user alone does not count.
    pub fn is_authenticated(&self) -> bool {
        self.store().access_token().is_some()
    }

    /// The cached user, but only while a session exists.
    pub fn current_user(&self) -> Option<UserProfile> {
        if !self.is_authenticated() {
            return None;
        }
        self.store().user()
    }

    pub fn status(&self) -> SessionStatus {
        let store = self.store();
        SessionStatus {
            authenticated: self.is_authenticated(),
            user: self.current_user(),
            refresh_in_secs: store.scheduler().time_until_fire().map(|d| d.as_secs()),
            has_refresh_token: store.refresh_token().is_some(),
        }
    }
}

/// When the timer fires, either refresh now or leave it to the next 401.
fn install_fire_hook(scheduler: &RefreshScheduler, client: &ApiClient, proactive: bool) {
    let weak = client.downgrade();
    scheduler.on_fire(move || {
        if !proactive {
            debug!("access token near expiry; refreshing on next 401");
            return;
        }
        let Some(client) = weak.upgrade() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; proactive refresh skipped");
            return;
        };
        runtime.spawn(async move {
            match client.refresh().await {
                Ok(_) => debug!("proactive refresh complete"),
                Err(e) => warn!(err = %e, "proactive refresh failed"),
            }
        });
    });
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
