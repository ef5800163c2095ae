// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer-side view of the session, as a UI layer would keep it.
//!
//! [`AuthState`] never reads the token store. It is driven purely by
//! [`SessionEvent`]s, so it shows exactly what an unrelated subscriber sees
//! when the refresh path ends the session.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::UserProfile;
use crate::event::SessionEvent;
use crate::session::SessionCoordinator;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { theme: Theme::Light, language: "en".to_owned() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub is_authenticated: bool,
    pub profile: Option<UserProfile>,
    pub preferences: Preferences,
}

#[derive(Debug, Default)]
pub struct AuthState {
    inner: RwLock<AuthSnapshot>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the session as it stands now.
    pub fn from_session(session: &SessionCoordinator) -> Self {
        let snapshot = AuthSnapshot {
            is_authenticated: session.is_authenticated(),
            profile: session.current_user(),
            preferences: Preferences::default(),
        };
        Self { inner: RwLock::new(snapshot) }
    }

    pub fn apply(&self, event: &SessionEvent) {
        let mut state = self.inner.write();
        match event {
            SessionEvent::LoggedIn { user } => {
                state.is_authenticated = true;
                state.profile = user.clone();
            }
            SessionEvent::TokenRefreshed => {}
            SessionEvent::LoggedOut { reason } => {
                debug!(?reason, "auth state cleared");
                state.is_authenticated = false;
                state.profile = None;
            }
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.read().profile.clone()
    }

    /// Merge preference changes. Unset fields keep their value.
    pub fn update_preferences(&self, theme: Option<Theme>, language: Option<String>) {
        let mut state = self.inner.write();
        if let Some(theme) = theme {
            state.preferences.theme = theme;
        }
        if let Some(language) = language {
            state.preferences.language = language;
        }
    }

    /// Apply every event from `rx` until `shutdown` fires or the channel closes.
    pub fn follow(
        self: &Arc<Self>,
        mut rx: broadcast::Receiver<SessionEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(event) => state.apply(&event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("auth state lagged by {n} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
