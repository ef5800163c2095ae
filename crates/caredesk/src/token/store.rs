// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single source of truth for the session's tokens and cached user.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::auth::UserProfile;
use crate::error::{SessionError, StorageError};
use crate::scheduler::RefreshScheduler;
use crate::token::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Token persistence over a [`KeyValueStore`].
///
/// Clearing tokens also disarms the refresh scheduler, so no timer outlives
/// the tokens it was armed for.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    scheduler: RefreshScheduler,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, scheduler: RefreshScheduler) -> Self {
        Self { storage, scheduler }
    }

    /// Persist a token set.
    ///
    /// An empty access token is rejected and nothing is written. The refresh
    /// token and user are only written when given; omitting them leaves any
    /// stored values in place.
    pub fn set_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        user: Option<&UserProfile>,
    ) -> Result<(), SessionError> {
        debug!(
            has_access_token = !access_token.is_empty(),
            has_refresh_token = refresh_token.is_some_and(|t| !t.is_empty()),
            has_user = user.is_some(),
            "set_tokens"
        );
        if access_token.is_empty() {
            error!("set_tokens: access token is empty; nothing stored");
            return Err(SessionError::InvalidCredentialsState);
        }

        let user_json = user.map(serde_json::to_string).transpose().map_err(StorageError::from)?;
        let mut entries = vec![(ACCESS_TOKEN_KEY, access_token)];
        if let Some(refresh) = refresh_token.filter(|t| !t.is_empty()) {
            entries.push((REFRESH_TOKEN_KEY, refresh));
        }
        if let Some(ref json) = user_json {
            entries.push((USER_KEY, json.as_str()));
        }

        self.storage.set_all(&entries).map_err(|e| {
            warn!(err = %e, "failed to persist tokens");
            SessionError::from(e)
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Remove both tokens and disarm the refresh scheduler.
    ///
    /// Best effort: a storage failure is logged and returned, but the
    /// scheduler is disarmed regardless.
    pub fn clear_tokens(&self) -> Result<(), StorageError> {
        self.scheduler.cancel();
        self.storage.remove_all(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]).inspect_err(|e| {
            warn!(err = %e, "failed to clear tokens");
        })
    }

    /// Cached user record. Not proof of authentication on its own.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(err = %e, "ignoring unreadable cached user");
                None
            }
        }
    }

    pub fn set_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        let json = serde_json::to_string(user)?;
        self.storage.set(USER_KEY, &json)
    }

    pub fn clear_user(&self) -> Result<(), StorageError> {
        self.storage.remove(USER_KEY).inspect_err(|e| {
            warn!(err = %e, "failed to clear cached user");
        })
    }

    /// Remove tokens and the cached user in one write, disarming the scheduler.
    pub fn clear_session(&self) -> Result<(), StorageError> {
        self.scheduler.cancel();
        self.storage.remove_all(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY]).inspect_err(|e| {
            warn!(err = %e, "failed to clear session");
        })
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
