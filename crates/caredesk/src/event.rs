// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-change signals fanned out to every observer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::UserProfile;

/// Name of the signal raised whenever a session ends.
pub const AUTH_LOGOUT: &str = "auth:logout";
pub const AUTH_LOGIN: &str = "auth:login";
pub const AUTH_REFRESHED: &str = "auth:refreshed";

const EVENT_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out.
    Explicit,
    /// The refresh path failed irrecoverably.
    Forced,
}

/// Events broadcast on the session channel. Token values are never carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    #[serde(rename = "auth:login")]
    LoggedIn { user: Option<UserProfile> },
    #[serde(rename = "auth:refreshed")]
    TokenRefreshed,
    #[serde(rename = "auth:logout")]
    LoggedOut { reason: LogoutReason },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoggedIn { .. } => AUTH_LOGIN,
            Self::TokenRefreshed => AUTH_REFRESHED,
            Self::LoggedOut { .. } => AUTH_LOGOUT,
        }
    }
}

/// Create the session event channel.
pub fn channel() -> (broadcast::Sender<SessionEvent>, broadcast::Receiver<SessionEvent>) {
    broadcast::channel(EVENT_CAPACITY)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
