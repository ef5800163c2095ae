// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caredesk: authenticated HTTP session manager for the caredesk API.
//!
//! Keeps the access/refresh token pair, refreshes the access token ahead of
//! expiry, and routes requests through a pipeline that performs one shared
//! refresh for any number of concurrent 401s before replaying them.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod navigate;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{AuthPayload, AuthService, Credentials, OAuthCallback, Registration, UserProfile};
pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use config::ClientConfig;
pub use error::{ApiError, ErrorCode, RefreshError, SessionError, StorageError};
pub use event::{LogoutReason, SessionEvent, AUTH_LOGOUT};
pub use navigate::{LogNavigator, Navigator, RecordingNavigator};
pub use scheduler::RefreshScheduler;
pub use session::{SessionCoordinator, SessionStatus};
pub use state::AuthState;
pub use token::{FileStorage, KeyValueStore, MemoryStorage, TokenStore};
