// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const LOGOUT: &str = "/auth/logout";
    pub const REFRESH: &str = "/auth/refresh";
    pub const GOOGLE: &str = "/auth/google";
    pub const GOOGLE_CALLBACK: &str = "/auth/google/callback";
}

/// Connection and session settings for the API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "CAREDESK_API_BASE_URL")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "CAREDESK_API_TIMEOUT")]
    pub timeout_ms: u64,

    /// Directory holding the persisted session. Resolved from XDG/HOME if unset.
    #[arg(long, env = "CAREDESK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Seconds before expiry at which the access token is refreshed.
    #[arg(long, default_value_t = 60, env = "CAREDESK_REFRESH_LEAD_SECS")]
    pub refresh_lead_secs: u64,

    /// Route to navigate to when the session is forcibly ended.
    #[arg(long, default_value = DEFAULT_LOGIN_ROUTE, env = "CAREDESK_LOGIN_ROUTE")]
    pub login_route: String,

    /// Refresh when the scheduler fires instead of waiting for the next 401.
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "CAREDESK_PROACTIVE_REFRESH"
    )]
    pub proactive_refresh: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            state_dir: None,
            refresh_lead_secs: 60,
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            proactive_refresh: true,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("invalid --base-url {:?}: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("--base-url must be http or https, got {}", url.scheme());
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be greater than zero");
        }
        if self.login_route.is_empty() {
            anyhow::bail!("--login-route must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_lead(&self) -> Duration {
        Duration::from_secs(self.refresh_lead_secs)
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

/// Fallback directory for persisted session state when none is configured.
///
/// Checks `$XDG_STATE_HOME/caredesk`, then `$HOME/.local/state/caredesk`.
/// `CAREDESK_STATE_DIR` is read by clap into [`ClientConfig::state_dir`].
pub fn default_state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("caredesk");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/caredesk");
    }
    PathBuf::from(".caredesk")
}

/// Authenticated session client for the caredesk API.
#[derive(Debug, Parser)]
#[command(name = "caredesk", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "CAREDESK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CAREDESK_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.client.validate()?;
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("--log-format must be json or text, got {:?}", self.log_format);
        }
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAREDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAREDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session locally and on the server.
    Logout,
    /// Print whether a session is active and who it belongs to.
    Status,
    /// Print the URL that starts the Google sign-in flow.
    OauthUrl,
    /// Finish a Google sign-in with the parameters the provider redirected with.
    OauthCallback {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        error: Option<String>,
    },
    /// Send an authenticated request and print the response data.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,
        /// Path relative to the base URL, e.g. `/patients`.
        path: String,
        /// JSON request body.
        #[arg(long)]
        data: Option<String>,
        /// Query parameter as `key=value`. Repeatable.
        #[arg(long = "query")]
        query: Vec<String>,
    },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
