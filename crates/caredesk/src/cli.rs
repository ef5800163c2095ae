// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line front-end over a session persisted in the state directory.

use std::sync::Arc;

use anyhow::Context;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::auth::{Credentials, OAuthCallback, Registration, UserProfile};
use crate::client::ApiRequest;
use crate::config::{Cli, Command};
use crate::navigate::LogNavigator;
use crate::session::SessionCoordinator;
use crate::token::FileStorage;

pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let state_dir = cli.client.resolved_state_dir();
    let storage = FileStorage::open(&state_dir)
        .with_context(|| format!("opening session state in {}", state_dir.display()))?;
    debug!(path = %storage.path().display(), "session storage");

    let session = SessionCoordinator::new(&cli.client, Arc::new(storage), Arc::new(LogNavigator))?;
    session.initialize();

    match cli.command {
        Command::Login { email, password } => {
            let user = session.login_with_password(&Credentials { email, password }).await?;
            println!("{}", signed_in(user.as_ref()));
        }
        Command::Register { first_name, last_name, email, password } => {
            let registration = Registration { first_name, last_name, email, password };
            let user = session.register(&registration).await?;
            println!("{}", signed_in(user.as_ref()));
        }
        Command::Logout => {
            session.logout().await?;
            println!("Signed out.");
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&session.status())?);
        }
        Command::OauthUrl => {
            println!("{}", session.auth().google_login_url());
        }
        Command::OauthCallback { code, state, error } => {
            let user = session.complete_oauth(&OAuthCallback { code, state, error }).await?;
            println!("{}", signed_in(user.as_ref()));
        }
        Command::Request { method, path, data, query } => {
            let request = build_request(&method, &path, data.as_deref(), &query)?;
            let response = session.client().send(request).await?;
            println!("{}", serde_json::to_string_pretty(&response.data())?);
        }
    }
    Ok(())
}

fn signed_in(user: Option<&UserProfile>) -> String {
    match user {
        Some(user) => format!("Signed in as {}.", user.display_name()),
        None => "Signed in.".to_owned(),
    }
}

/// Turn `request` subcommand arguments into an [`ApiRequest`].
pub fn build_request(
    method: &str,
    path: &str,
    data: Option<&str>,
    query: &[String],
) -> anyhow::Result<ApiRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid HTTP method: {method}"))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.json(&body)?;
    }
    for pair in query {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--query expects key=value, got {pair:?}"))?;
        request = request.query(key, value);
    }
    Ok(request)
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
