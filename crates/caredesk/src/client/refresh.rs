// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight coordination for token refresh.
//!
//! The first caller to [`RefreshGate::enter`] while no refresh is running
//! becomes the leader and receives a [`RefreshCycle`]. Everyone else gets a
//! [`Waiter`] queued behind it. The leader settles the cycle once with the
//! refresh outcome; waiters are resolved in the order they queued, and the
//! gate only reopens when the cycle guard is dropped.
//!
//! The lock is only held for the check-and-set and the drain; it is never
//! held across an `.await`. A cycle owns its share of the gate, so it can be
//! moved into a task that outlives the caller which started it.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::RefreshError;

/// The shared result of one refresh cycle: the new access token or why it failed.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct GateState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    settled: Option<RefreshOutcome>,
}

#[derive(Default)]
pub struct RefreshGate {
    state: Arc<Mutex<GateState>>,
}

/// Role handed out by [`RefreshGate::enter`].
pub enum Entry {
    Leader(RefreshCycle),
    Waiter(Waiter),
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh cycle, or start one.
    pub fn enter(&self) -> Entry {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            return Entry::Waiter(Waiter { rx, position: state.waiters.len() });
        }
        state.refreshing = true;
        state.settled = None;
        Entry::Leader(RefreshCycle { state: Arc::clone(&self.state) })
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers parked behind the running refresh.
    pub fn queued(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

/// A caller parked behind the running refresh.
pub struct Waiter {
    rx: oneshot::Receiver<RefreshOutcome>,
    position: usize,
}

impl Waiter {
    /// 1-based place in the queue at the time of enqueue.
    pub fn position(&self) -> usize {
        self.position
    }

    pub async fn outcome(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Interrupted))
    }
}

/// Leadership of one refresh cycle. Dropping it reopens the gate.
pub struct RefreshCycle {
    state: Arc<Mutex<GateState>>,
}

impl RefreshCycle {
    /// Resolve every queued waiter, in FIFO order, with `outcome`.
    ///
    /// The gate stays closed afterwards; callers arriving before the cycle
    /// is dropped are resolved with the same outcome on drop.
    pub fn settle(&self, outcome: RefreshOutcome) {
        let mut state = self.state.lock();
        while let Some(tx) = state.waiters.pop_front() {
            let _ = tx.send(outcome.clone());
        }
        state.settled = Some(outcome);
    }
}

impl Drop for RefreshCycle {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let outcome = state.settled.take().unwrap_or(Err(RefreshError::Interrupted));
        while let Some(tx) = state.waiters.pop_front() {
            let _ = tx.send(outcome.clone());
        }
        state.refreshing = false;
    }
}

/// Tokens handed back by the refresh and login endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    /// Read `{data: {accessToken | token, refreshToken?}}`.
    ///
    /// `accessToken` and the legacy `token` are equivalent; an empty value
    /// counts as absent. Unwrapped bodies are accepted too.
    pub fn from_body(body: &Value) -> Option<Self> {
        let payload = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
        let non_empty = |key: &str| {
            payload.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned)
        };
        let access_token = non_empty("accessToken").or_else(|| non_empty("token"))?;
        Some(Self { access_token, refresh_token: non_empty("refreshToken") })
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
