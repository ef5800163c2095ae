// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proactive refresh timer.
//!
//! A single slot holds at most one armed timer. Arming always cancels the
//! previous timer first, so there is never more than one pending fire.
//! When a timer fires the slot returns to idle and the fire hook runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::token::codec;

/// Default lead time between the scheduled refresh and the token's expiry.
pub const DEFAULT_REFRESH_LEAD: Duration = Duration::from_secs(60);

type FireHook = Arc<dyn Fn() + Send + Sync>;

/// An armed timer. Dropping the handle does not cancel; only `cancel` does.
struct TimerHandle {
    id: u64,
    cancel: CancellationToken,
    deadline: tokio::time::Instant,
}

struct Inner {
    lead: Duration,
    slot: Mutex<Option<TimerHandle>>,
    next_id: AtomicU64,
    hook: Mutex<Option<FireHook>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.slot.get_mut().take() {
            timer.cancel.cancel();
        }
    }
}

/// Single-slot refresh timer. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    pub fn new(lead: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                lead,
                slot: Mutex::new(None),
                next_id: AtomicU64::new(1),
                hook: Mutex::new(None),
            }),
        }
    }

    /// Install the callback run when a timer fires. Replaces any previous hook.
    pub fn on_fire(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.inner.hook.lock() = Some(Arc::new(hook));
    }

    pub fn lead(&self) -> Duration {
        self.inner.lead
    }

    /// Arm a timer to fire `lead` before `token` expires.
    ///
    /// Any armed timer is cancelled first. Returns whether a new timer was
    /// armed: empty tokens, unknown expirations and tokens inside the lead
    /// window leave the scheduler idle.
    pub fn schedule(&self, token: &str) -> bool {
        self.cancel();

        if token.is_empty() {
            warn!("schedule: token is empty");
            return false;
        }
        let Some(exp_ms) = codec::expiration_millis(token) else {
            warn!("cannot schedule refresh: token has no expiration");
            return false;
        };
        let lead_ms = i64::try_from(self.inner.lead.as_millis()).unwrap_or(i64::MAX);
        let until_refresh_ms = exp_ms.saturating_sub(codec::now_millis()).saturating_sub(lead_ms);
        if until_refresh_ms <= 0 {
            warn!("token expired or expiring soon; refresh not scheduled");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; refresh not scheduled");
            return false;
        };

        let delay = Duration::from_millis(until_refresh_ms as u64);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let timer = TimerHandle {
            id,
            cancel: cancel.clone(),
            deadline: tokio::time::Instant::now() + delay,
        };

        let mut slot = self.inner.slot.lock();
        // Another caller may have armed between our cancel and now.
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }
        *slot = Some(timer);
        drop(slot);

        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => fire(&weak, id),
            }
        });

        info!(in_secs = delay.as_secs(), "token refresh scheduled");
        true
    }

    /// Disarm the current timer, if any. Idempotent.
    pub fn cancel(&self) {
        if let Some(timer) = self.inner.slot.lock().take() {
            timer.cancel.cancel();
            debug!(timer = timer.id, "token refresh cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    /// Time left until the armed timer fires.
    pub fn time_until_fire(&self) -> Option<Duration> {
        self.inner
            .slot
            .lock()
            .as_ref()
            .map(|t| t.deadline.saturating_duration_since(tokio::time::Instant::now()))
    }
}

/// Return to idle and run the hook, unless timer `id` was replaced meanwhile.
fn fire(inner: &Weak<Inner>, id: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let hook = {
        let mut slot = inner.slot.lock();
        if slot.as_ref().map(|t| t.id) != Some(id) {
            return;
        }
        *slot = None;
        inner.hook.lock().clone()
    };
    debug!(timer = id, "token refresh due");
    if let Some(hook) = hook {
        hook();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
