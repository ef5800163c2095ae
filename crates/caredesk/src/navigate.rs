// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hard navigation to the login entry point after a forced logout.
//!
//! The session manager does not own a UI. Whatever hosts it decides what a
//! full navigation means: a terminal front-end prints a sign-in hint, an
//! embedding shell could reload its view.

use parking_lot::Mutex;
use tracing::warn;

pub trait Navigator: Send + Sync {
    /// Leave the current context entirely and land on `route`.
    fn redirect(&self, route: &str);
}

/// Logs the redirect and tells the terminal user how to sign back in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, route: &str) {
        warn!(route, "session ended; redirecting to login");
        eprintln!("Session expired. Sign in again (login route: {route}).");
    }
}

/// Records every redirect. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: &str) {
        self.visits.lock().push(route.to_owned());
    }
}
