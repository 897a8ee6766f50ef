// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Activity recording seam.
//!
//! The store and the run controller report user actions through
//! [`ActivitySink`]; the CSV history file lives in `spin-history`.

use std::sync::Mutex;

use crate::SpinResult;

/// User recorded when an action has no acting user.
pub const UNKNOWN_USER: &str = "Unknown";

/// Receiver of user action records.
pub trait ActivitySink: Send + Sync {
    fn record(&self, user: &str, action: &str) -> SpinResult<()>;
}

/// Map an empty user name to [`UNKNOWN_USER`].
pub fn user_or_unknown(user: &str) -> &str {
    if user.trim().is_empty() {
        UNKNOWN_USER
    } else {
        user
    }
}

/// In-memory sink that keeps `(user, action)` pairs in order.
#[derive(Default)]
pub struct MemoryActivity {
    actions: Mutex<Vec<(String, String)>>,
}

impl MemoryActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<(String, String)> {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ActivitySink for MemoryActivity {
    fn record(&self, user: &str, action: &str) -> SpinResult<()> {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((user_or_unknown(user).to_string(), action.to_string()));
        Ok(())
    }
}

/// Sink that drops everything.
pub struct NoActivity;

impl ActivitySink for NoActivity {
    fn record(&self, _user: &str, _action: &str) -> SpinResult<()> {
        Ok(())
    }
}
