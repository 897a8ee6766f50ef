// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Controller text protocol: one ASCII line `SPEED:<rpm>\n` per change.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::SpinError;

const PREFIX: &str = "SPEED:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeedCommand {
    pub rpm: u32,
}

impl SpeedCommand {
    pub fn new(rpm: u32) -> Self {
        Self { rpm }
    }

    pub fn stop() -> Self {
        Self { rpm: 0 }
    }

    pub fn is_stop(&self) -> bool {
        self.rpm == 0
    }

    /// Wire form including the trailing newline.
    pub fn encode(&self) -> String {
        format!("{}{}\n", PREFIX, self.rpm)
    }
}

impl fmt::Display for SpeedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.rpm)
    }
}

impl FromStr for SpeedCommand {
    type Err = SpinError;

    /// Parse one protocol line; the trailing newline is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.strip_suffix('\n').unwrap_or(s);
        let value = line
            .strip_prefix(PREFIX)
            .ok_or_else(|| SpinError::validation(format!("not a speed command: {:?}", s)))?;
        let rpm = value
            .parse::<u32>()
            .map_err(|e| SpinError::validation(format!("bad speed '{}': {}", value, e)))?;
        Ok(Self { rpm })
    }
}
