// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Progress events emitted by a run.

use std::fmt;

use serde::Serialize;

/// How a run that reached the device ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// Live mode opened the controller.
    Connected { device: String },
    /// Speed command issued for a spin step; the motor is ramping.
    Ramping {
        loop_index: u32,
        loop_count: u32,
        step: String,
        speed: u32,
    },
    /// One second of a spin step.
    Spinning {
        loop_index: u32,
        loop_count: u32,
        step: String,
        speed: u32,
        remaining: u32,
    },
    /// One second of a wait step.
    Waiting {
        loop_index: u32,
        loop_count: u32,
        step: String,
        remaining: u32,
    },
    /// The device was shut down; always the last event of a run that
    /// reached the device without error.
    Complete { outcome: RunOutcome },
    /// The run aborted on a device error. No `Complete` follows.
    Error { message: String },
}

impl RunEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { device } => write!(f, "Connected to {}", device),
            Self::Ramping {
                loop_index,
                loop_count,
                step,
                speed,
            } => write!(
                f,
                "Loop {}/{} | {}: Ramping to {} RPM...",
                loop_index, loop_count, step, speed
            ),
            Self::Spinning {
                loop_index,
                loop_count,
                step,
                speed,
                remaining,
            } => write!(
                f,
                "Loop {}/{} | {}: Spinning {} RPM ({}s left)",
                loop_index, loop_count, step, speed, remaining
            ),
            Self::Waiting {
                loop_index,
                loop_count,
                step,
                remaining,
            } => write!(
                f,
                "Loop {}/{} | {}: WAITING {}s...",
                loop_index, loop_count, step, remaining
            ),
            Self::Complete {
                outcome: RunOutcome::Completed,
            } => write!(f, "Process Complete."),
            Self::Complete {
                outcome: RunOutcome::Stopped,
            } => write!(f, "Process Stopped."),
            Self::Error { message } => write!(f, "Error: {}", message),
        }
    }
}
