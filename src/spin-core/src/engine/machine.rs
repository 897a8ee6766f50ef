// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Engine state machine.
//!
//! `Idle -> Running -> (Completed | Stopped) -> Idle`. A run that fails to
//! reach the device goes straight back to `Idle`.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::RunMode;

/// Events that can trigger state transitions in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A run was accepted
    Started(RunMode),
    /// All loops finished
    Finished,
    /// The run was cancelled and the device shut down
    Cancelled,
    /// The run aborted on a device error
    Failed,
    /// The presentation layer saw the terminal state
    Acknowledged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data")]
pub enum EngineState {
    #[default]
    Idle,
    Running {
        mode: RunMode,
        started_at: Option<u64>,
    },
    Completed,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running { mode, .. } => write!(f, "Running {}", mode.label()),
            Self::Completed => write!(f, "Completed"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Completed or stopped, waiting for acknowledgement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

#[derive(Debug, Clone)]
pub struct EngineStateMachine {
    state: EngineState,
    transition_count: u64,
    last_transition: Option<Instant>,
}

impl Default for EngineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineStateMachine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Idle,
            transition_count: 0,
            last_transition: None,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn time_in_state(&self) -> Option<Duration> {
        self.last_transition.map(|t| t.elapsed())
    }

    /// Process an event. Returns true if a transition occurred.
    pub fn process_event(&mut self, event: EngineEvent) -> bool {
        let Some(state) = self.next_state(event) else {
            return false;
        };
        self.state = state;
        self.transition_count += 1;
        self.last_transition = Some(Instant::now());
        true
    }

    fn next_state(&self, event: EngineEvent) -> Option<EngineState> {
        match (&self.state, event) {
            (EngineState::Idle, EngineEvent::Started(mode)) => Some(EngineState::Running {
                mode,
                started_at: Some(
                    std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0),
                ),
            }),
            (EngineState::Running { .. }, EngineEvent::Finished) => Some(EngineState::Completed),
            (EngineState::Running { .. }, EngineEvent::Cancelled) => Some(EngineState::Stopped),
            (EngineState::Running { .. }, EngineEvent::Failed) => Some(EngineState::Idle),
            (EngineState::Completed | EngineState::Stopped, EngineEvent::Acknowledged) => {
                Some(EngineState::Idle)
            }
            _ => None,
        }
    }
}
