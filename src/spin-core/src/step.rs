// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Steps and the execution queue.
//!
//! A spin step is a copy of a recipe taken when it is queued; editing or
//! renaming the recipe afterwards does not change a queued step.

use std::fmt;

use serde::Serialize;

use crate::recipe::{Recipe, RecipeId};
use crate::{SpinError, SpinResult};

/// Display name used for wait steps.
pub const WAIT_STEP_NAME: &str = "Wait";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinStep {
    /// Recipe the snapshot was taken from, if any.
    pub recipe_id: Option<RecipeId>,
    pub name: String,
    pub speed: u32,
    pub duration: u32,
    pub acceleration: u32,
}

impl SpinStep {
    pub fn from_recipe(id: &RecipeId, recipe: &Recipe) -> Self {
        Self {
            recipe_id: Some(id.clone()),
            name: recipe.name.clone(),
            speed: recipe.speed,
            duration: recipe.duration,
            acceleration: recipe.acceleration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitStep {
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Spin(SpinStep),
    Wait(WaitStep),
}

impl Step {
    pub fn wait(duration: u32) -> Self {
        Self::Wait(WaitStep { duration })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Spin(step) => &step.name,
            Self::Wait(_) => WAIT_STEP_NAME,
        }
    }

    pub fn duration(&self) -> u32 {
        match self {
            Self::Spin(step) => step.duration,
            Self::Wait(step) => step.duration,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin(step) => write!(
                f,
                "{} @ {} RPM for {}s",
                step.name, step.speed, step.duration
            ),
            Self::Wait(step) => write!(f, "WAIT {}s", step.duration),
        }
    }
}

/// Ordered steps assembled by an operator for one run.
///
/// Mutations are refused with [`SpinError::Busy`] while the queue is locked
/// for a run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionQueue {
    steps: Vec<Step>,
    locked: bool,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Freeze the queue for the duration of a run.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    fn ensure_unlocked(&self) -> SpinResult<()> {
        if self.locked {
            return Err(SpinError::Busy(
                "queue cannot change while a run is in progress".to_string(),
            ));
        }
        Ok(())
    }

    pub fn push_spin(&mut self, step: SpinStep) -> SpinResult<()> {
        self.ensure_unlocked()?;
        self.steps.push(Step::Spin(step));
        Ok(())
    }

    /// Append a pause. Waits must last at least one second.
    pub fn push_wait(&mut self, duration: u32) -> SpinResult<()> {
        self.ensure_unlocked()?;
        if duration == 0 {
            return Err(SpinError::validation("wait duration must be at least 1s"));
        }
        self.steps.push(Step::wait(duration));
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> SpinResult<Step> {
        self.ensure_unlocked()?;
        if index >= self.steps.len() {
            return Err(SpinError::not_found(format!(
                "queue position {} (queue has {} steps)",
                index,
                self.steps.len()
            )));
        }
        Ok(self.steps.remove(index))
    }

    pub fn clear(&mut self) -> SpinResult<()> {
        self.ensure_unlocked()?;
        self.steps.clear();
        Ok(())
    }

    /// Step names in queue order, as used in activity records.
    pub fn names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }
}
