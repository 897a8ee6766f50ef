// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Drives one engine run from the command line.

use std::future::Future;
use std::str::FromStr;

use tracing::{info, warn};

use spin_core::{
    ActivitySink, Engine, ExecutionQueue, RecipeId, RecipeStore, RunEvent, RunMode, RunOutcome,
    RunPlan, SpinError, SpinResult,
};

/// One queue entry as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArg {
    Recipe(RecipeId),
    Wait(u32),
}

impl FromStr for StepArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("step '{}' must be recipe:<id> or wait:<secs>", s))?;
        match kind.trim().to_ascii_lowercase().as_str() {
            "recipe" if !value.trim().is_empty() => Ok(Self::Recipe(value.trim().into())),
            "wait" => value
                .trim()
                .parse::<u32>()
                .map(Self::Wait)
                .map_err(|e| format!("invalid wait '{}': {}", value, e)),
            _ => Err(format!("step '{}' must be recipe:<id> or wait:<secs>", s)),
        }
    }
}

/// Resolve step arguments into a queue. Recipes are snapshotted now, so
/// later edits do not affect the run.
pub fn build_queue(store: &RecipeStore, user: &str, steps: &[StepArg]) -> SpinResult<ExecutionQueue> {
    let mut queue = ExecutionQueue::new();
    for step in steps {
        match step {
            StepArg::Recipe(id) => queue.push_spin(store.snapshot(user, id)?)?,
            StepArg::Wait(secs) => queue.push_wait(*secs)?,
        }
    }
    Ok(queue)
}

/// Who runs the queue and how.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub user: &'a str,
    pub loop_count: u32,
    pub mode: RunMode,
}

/// Run the queue to completion, cancelling when `stop` resolves.
///
/// Returns `Ok(None)` when the queue is empty. The queue stays locked for
/// the duration of the run and the engine is acknowledged afterwards.
pub async fn run_queue<F>(
    engine: &Engine,
    queue: &mut ExecutionQueue,
    activity: &dyn ActivitySink,
    request: RunRequest<'_>,
    stop: F,
    mut on_event: impl FnMut(&RunEvent),
) -> SpinResult<Option<RunOutcome>>
where
    F: Future<Output = ()>,
{
    let user = request.user;
    if queue.is_empty() {
        return Ok(None);
    }

    let plan = RunPlan::new(queue.steps().to_vec(), request.loop_count, request.mode);
    let Some(mut handle) = engine.start(plan)? else {
        return Ok(None);
    };
    queue.lock();
    let canceller = handle.canceller();

    let started = format!(
        "Started {}: {}",
        request.mode.label(),
        queue.names().join(", ")
    );
    info!("{}", started);
    record(activity, user, &started);

    tokio::pin!(stop);
    let mut stopping = false;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => on_event(&event),
                None => break,
            },
            _ = &mut stop, if !stopping => {
                stopping = true;
                warn!("Emergency stop requested");
                canceller.cancel();
                record(activity, user, "Emergency Stop");
            }
        }
    }

    let result = handle.wait().await;
    queue.unlock();
    engine.acknowledge();
    record(activity, user, "Process Finished");
    info!("Process finished");
    result.map(Some)
}

fn record(activity: &dyn ActivitySink, user: &str, action: &str) {
    if let Err(e) = activity.record(user, action) {
        warn!("Failed to record activity '{}': {}", action, e);
    }
}

/// Reject loop counts outside `1..=max_loops`.
pub fn check_loops(loops: u32, max_loops: u32) -> SpinResult<u32> {
    if loops == 0 || loops > max_loops {
        return Err(SpinError::validation(format!(
            "loop count must be in 1..={}",
            max_loops
        )));
    }
    Ok(loops)
}
