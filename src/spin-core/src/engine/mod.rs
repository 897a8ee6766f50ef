// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Execution engine.
//!
//! A run drains an ordered step list against the motor on a dedicated tokio
//! task. Progress comes back as [`RunEvent`]s over a channel and the
//! controlling side stops a run through a [`CancelHandle`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::device::MotorDriver;
use crate::step::Step;
use crate::{SpinError, SpinResult};

pub mod cancel;
pub mod events;
pub mod machine;
mod runner;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use events::{RunEvent, RunOutcome};
pub use machine::{EngineEvent, EngineState, EngineStateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// No device I/O at all.
    Simulated,
    /// Commands go to the motor controller.
    Live,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Simulated => "[SIM]",
            Self::Live => "[LIVE]",
        }
    }
}

/// Timing of the progress loop.
#[derive(Debug, Clone, Copy)]
pub struct EngineTiming {
    /// Length of one progress tick (one second of step duration).
    pub tick: Duration,
    /// Pause after a speed change before ticks start.
    pub settle: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            settle: Duration::from_secs(1),
        }
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub steps: Vec<Step>,
    /// Number of times the whole step list is repeated.
    pub loop_count: u32,
    pub mode: RunMode,
}

impl RunPlan {
    pub fn new(steps: Vec<Step>, loop_count: u32, mode: RunMode) -> Self {
        Self {
            steps,
            loop_count,
            mode,
        }
    }
}

/// Controlling side of an active run.
#[derive(Debug)]
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<RunEvent>,
    cancel: CancelHandle,
    task: JoinHandle<SpinResult<RunOutcome>>,
}

impl RunHandle {
    /// Next progress event; `None` once the run has ended and all events
    /// were received.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Request a stop. Takes effect at the next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel handle usable while events are being received.
    pub fn canceller(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the worker to finish.
    pub async fn wait(self) -> SpinResult<RunOutcome> {
        self.task
            .await
            .map_err(|e| SpinError::Worker(e.to_string()))?
    }
}

pub struct Engine {
    driver: Option<Arc<dyn MotorDriver>>,
    timing: EngineTiming,
    machine: Arc<Mutex<EngineStateMachine>>,
}

impl Engine {
    /// `driver` is only used in live mode; `None` makes every live run fail
    /// with [`SpinError::DriverUnavailable`].
    pub fn new(driver: Option<Arc<dyn MotorDriver>>, timing: EngineTiming) -> Self {
        Self {
            driver,
            timing,
            machine: Arc::new(Mutex::new(EngineStateMachine::new())),
        }
    }

    pub fn state(&self) -> EngineState {
        self.machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state()
            .clone()
    }

    /// Return a completed or stopped engine to idle.
    pub fn acknowledge(&self) -> bool {
        self.machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .process_event(EngineEvent::Acknowledged)
    }

    /// Start a run on a new tokio task.
    ///
    /// An empty step list is a no-op and returns `Ok(None)`. A terminal
    /// state from a previous run is acknowledged implicitly.
    pub fn start(&self, plan: RunPlan) -> SpinResult<Option<RunHandle>> {
        if plan.steps.is_empty() {
            debug!("Ignoring start with empty step list");
            return Ok(None);
        }
        if plan.loop_count == 0 {
            return Err(SpinError::validation("loop count must be at least 1"));
        }

        {
            let mut machine = self.machine.lock().unwrap_or_else(|e| e.into_inner());
            if machine.state().is_running() {
                return Err(SpinError::Busy("a run is already in progress".to_string()));
            }
            machine.process_event(EngineEvent::Acknowledged);
            machine.process_event(EngineEvent::Started(plan.mode));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel, token) = cancel_pair();
        let worker = runner::Worker {
            plan,
            driver: self.driver.clone(),
            timing: self.timing,
            events: event_tx,
            cancel: token,
        };
        let machine = self.machine.clone();
        let task = tokio::spawn(async move {
            let result = worker.run().await;
            let event = match &result {
                Ok(RunOutcome::Completed) => EngineEvent::Finished,
                Ok(RunOutcome::Stopped) => EngineEvent::Cancelled,
                Err(_) => EngineEvent::Failed,
            };
            machine
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .process_event(event);
            result
        });

        Ok(Some(RunHandle {
            events: event_rx,
            cancel,
            task,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::command::SpeedCommand;
    use crate::device::{DriverInfo, LinkFuture, MotorLink};
    use crate::step::{SpinStep, WaitStep};
    use crate::DynResult;

    #[derive(Clone, Default)]
    struct Wire(Arc<Mutex<Vec<String>>>);

    impl Wire {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct RecordingDriver {
        info: DriverInfo,
        wire: Wire,
        fail_open: bool,
        /// Encoded command whose send fails after reaching the wire.
        fail_on: Option<String>,
    }

    impl RecordingDriver {
        fn new(wire: Wire) -> Self {
            Self {
                info: DriverInfo {
                    name: "recording".to_string(),
                    device: "TEST0".to_string(),
                },
                wire,
                fail_open: false,
                fail_on: None,
            }
        }
    }

    struct RecordingLink {
        wire: Wire,
        fail_on: Option<String>,
    }

    impl MotorDriver for RecordingDriver {
        fn info(&self) -> &DriverInfo {
            &self.info
        }

        fn open<'a>(&'a self) -> LinkFuture<'a, Box<dyn MotorLink>> {
            let result: DynResult<Box<dyn MotorLink>> = if self.fail_open {
                Err("could not open port TEST0".into())
            } else {
                Ok(Box::new(RecordingLink {
                    wire: self.wire.clone(),
                    fail_on: self.fail_on.clone(),
                }))
            };
            Box::pin(std::future::ready(result))
        }
    }

    impl MotorLink for RecordingLink {
        fn send<'a>(&'a mut self, command: SpeedCommand) -> LinkFuture<'a, ()> {
            let line = command.encode();
            self.wire.0.lock().unwrap().push(line.clone());
            let result: DynResult<()> = if self.fail_on.as_deref() == Some(line.as_str()) {
                Err("cable pulled".into())
            } else {
                Ok(())
            };
            Box::pin(std::future::ready(result))
        }

        fn close<'a>(&'a mut self) -> LinkFuture<'a, ()> {
            self.wire.0.lock().unwrap().push("CLOSE".to_string());
            Box::pin(std::future::ready(DynResult::Ok(())))
        }
    }

    fn fast() -> EngineTiming {
        EngineTiming {
            tick: Duration::from_millis(1),
            settle: Duration::from_millis(1),
        }
    }

    fn spin(name: &str, speed: u32, duration: u32) -> Step {
        Step::Spin(SpinStep {
            recipe_id: None,
            name: name.to_string(),
            speed,
            duration,
            acceleration: 0,
        })
    }

    fn engine(wire: &Wire, timing: EngineTiming) -> Engine {
        Engine::new(Some(Arc::new(RecordingDriver::new(wire.clone()))), timing)
    }

    async fn drain(handle: &mut RunHandle) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        events
    }

    fn expected_loop(loop_index: u32) -> Vec<RunEvent> {
        let mut out = vec![RunEvent::Ramping {
            loop_index,
            loop_count: 2,
            step: "Coat".to_string(),
            speed: 2000,
        }];
        for remaining in [3, 2, 1] {
            out.push(RunEvent::Spinning {
                loop_index,
                loop_count: 2,
                step: "Coat".to_string(),
                speed: 2000,
                remaining,
            });
        }
        for remaining in [2, 1] {
            out.push(RunEvent::Waiting {
                loop_index,
                loop_count: 2,
                step: "Wait".to_string(),
                remaining,
            });
        }
        out
    }

    #[tokio::test]
    async fn test_simulated_run_event_sequence() {
        let wire = Wire::default();
        let engine = engine(&wire, fast());
        let plan = RunPlan::new(
            vec![spin("Coat", 2000, 3), Step::Wait(WaitStep { duration: 2 })],
            2,
            RunMode::Simulated,
        );
        let mut handle = engine.start(plan).unwrap().expect("run started");
        let events = drain(&mut handle).await;
        assert_eq!(handle.wait().await.unwrap(), RunOutcome::Completed);

        let mut expected = expected_loop(1);
        expected.extend(expected_loop(2));
        expected.push(RunEvent::Complete {
            outcome: RunOutcome::Completed,
        });
        assert_eq!(events, expected);
        assert!(wire.lines().is_empty());
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(engine.acknowledge());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_live_run_sends_protocol_lines() {
        let wire = Wire::default();
        let engine = engine(&wire, fast());
        let plan = RunPlan::new(
            vec![spin("Coat", 2000, 1), Step::wait(1), spin("Dry", 4000, 1)],
            1,
            RunMode::Live,
        );
        let mut handle = engine.start(plan).unwrap().unwrap();
        let events = drain(&mut handle).await;
        handle.wait().await.unwrap();

        assert_eq!(
            events.first(),
            Some(&RunEvent::Connected {
                device: "TEST0".to_string()
            })
        );
        assert_eq!(
            wire.lines(),
            vec!["SPEED:2000\n", "SPEED:0\n", "SPEED:4000\n", "SPEED:0\n", "CLOSE"]
        );
    }

    #[tokio::test]
    async fn test_cancel_mid_spin_shuts_down_live_device() {
        let wire = Wire::default();
        let timing = EngineTiming {
            tick: Duration::from_secs(60),
            settle: Duration::from_millis(1),
        };
        let engine = engine(&wire, timing);
        let plan = RunPlan::new(vec![spin("Long", 1500, 1000)], 3, RunMode::Live);
        let mut handle = engine.start(plan).unwrap().unwrap();

        loop {
            match handle.next_event().await.expect("event") {
                RunEvent::Spinning { .. } => break,
                _ => continue,
            }
        }
        handle.cancel();

        let rest = drain(&mut handle).await;
        assert_eq!(
            rest,
            vec![RunEvent::Complete {
                outcome: RunOutcome::Stopped
            }]
        );
        assert_eq!(handle.wait().await.unwrap(), RunOutcome::Stopped);
        assert_eq!(wire.lines(), vec!["SPEED:1500\n", "SPEED:0\n", "CLOSE"]);
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_cancel_during_ramp() {
        let wire = Wire::default();
        let timing = EngineTiming {
            tick: Duration::from_millis(1),
            settle: Duration::from_secs(60),
        };
        let engine = engine(&wire, timing);
        let plan = RunPlan::new(vec![spin("Coat", 3000, 5)], 1, RunMode::Simulated);
        let mut handle = engine.start(plan).unwrap().unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(RunEvent::Ramping { .. })
        ));
        handle.canceller().cancel();
        assert_eq!(
            drain(&mut handle).await,
            vec![RunEvent::Complete {
                outcome: RunOutcome::Stopped
            }]
        );
    }

    #[tokio::test]
    async fn test_connection_failure_runs_no_steps() {
        let wire = Wire::default();
        let mut driver = RecordingDriver::new(wire.clone());
        driver.fail_open = true;
        let engine = Engine::new(Some(Arc::new(driver)), fast());
        let plan = RunPlan::new(vec![spin("Coat", 2000, 3)], 1, RunMode::Live);
        let mut handle = engine.start(plan).unwrap().unwrap();

        let events = drain(&mut handle).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], RunEvent::Error { message } if message.contains("TEST0")));
        assert!(matches!(
            handle.wait().await,
            Err(SpinError::Connection(_))
        ));
        assert!(wire.lines().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_send_failure_mid_run_aborts() {
        let wire = Wire::default();
        let mut driver = RecordingDriver::new(wire.clone());
        driver.fail_on = Some("SPEED:4000\n".to_string());
        let engine = Engine::new(Some(Arc::new(driver)), fast());
        let plan = RunPlan::new(
            vec![spin("A", 2000, 1), spin("B", 4000, 3)],
            2,
            RunMode::Live,
        );
        let mut handle = engine.start(plan).unwrap().unwrap();

        let events = drain(&mut handle).await;
        assert!(matches!(
            events.last(),
            Some(RunEvent::Error { message }) if message.contains("cable pulled")
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunEvent::Complete { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunEvent::Ramping { step, .. } if step == "B")));
        assert!(matches!(
            handle.wait().await,
            Err(SpinError::Connection(_))
        ));
        assert_eq!(
            wire.lines(),
            vec!["SPEED:2000\n", "SPEED:4000\n", "SPEED:0\n", "CLOSE"]
        );
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_live_without_driver_is_unavailable() {
        let engine = Engine::new(None, fast());
        let plan = RunPlan::new(vec![spin("Coat", 2000, 3)], 1, RunMode::Live);
        let mut handle = engine.start(plan).unwrap().unwrap();

        let events = drain(&mut handle).await;
        assert!(matches!(events.as_slice(), [RunEvent::Error { .. }]));
        assert!(matches!(
            handle.wait().await,
            Err(SpinError::DriverUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_simulated_run_needs_no_driver() {
        let engine = Engine::new(None, fast());
        let plan = RunPlan::new(vec![Step::wait(1)], 1, RunMode::Simulated);
        let handle = engine.start(plan).unwrap().unwrap();
        assert_eq!(handle.wait().await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let engine = Engine::new(None, fast());
        let started = engine
            .start(RunPlan::new(Vec::new(), 1, RunMode::Live))
            .unwrap();
        assert!(started.is_none());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_zero_loops_rejected() {
        let engine = Engine::new(None, fast());
        let err = engine
            .start(RunPlan::new(vec![Step::wait(1)], 0, RunMode::Simulated))
            .unwrap_err();
        assert!(matches!(err, SpinError::Validation(_)));
    }

    #[tokio::test]
    async fn test_second_start_while_running_is_busy() {
        let timing = EngineTiming {
            tick: Duration::from_secs(60),
            settle: Duration::from_secs(60),
        };
        let engine = Engine::new(None, timing);
        let plan = RunPlan::new(vec![spin("Coat", 1000, 10)], 1, RunMode::Simulated);
        let handle = engine.start(plan.clone()).unwrap().unwrap();

        assert!(matches!(engine.start(plan.clone()), Err(SpinError::Busy(_))));

        handle.cancel();
        assert_eq!(handle.wait().await.unwrap(), RunOutcome::Stopped);

        // A stopped engine accepts the next run without explicit acknowledge.
        let next = engine.start(plan).unwrap().unwrap();
        next.cancel();
        next.wait().await.unwrap();
    }
}
