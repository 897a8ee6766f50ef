// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Run worker: drains the step list against the motor link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::events::{RunEvent, RunOutcome};
use super::{EngineTiming, RunMode, RunPlan};
use crate::device::command::SpeedCommand;
use crate::device::{classify_error, MotorDriver, MotorLink};
use crate::step::{SpinStep, Step, WaitStep, WAIT_STEP_NAME};
use crate::{SpinError, SpinResult};

/// Why a run left the step loop early. Both variants unwind to shutdown.
enum Halt {
    Cancelled,
    Device(SpinError),
}

type StepResult = Result<(), Halt>;

pub(crate) struct Worker {
    pub(crate) plan: RunPlan,
    pub(crate) driver: Option<Arc<dyn MotorDriver>>,
    pub(crate) timing: EngineTiming,
    pub(crate) events: mpsc::UnboundedSender<RunEvent>,
    pub(crate) cancel: CancelToken,
}

impl Worker {
    pub(crate) async fn run(mut self) -> SpinResult<RunOutcome> {
        info!(
            "Run started {}: {} step(s) x {} loop(s)",
            self.plan.mode.label(),
            self.plan.steps.len(),
            self.plan.loop_count
        );

        let mut link = match self.plan.mode {
            RunMode::Simulated => None,
            RunMode::Live => match self.connect().await {
                Ok(link) => Some(link),
                Err(err) => {
                    warn!("Run aborted before first step: {}", err);
                    self.emit(RunEvent::Error {
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            },
        };

        let result = self.execute(&mut link).await;
        self.shutdown(&mut link).await;

        match result {
            Ok(()) => {
                info!("Run completed");
                self.emit(RunEvent::Complete {
                    outcome: RunOutcome::Completed,
                });
                Ok(RunOutcome::Completed)
            }
            Err(Halt::Cancelled) => {
                info!("Run stopped by request");
                self.emit(RunEvent::Complete {
                    outcome: RunOutcome::Stopped,
                });
                Ok(RunOutcome::Stopped)
            }
            Err(Halt::Device(err)) => {
                warn!("Run aborted: {}", err);
                self.emit(RunEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn connect(&self) -> SpinResult<Box<dyn MotorLink>> {
        let driver = self.driver.as_ref().ok_or_else(|| {
            SpinError::DriverUnavailable("no motor driver available for live mode".to_string())
        })?;
        let info = driver.info();
        info!("Opening motor driver {} ({})", info.name, info.device);
        let link = driver.open().await.map_err(classify_error)?;
        self.emit(RunEvent::Connected {
            device: info.device.clone(),
        });
        Ok(link)
    }

    async fn execute(&mut self, link: &mut Option<Box<dyn MotorLink>>) -> StepResult {
        let loop_count = self.plan.loop_count;
        let steps = std::mem::take(&mut self.plan.steps);
        for loop_index in 1..=loop_count {
            self.check_cancel()?;
            for step in &steps {
                self.check_cancel()?;
                match step {
                    Step::Wait(wait) => self.run_wait(link, loop_index, wait).await?,
                    Step::Spin(spin) => self.run_spin(link, loop_index, spin).await?,
                }
            }
        }
        Ok(())
    }

    async fn run_wait(
        &mut self,
        link: &mut Option<Box<dyn MotorLink>>,
        loop_index: u32,
        wait: &WaitStep,
    ) -> StepResult {
        self.send(link, SpeedCommand::stop()).await?;
        for remaining in (1..=wait.duration).rev() {
            self.check_cancel()?;
            self.emit(RunEvent::Waiting {
                loop_index,
                loop_count: self.plan.loop_count,
                step: WAIT_STEP_NAME.to_string(),
                remaining,
            });
            self.pause(self.timing.tick).await?;
        }
        Ok(())
    }

    async fn run_spin(
        &mut self,
        link: &mut Option<Box<dyn MotorLink>>,
        loop_index: u32,
        spin: &SpinStep,
    ) -> StepResult {
        self.send(link, SpeedCommand::new(spin.speed)).await?;
        self.emit(RunEvent::Ramping {
            loop_index,
            loop_count: self.plan.loop_count,
            step: spin.name.clone(),
            speed: spin.speed,
        });
        self.pause(self.timing.settle).await?;

        for remaining in (1..=spin.duration).rev() {
            self.check_cancel()?;
            self.emit(RunEvent::Spinning {
                loop_index,
                loop_count: self.plan.loop_count,
                step: spin.name.clone(),
                speed: spin.speed,
                remaining,
            });
            self.pause(self.timing.tick).await?;
        }
        Ok(())
    }

    /// Stop the motor and release the link. Failures here are logged only;
    /// the run is already over.
    async fn shutdown(&self, link: &mut Option<Box<dyn MotorLink>>) {
        let Some(mut open) = link.take() else {
            debug!("Simulated shutdown (no device link)");
            return;
        };
        if let Err(e) = open.send(SpeedCommand::stop()).await {
            warn!("Failed to stop motor during shutdown: {}", e);
        }
        if let Err(e) = open.close().await {
            warn!("Failed to close motor link: {}", e);
        }
        info!("Motor link closed");
    }

    async fn send(
        &self,
        link: &mut Option<Box<dyn MotorLink>>,
        command: SpeedCommand,
    ) -> StepResult {
        let Some(open) = link.as_mut() else {
            debug!("[SIM] {}", command);
            return Ok(());
        };
        debug!("-> {}", command);
        open.send(command)
            .await
            .map_err(|e| Halt::Device(classify_error(e)))
    }

    async fn pause(&mut self, duration: Duration) -> StepResult {
        if self.cancel.sleep(duration).await {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }

    fn check_cancel(&self) -> StepResult {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: RunEvent) {
        // A dropped receiver only means nobody is watching progress.
        let _ = self.events.send(event);
    }
}
