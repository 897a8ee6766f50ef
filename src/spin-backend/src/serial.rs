// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tokio::io::AsyncWriteExt;
use tokio::time::{sleep, Duration};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use spin_core::device::{DriverInfo, LinkFuture, MotorDriver, MotorLink};
use spin_core::{DynResult, SpeedCommand, SpinError};

/// Line-oriented serial driver for Arduino-style spin coater controllers.
pub struct SerialMotor {
    path: String,
    baud: u32,
    reset_delay: Duration,
    info: DriverInfo,
}

impl SerialMotor {
    pub fn new(path: &str, baud: u32, reset_delay: Duration) -> Self {
        Self {
            path: path.to_string(),
            baud,
            reset_delay,
            info: DriverInfo {
                name: "serial".to_string(),
                device: format!("{} @ {} baud", path, baud),
            },
        }
    }
}

struct SerialLink {
    port: Option<SerialStream>,
}

impl MotorDriver for SerialMotor {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn open<'a>(&'a self) -> LinkFuture<'a, Box<dyn MotorLink>> {
        Box::pin(self.connect())
    }
}

impl SerialMotor {
    async fn connect(&self) -> DynResult<Box<dyn MotorLink>> {
        let port = tokio_serial::new(&self.path, self.baud)
            .open_native_async()
            .map_err(|e| SpinError::Connection(format!("{}: {}", self.path, e)))?;
        info!("Opened {}", self.info.device);
        // The controller resets when the port opens.
        if !self.reset_delay.is_zero() {
            sleep(self.reset_delay).await;
        }
        Ok(Box::new(SerialLink { port: Some(port) }))
    }
}

impl MotorLink for SerialLink {
    fn send<'a>(&'a mut self, command: SpeedCommand) -> LinkFuture<'a, ()> {
        Box::pin(self.write_command(command))
    }

    fn close<'a>(&'a mut self) -> LinkFuture<'a, ()> {
        Box::pin(self.shutdown())
    }
}

impl SerialLink {
    async fn write_command(&mut self, command: SpeedCommand) -> DynResult<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SpinError::Connection("serial port closed".into()))?;
        debug!("TX {}", command);
        port.write_all(command.encode().as_bytes()).await?;
        port.flush().await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> DynResult<()> {
        if let Some(mut port) = self.port.take() {
            port.flush().await?;
            debug!("Serial port closed");
        }
        Ok(())
    }
}
