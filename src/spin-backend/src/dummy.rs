// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dummy motor driver for development and testing.
//!
//! Accepts every command immediately and keeps the encoded protocol lines
//! in memory. No hardware or serial port required.

use std::sync::{Arc, Mutex};

use tracing::info;

use spin_core::device::{DriverInfo, LinkFuture, MotorDriver, MotorLink};
use spin_core::{DynResult, SpeedCommand};

/// Shared record of what reached the "wire".
#[derive(Debug, Clone, Default)]
pub struct DummyWire {
    lines: Arc<Mutex<Vec<String>>>,
    opened: Arc<Mutex<u32>>,
    closed: Arc<Mutex<u32>>,
}

impl DummyWire {
    /// Encoded commands in send order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn open_count(&self) -> u32 {
        *self.opened.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn close_count(&self) -> u32 {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Last commanded speed, if any command was sent.
    pub fn last_speed(&self) -> Option<u32> {
        self.lines()
            .last()
            .and_then(|line| line.parse::<SpeedCommand>().ok())
            .map(|cmd| cmd.rpm)
    }
}

pub struct DummyMotor {
    info: DriverInfo,
    wire: DummyWire,
}

impl DummyMotor {
    pub fn new() -> Self {
        Self {
            info: DriverInfo {
                name: "dummy".to_string(),
                device: "dummy motor".to_string(),
            },
            wire: DummyWire::default(),
        }
    }

    pub fn wire(&self) -> DummyWire {
        self.wire.clone()
    }
}

impl Default for DummyMotor {
    fn default() -> Self {
        Self::new()
    }
}

struct DummyLink {
    wire: DummyWire,
}

impl MotorDriver for DummyMotor {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn open<'a>(&'a self) -> LinkFuture<'a, Box<dyn MotorLink>> {
        *self.wire.opened.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        let link: DynResult<Box<dyn MotorLink>> = Ok(Box::new(DummyLink {
            wire: self.wire.clone(),
        }));
        Box::pin(std::future::ready(link))
    }
}

impl MotorLink for DummyLink {
    fn send<'a>(&'a mut self, command: SpeedCommand) -> LinkFuture<'a, ()> {
        info!("[dummy] {}", command);
        self.wire
            .lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.encode());
        Box::pin(std::future::ready(DynResult::Ok(())))
    }

    fn close<'a>(&'a mut self) -> LinkFuture<'a, ()> {
        *self.wire.closed.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Box::pin(std::future::ready(DynResult::Ok(())))
    }
}
