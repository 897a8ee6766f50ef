// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Motor controller capability consumed by the execution engine.
//!
//! A [`MotorDriver`] knows how to reach a controller; opening it yields a
//! [`MotorLink`] that is owned by the run worker until it is closed.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::{DynResult, SpinError};

pub mod command;

use command::SpeedCommand;

/// Alias to reduce type complexity in the device traits.
pub type LinkFuture<'a, T> = Pin<Box<dyn Future<Output = DynResult<T>> + Send + 'a>>;

/// Static info describing a driver.
#[derive(Debug, Clone, Serialize)]
pub struct DriverInfo {
    /// Registered driver name (e.g. "serial").
    pub name: String,
    /// Human readable device address (e.g. "COM3 @ 9600 baud").
    pub device: String,
}

/// Factory for controller connections.
pub trait MotorDriver: Send + Sync {
    fn info(&self) -> &DriverInfo;

    fn open<'a>(&'a self) -> LinkFuture<'a, Box<dyn MotorLink>>;
}

/// An open connection to the motor controller.
pub trait MotorLink: Send {
    fn send<'a>(&'a mut self, command: SpeedCommand) -> LinkFuture<'a, ()>;

    fn close<'a>(&'a mut self) -> LinkFuture<'a, ()>;
}

/// Classify a driver error, keeping typed [`SpinError`]s and treating
/// anything else as a connection failure.
pub fn classify_error(err: Box<dyn std::error::Error + Send + Sync>) -> SpinError {
    match err.downcast::<SpinError>() {
        Ok(spin) => *spin,
        Err(other) => SpinError::Connection(other.to_string()),
    }
}
