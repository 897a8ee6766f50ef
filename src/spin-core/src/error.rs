// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// Errors surfaced by the recipe store, the queue and the execution engine.
#[derive(Debug, Error)]
pub enum SpinError {
    /// A required input was missing or out of range.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The acting user may not modify or delete the recipe.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The operation referenced an unknown recipe, user or queue position.
    #[error("not found: {0}")]
    NotFound(String),

    /// Opening or writing to the motor controller failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Live mode was requested but no usable driver is available.
    #[error("driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Mutation refused while a run is in progress.
    #[error("busy: {0}")]
    Busy(String),

    /// Durable storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// The run worker task panicked or was aborted.
    #[error("run worker failed: {0}")]
    Worker(String),
}

pub type SpinResult<T> = Result<T, SpinError>;

impl SpinError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether the error came from the device side rather than user input.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::DriverUnavailable(_))
    }
}

impl From<std::io::Error> for SpinError {
    fn from(value: std::io::Error) -> Self {
        SpinError::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for SpinError {
    fn from(value: serde_json::Error) -> Self {
        SpinError::Storage(value.to_string())
    }
}
