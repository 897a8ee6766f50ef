// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::HashMap;
use std::sync::Arc;

use spin_core::{MotorDriver, SpinError, SpinResult};

mod dummy;
#[cfg(feature = "serial")]
mod serial;

pub use dummy::{DummyMotor, DummyWire};
#[cfg(feature = "serial")]
pub use serial::SerialMotor;

/// Connection details for instantiating a motor driver.
#[derive(Debug, Clone)]
pub enum DriverAccess {
    Serial {
        path: String,
        baud: u32,
        /// Delay after opening before the first command, for controllers
        /// that reset on connect.
        reset_delay_ms: u64,
    },
    None,
}

pub type DriverFactory = fn(DriverAccess) -> SpinResult<Arc<dyn MotorDriver>>;

/// Context for registering and instantiating motor drivers.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, DriverFactory>,
}

impl RegistrationContext {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory under a stable name (e.g. "serial").
    pub fn register_driver(&mut self, name: &str, factory: DriverFactory) {
        self.factories.insert(normalize_name(name), factory);
    }

    pub fn is_driver_registered(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_name(name))
    }

    /// Registered driver names, sorted.
    pub fn registered_drivers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate a driver. Unknown names, including drivers compiled out
    /// by features, are reported as unavailable.
    pub fn build_driver(&self, name: &str, access: DriverAccess) -> SpinResult<Arc<dyn MotorDriver>> {
        let factory = self.factories.get(&normalize_name(name)).ok_or_else(|| {
            SpinError::DriverUnavailable(format!(
                "unknown motor driver '{}' (available: {})",
                name,
                self.registered_drivers().join(", ")
            ))
        })?;
        factory(access)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Register all built-in drivers enabled by features on a context.
pub fn register_builtin_drivers_on(context: &mut RegistrationContext) {
    context.register_driver("dummy", dummy_factory);
    #[cfg(feature = "serial")]
    context.register_driver("serial", serial_factory);
}

fn dummy_factory(_access: DriverAccess) -> SpinResult<Arc<dyn MotorDriver>> {
    Ok(Arc::new(DummyMotor::new()))
}

#[cfg(feature = "serial")]
fn serial_factory(access: DriverAccess) -> SpinResult<Arc<dyn MotorDriver>> {
    match access {
        DriverAccess::Serial {
            path,
            baud,
            reset_delay_ms,
        } => Ok(Arc::new(SerialMotor::new(
            &path,
            baud,
            std::time::Duration::from_millis(reset_delay_ms),
        ))),
        DriverAccess::None => Err(SpinError::validation(
            "serial driver requires a port and baud rate",
        )),
    }
}
