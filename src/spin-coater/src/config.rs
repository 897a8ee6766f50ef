// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for spin-coater.
//!
//! Config is loaded from the `[spin-coater]` section of `spin-coater.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./spin-coater.toml`
//! 3. `~/.config/spin-coater/spin-coater.toml`
//! 4. `/etc/spin-coater/spin-coater.toml`

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spin_app::{default_data_dir, normalize_name, ConfigFile};
use spin_backend::DriverAccess;
use spin_core::EngineTiming;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoaterConfig {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub device: DeviceConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Where recipes, users and the activity history live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory; the platform data dir when unset.
    pub dir: Option<PathBuf>,
    pub recipes_file: String,
    pub users_file: String,
    pub history_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            recipes_file: "recipes.json".to_string(),
            users_file: "users.json".to_string(),
            history_file: "history.csv".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn base_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.base_dir().join(&self.recipes_file)
    }

    pub fn users_path(&self) -> PathBuf {
        self.base_dir().join(&self.users_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir().join(&self.history_file)
    }
}

/// Motor controller connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Registered driver name ("serial" or "dummy")
    pub driver: String,
    pub port: String,
    pub baud: u32,
    /// Wait after opening the port while the controller resets
    pub reset_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: "serial".to_string(),
            port: "COM3".to_string(),
            baud: 9600,
            reset_delay_ms: 2000,
        }
    }
}

impl DeviceConfig {
    pub fn is_serial(&self) -> bool {
        is_serial_driver(&self.driver)
    }

    pub fn access(&self) -> DriverAccess {
        self.access_for(&self.driver)
    }

    /// Connection details for `driver`, which may differ from `[device].driver`.
    pub fn access_for(&self, driver: &str) -> DriverAccess {
        if is_serial_driver(driver) {
            DriverAccess::Serial {
                path: self.port.clone(),
                baud: self.baud,
                reset_delay_ms: self.reset_delay_ms,
            }
        } else {
            DriverAccess::None
        }
    }
}

fn is_serial_driver(name: &str) -> bool {
    normalize_name(name) == "serial"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_ms: u64,
    pub settle_ms: u64,
    pub default_loops: u32,
    pub max_loops: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            settle_ms: 1000,
            default_loops: 1,
            max_loops: 1000,
        }
    }
}

impl EngineConfig {
    pub fn timing(&self) -> EngineTiming {
        EngineTiming {
            tick: Duration::from_millis(self.tick_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

impl CoaterConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.storage.recipes_file.trim().is_empty()
            || self.storage.users_file.trim().is_empty()
            || self.storage.history_file.trim().is_empty()
        {
            return Err("[storage] file names must not be empty".to_string());
        }

        if self.device.driver.trim().is_empty() {
            return Err("[device].driver must not be empty".to_string());
        }
        if self.device.is_serial() {
            if self.device.port.trim().is_empty() {
                return Err("[device].port must be set for the serial driver".to_string());
            }
            if self.device.baud == 0 {
                return Err("[device].baud must be > 0".to_string());
            }
        }

        if self.engine.tick_ms == 0 {
            return Err("[engine].tick_ms must be > 0".to_string());
        }
        if self.engine.max_loops == 0 {
            return Err("[engine].max_loops must be > 0".to_string());
        }
        if self.engine.default_loops == 0 || self.engine.default_loops > self.engine.max_loops {
            return Err(format!(
                "[engine].default_loops must be in 1..={}",
                self.engine.max_loops
            ));
        }
        Ok(())
    }

    pub fn example_toml() -> String {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(rename = "spin-coater")]
            inner: CoaterConfig,
        }
        let example = CoaterConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            storage: StorageConfig {
                dir: Some(default_data_dir()),
                ..StorageConfig::default()
            },
            device: DeviceConfig::default(),
            engine: EngineConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

impl ConfigFile for CoaterConfig {
    fn section_key() -> &'static str {
        "spin-coater"
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoaterConfig::default();
        assert_eq!(config.device.driver, "serial");
        assert_eq!(config.device.port, "COM3");
        assert_eq!(config.device.baud, 9600);
        assert_eq!(config.device.reset_delay_ms, 2000);
        assert_eq!(config.engine.tick_ms, 1000);
        assert_eq!(config.engine.default_loops, 1);
        assert_eq!(config.storage.recipes_file, "recipes.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[storage]
dir = "/var/lib/spin"

[device]
driver = "dummy"
"#;
        let config: CoaterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.storage.recipes_path(),
            PathBuf::from("/var/lib/spin/recipes.json")
        );
        assert_eq!(config.device.driver, "dummy");
        assert_eq!(config.device.baud, 9600);
        assert!(matches!(config.device.access(), DriverAccess::None));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serial_access() {
        let config = DeviceConfig {
            port: "/dev/ttyACM0".to_string(),
            ..DeviceConfig::default()
        };
        match config.access() {
            DriverAccess::Serial {
                path,
                baud,
                reset_delay_ms,
            } => {
                assert_eq!(path, "/dev/ttyACM0");
                assert_eq!(baud, 9600);
                assert_eq!(reset_delay_ms, 2000);
            }
            other => panic!("unexpected access {:?}", other),
        }
    }

    #[test]
    fn test_access_for_other_driver() {
        let config = DeviceConfig {
            driver: "dummy".to_string(),
            ..DeviceConfig::default()
        };
        assert!(matches!(config.access(), DriverAccess::None));
        assert!(matches!(
            config.access_for("Serial"),
            DriverAccess::Serial { baud: 9600, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CoaterConfig::default();
        config.general.log_level = Some("loud".to_string());
        assert!(config.validate().is_err());

        let mut config = CoaterConfig::default();
        config.device.port = String::new();
        assert!(config.validate().unwrap_err().contains("[device].port"));

        let mut config = CoaterConfig::default();
        config.device.driver = "dummy".to_string();
        config.device.baud = 0;
        assert!(config.validate().is_ok());

        let mut config = CoaterConfig::default();
        config.engine.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CoaterConfig::default();
        config.engine.max_loops = 0;
        assert!(config.validate().is_err());

        let mut config = CoaterConfig::default();
        config.engine.default_loops = 5;
        config.engine.max_loops = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_toml_round_trips() {
        let text = CoaterConfig::example_toml();
        let table: toml::Table = toml::from_str(&text).unwrap();
        let section = table.get("spin-coater").unwrap().clone();
        let config: CoaterConfig = section.try_into().unwrap();
        assert_eq!(config.general.log_level.as_deref(), Some("info"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timing_from_millis() {
        let engine = EngineConfig {
            tick_ms: 250,
            settle_ms: 0,
            ..EngineConfig::default()
        };
        let timing = engine.timing();
        assert_eq!(timing.tick, Duration::from_millis(250));
        assert!(timing.settle.is_zero());
    }
}
