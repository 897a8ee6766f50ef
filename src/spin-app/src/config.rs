// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "spin-coater.toml";
const APP_DIR: &str = "spin-coater";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Search order: working directory, XDG config dir, /etc.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_DIR).join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE_NAME));
    paths
}

/// Directory for recipes, users and history when the config names none.
/// Falls back to the working directory on platforms without a data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_section<T: DeserializeOwned>(
    path: &Path,
    content: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let parse_err =
        |e: &dyn std::fmt::Display| ConfigError::ParseError(path.to_path_buf(), e.to_string());

    let mut table: toml::Table = toml::from_str(content).map_err(|e| parse_err(&e))?;
    let Some(section) = table.remove(key) else {
        return Ok(None);
    };
    let cfg: T = section.try_into().map_err(|e| parse_err(&e))?;
    Ok(Some(cfg))
}

/// Configuration stored as one `[<section>]` table of a shared TOML file.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    fn section_key() -> &'static str;

    /// Load from an explicit path. The section must be present.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        parse_section::<Self>(path, &content, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// First default path holding the section wins; defaults otherwise.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_from_paths(&config_search_paths())
    }

    fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in paths.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e.to_string()))?;
            if let Some(cfg) = parse_section::<Self>(path, &content, Self::section_key())? {
                return Ok((cfg, Some(path.clone())));
            }
        }
        Ok((Self::default(), None))
    }

    /// `--config` takes precedence over the search paths.
    fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::load_from_file(path)?, Some(path.to_path_buf()))),
            None => Self::load_from_default_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        port: String,
        baud: u32,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                port: "COM3".to_string(),
                baud: 9600,
            }
        }
    }

    impl ConfigFile for Sample {
        fn section_key() -> &'static str {
            "sample"
        }
    }

    #[test]
    fn test_section_defaults_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sample]\nport = \"/dev/ttyACM0\"\n").unwrap();

        let cfg = Sample::load_from_file(&path).unwrap();
        assert_eq!(cfg.port, "/dev/ttyACM0");
        assert_eq!(cfg.baud, 9600);
    }

    #[test]
    fn test_missing_section_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[other]\nport = \"x\"\n").unwrap();

        let err = Sample::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing [sample] section"));
    }

    #[test]
    fn test_search_skips_files_without_section() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.toml");
        let second = dir.path().join("b.toml");
        std::fs::write(&first, "[other]\n").unwrap();
        std::fs::write(&second, "[sample]\nbaud = 115200\n").unwrap();
        let missing = dir.path().join("missing.toml");

        let (cfg, found) =
            Sample::load_from_paths(&[missing, first, second.clone()]).unwrap();
        assert_eq!(cfg.baud, 115200);
        assert_eq!(found, Some(second));
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, found) = Sample::load_from_paths(&[dir.path().join("none.toml")]).unwrap();
        assert_eq!(cfg, Sample::default());
        assert!(found.is_none());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sample\n").unwrap();
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_search_paths_end_in_etc() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/spin-coater/spin-coater.toml"))
        );
    }
}
