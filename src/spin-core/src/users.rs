// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Known operators.
//!
//! Persisted as a JSON array of names in insertion order.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{SpinError, SpinResult};

#[derive(Debug, Default)]
pub struct UserRegistry {
    path: Option<PathBuf>,
    users: Vec<String>,
}

impl UserRegistry {
    /// Registry that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the registry from `path`; a missing file yields no users.
    pub fn open(path: &Path) -> SpinResult<Self> {
        let users = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<Vec<String>>(&content)?
        } else {
            Vec::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            users,
        })
    }

    pub fn list(&self) -> &[String] {
        &self.users
    }

    pub fn contains(&self, name: &str) -> bool {
        self.users.iter().any(|u| u == name)
    }

    pub fn add(&mut self, name: &str) -> SpinResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpinError::validation("user name must not be empty"));
        }
        if self.contains(name) {
            return Err(SpinError::validation(format!(
                "user '{}' already exists",
                name
            )));
        }
        let mut next = self.users.clone();
        next.push(name.to_string());
        self.persist(&next)?;
        self.users = next;
        info!("Added user '{}'", name);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> SpinResult<()> {
        if !self.contains(name) {
            return Err(SpinError::not_found(format!("user '{}'", name)));
        }
        let next: Vec<String> = self.users.iter().filter(|u| *u != name).cloned().collect();
        self.persist(&next)?;
        self.users = next;
        info!("Removed user '{}'", name);
        Ok(())
    }

    fn persist(&self, users: &[String]) -> SpinResult<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string(users)?)?;
        Ok(())
    }
}
