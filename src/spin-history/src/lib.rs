// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Append-only CSV log of operator actions.
//!
//! The file carries a `Timestamp,User,Action` header and one row per
//! action, timestamped in local time.

use std::fs::{self, create_dir_all, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{debug, warn};

use spin_core::activity::user_or_unknown;
use spin_core::{ActivitySink, SpinError, SpinResult};

pub const HEADER: &str = "Timestamp,User,Action";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub user: String,
    pub action: String,
}

pub struct HistoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first when the file is new.
    pub fn append(&self, user: &str, action: &str) -> SpinResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let fresh = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        if fresh {
            writeln!(writer, "{}", HEADER)?;
        }
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let row = [timestamp.as_str(), user_or_unknown(user), action]
            .iter()
            .map(|field| quote_field(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", row)?;
        writer.flush()?;
        debug!("history: {}", row);
        Ok(())
    }

    /// All logged rows in file order. A missing file reads as empty; rows
    /// that do not have exactly three fields are skipped.
    pub fn entries(&self) -> SpinResult<Vec<ActivityEntry>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if index == 0 && line.trim() == HEADER {
                continue;
            }
            let fields = split_row(line);
            match <[String; 3]>::try_from(fields) {
                Ok([timestamp, user, action]) => entries.push(ActivityEntry {
                    timestamp,
                    user,
                    action,
                }),
                Err(fields) => {
                    if !line.trim().is_empty() {
                        warn!("skipping history row with {} fields", fields.len());
                    }
                }
            }
        }
        Ok(entries)
    }

    /// Truncate to the header row only.
    pub fn clear(&self) -> SpinResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::write(&self.path, format!("{}\n", HEADER)).map_err(SpinError::from)
    }
}

impl ActivitySink for HistoryLog {
    fn record(&self, user: &str, action: &str) -> SpinResult<()> {
        self.append(user, action)
    }
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            '"' if current.is_empty() => quoted = true,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
