// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Recipe records, identities and persistence.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod json_file;
pub mod permission;
pub mod repository;
pub mod store;

pub use json_file::JsonFileRepository;
pub use permission::{can_delete, can_modify, is_visible};
pub use repository::{MemoryRepository, RecipeRepository};

/// Author recorded for legacy records that never carried one.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Globally unique, immutable recipe identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecipeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecipeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, persisted spin profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Target speed in RPM.
    pub speed: u32,
    /// Spin time in seconds.
    pub duration: u32,
    /// Ramp rate in RPM/s. Stored but not used by the engine yet.
    #[serde(default)]
    pub acceleration: u32,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub shared: bool,
}

fn default_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

/// User-editable fields submitted with a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub speed: u32,
    pub duration: u32,
    pub acceleration: u32,
    pub shared: bool,
}

impl RecipeDraft {
    pub fn new(name: impl Into<String>, speed: u32, duration: u32) -> Self {
        Self {
            name: name.into(),
            speed,
            duration,
            acceleration: 0,
            shared: false,
        }
    }

    pub fn with_acceleration(mut self, acceleration: u32) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Build a fresh record owned by `author`.
    pub(crate) fn into_recipe(self, author: &str) -> Recipe {
        Recipe {
            name: self.name,
            speed: self.speed,
            duration: self.duration,
            acceleration: self.acceleration,
            author: author.to_string(),
            shared: self.shared,
        }
    }

    /// Overwrite the editable fields of `existing`, keeping its author.
    pub(crate) fn apply_to(self, existing: &Recipe) -> Recipe {
        Recipe {
            name: self.name,
            speed: self.speed,
            duration: self.duration,
            acceleration: self.acceleration,
            author: existing.author.clone(),
            shared: self.shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = RecipeId::generate();
        let b = RecipeId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_legacy_fields_default() {
        let recipe: Recipe = serde_json::from_str(r#"{"name":"Base","speed":1500,"duration":20}"#)
            .expect("parse");
        assert_eq!(recipe.author, UNKNOWN_AUTHOR);
        assert!(!recipe.shared);
        assert_eq!(recipe.acceleration, 0);
    }

    #[test]
    fn test_apply_keeps_author() {
        let existing = RecipeDraft::new("Base", 1000, 10).into_recipe("alice");
        let updated = RecipeDraft::new("Base v2", 2000, 5)
            .shared(true)
            .apply_to(&existing);
        assert_eq!(updated.author, "alice");
        assert_eq!(updated.name, "Base v2");
        assert_eq!(updated.speed, 2000);
        assert!(updated.shared);
    }
}
