// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON file repository.
//!
//! The file is a single object mapping recipe id to record. Every mutation
//! rewrites the whole file. Older files keyed records by name and had no
//! `name` field; those are given fresh ids on load.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::repository::{upsert, RecipeRepository};
use super::{Recipe, RecipeId};
use crate::{SpinError, SpinResult};

pub struct JsonFileRepository {
    path: PathBuf,
    records: RwLock<Vec<(RecipeId, Recipe)>>,
}

impl JsonFileRepository {
    /// Open the repository at `path`, creating an empty one if the file is
    /// missing. Legacy records are migrated and written back immediately.
    pub fn open(path: &Path) -> SpinResult<Self> {
        let records = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let raw: Map<String, Value> = serde_json::from_str(&content)?;
            let (records, migrated) = migrate_records(raw)?;
            if migrated > 0 {
                info!(
                    "Migrated {} legacy recipe(s) in {}",
                    migrated,
                    path.display()
                );
                write_records(path, &records)?;
            }
            records
        } else {
            Vec::new()
        };
        debug!("Loaded {} recipe(s) from {}", records.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy of the records, persist it, then commit in memory.
    /// A failed write leaves the in-memory state untouched.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<(RecipeId, Recipe)>) -> T) -> SpinResult<T> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut next = records.clone();
        let out = f(&mut next);
        write_records(&self.path, &next)?;
        *records = next;
        Ok(out)
    }
}

impl RecipeRepository for JsonFileRepository {
    fn get(&self, id: &RecipeId) -> SpinResult<Option<Recipe>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .find(|(rid, _)| rid == id)
            .map(|(_, r)| r.clone()))
    }

    fn list(&self) -> SpinResult<Vec<(RecipeId, Recipe)>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.clone())
    }

    fn save(&self, id: &RecipeId, recipe: &Recipe) -> SpinResult<()> {
        self.mutate(|records| upsert(records, id, recipe))
    }

    fn delete(&self, id: &RecipeId) -> SpinResult<bool> {
        self.mutate(|records| {
            let before = records.len();
            records.retain(|(rid, _)| rid != id);
            records.len() != before
        })
    }
}

/// Convert a raw id → record map into typed records, assigning fresh ids to
/// legacy name-keyed entries. Returns the records and the number migrated.
pub fn migrate_records(raw: Map<String, Value>) -> SpinResult<(Vec<(RecipeId, Recipe)>, usize)> {
    let mut records = Vec::with_capacity(raw.len());
    let mut migrated = 0;
    for (key, mut value) in raw {
        let Some(obj) = value.as_object_mut() else {
            return Err(SpinError::Storage(format!(
                "recipe '{}' is not an object",
                key
            )));
        };
        let id = if obj.contains_key("name") {
            RecipeId::from(key)
        } else {
            obj.insert("name".to_string(), Value::String(key));
            migrated += 1;
            RecipeId::generate()
        };
        let recipe: Recipe = serde_json::from_value(value)
            .map_err(|e| SpinError::Storage(format!("recipe '{}': {}", id, e)))?;
        records.push((id, recipe));
    }
    Ok((records, migrated))
}

fn write_records(path: &Path, records: &[(RecipeId, Recipe)]) -> SpinResult<()> {
    let mut map = Map::new();
    for (id, recipe) in records {
        map.insert(id.to_string(), serde_json::to_value(recipe)?);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(&Value::Object(map))?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{RecipeDraft, UNKNOWN_AUTHOR};
    use serde_json::json;

    #[test]
    fn test_migrates_name_keyed_record() {
        let raw = json!({
            "MyRecipe": {"speed": 3000, "duration": 30, "acceleration": 500, "author": "alice", "shared": true}
        });
        let Value::Object(map) = raw else { unreachable!() };
        let (records, migrated) = migrate_records(map).unwrap();

        assert_eq!(migrated, 1);
        let (id, recipe) = &records[0];
        assert_ne!(id.as_str(), "MyRecipe");
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(recipe.name, "MyRecipe");
        assert_eq!(recipe.speed, 3000);
        assert_eq!(recipe.duration, 30);
        assert_eq!(recipe.acceleration, 500);
        assert_eq!(recipe.author, "alice");
        assert!(recipe.shared);
    }

    #[test]
    fn test_current_format_is_untouched() {
        let raw = json!({
            "id-1": {"name": "Base", "speed": 1000, "duration": 10, "acceleration": 0, "author": "bob", "shared": false}
        });
        let Value::Object(map) = raw else { unreachable!() };
        let (records, migrated) = migrate_records(map).unwrap();
        assert_eq!(migrated, 0);
        assert_eq!(records[0].0.as_str(), "id-1");
    }

    #[test]
    fn test_legacy_without_author() {
        let raw = json!({"Old": {"speed": 500, "duration": 5}});
        let Value::Object(map) = raw else { unreachable!() };
        let (records, _) = migrate_records(map).unwrap();
        assert_eq!(records[0].1.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_open_rewrites_migrated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.json");
        std::fs::write(
            &path,
            r#"{"Legacy": {"speed": 1200, "duration": 15, "acceleration": 100, "author": "carol", "shared": false}}"#,
        )
        .unwrap();

        let repo = JsonFileRepository::open(&path).unwrap();
        let list = repo.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].1.name, "Legacy");

        let reopened = JsonFileRepository::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap(), list);
    }

    #[test]
    fn test_persists_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.json");
        let repo = JsonFileRepository::open(&path).unwrap();
        let ids: Vec<RecipeId> = ["z", "a", "m"].iter().map(|s| RecipeId::from(*s)).collect();
        for id in &ids {
            repo.save(id, &RecipeDraft::new(id.as_str(), 100, 1).into_recipe("u"))
                .unwrap();
        }
        assert!(repo.delete(&ids[1]).unwrap());

        let reopened = JsonFileRepository::open(&path).unwrap();
        let order: Vec<String> = reopened
            .list()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(order, vec!["z", "m"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::open(&dir.path().join("none.json")).unwrap();
        assert!(repo.list().unwrap().is_empty());
    }
}
