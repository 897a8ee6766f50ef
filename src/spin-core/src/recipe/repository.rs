// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::RwLock;

use super::{Recipe, RecipeId};
use crate::SpinResult;

/// Storage backend for recipe records.
///
/// Implementations keep records in insertion order; replacing an existing
/// record keeps its position.
pub trait RecipeRepository: Send + Sync {
    fn get(&self, id: &RecipeId) -> SpinResult<Option<Recipe>>;

    /// All records in insertion order.
    fn list(&self) -> SpinResult<Vec<(RecipeId, Recipe)>>;

    /// Insert a new record or replace an existing one.
    fn save(&self, id: &RecipeId, recipe: &Recipe) -> SpinResult<()>;

    /// Remove a record. Returns false if it did not exist.
    fn delete(&self, id: &RecipeId) -> SpinResult<bool>;
}

/// Upsert into an ordered record list.
pub(crate) fn upsert(records: &mut Vec<(RecipeId, Recipe)>, id: &RecipeId, recipe: &Recipe) {
    match records.iter_mut().find(|(rid, _)| rid == id) {
        Some((_, slot)) => *slot = recipe.clone(),
        None => records.push((id.clone(), recipe.clone())),
    }
}

/// Volatile repository, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryRepository {
    records: RwLock<Vec<(RecipeId, Recipe)>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<(RecipeId, Recipe)>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl RecipeRepository for MemoryRepository {
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
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        upsert(&mut records, id, recipe);
        Ok(())
    }

    fn delete(&self, id: &RecipeId) -> SpinResult<bool> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let before = records.len();
        records.retain(|(rid, _)| rid != id);
        Ok(records.len() != before)
    }
}
