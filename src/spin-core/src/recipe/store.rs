// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Recipe store: visibility, authorized save/delete and activity logging.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::permission::{can_delete, can_modify, is_visible};
use super::repository::RecipeRepository;
use super::{Recipe, RecipeDraft, RecipeId};
use crate::activity::ActivitySink;
use crate::step::SpinStep;
use crate::{SpinError, SpinResult};

/// A recipe as presented to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeEntry {
    pub id: RecipeId,
    pub recipe: Recipe,
    /// Display label; shared recipes by other authors carry the author.
    pub label: String,
}

impl RecipeEntry {
    fn new(user: &str, id: RecipeId, recipe: Recipe) -> Self {
        let label = if recipe.shared && recipe.author != user {
            format!("{} ({})", recipe.name, recipe.author)
        } else {
            recipe.name.clone()
        };
        Self { id, recipe, label }
    }
}

/// Visible recipes for one user, split for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipeCatalog {
    /// Unshared recipes authored by the user.
    pub private: Vec<RecipeEntry>,
    /// Every shared recipe, the user's own included.
    pub shared: Vec<RecipeEntry>,
}

impl RecipeCatalog {
    pub fn len(&self) -> usize {
        self.private.len() + self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.private.is_empty() && self.shared.is_empty()
    }

    /// Private entries first, then shared.
    pub fn iter(&self) -> impl Iterator<Item = &RecipeEntry> {
        self.private.iter().chain(self.shared.iter())
    }
}

pub struct RecipeStore {
    repo: Arc<dyn RecipeRepository>,
    activity: Arc<dyn ActivitySink>,
}

impl RecipeStore {
    pub fn new(repo: Arc<dyn RecipeRepository>, activity: Arc<dyn ActivitySink>) -> Self {
        Self { repo, activity }
    }

    /// Recipes visible to `user`, partitioned and sorted by name.
    ///
    /// Sorting is stable, so recipes sharing a name keep insertion order.
    pub fn catalog(&self, user: &str) -> SpinResult<RecipeCatalog> {
        let mut catalog = RecipeCatalog::default();
        if user.is_empty() {
            return Ok(catalog);
        }
        for (id, recipe) in self.repo.list()? {
            if recipe.shared {
                catalog.shared.push(RecipeEntry::new(user, id, recipe));
            } else if recipe.author == user {
                catalog.private.push(RecipeEntry::new(user, id, recipe));
            }
        }
        catalog
            .private
            .sort_by(|a, b| a.recipe.name.cmp(&b.recipe.name));
        catalog
            .shared
            .sort_by(|a, b| a.recipe.name.cmp(&b.recipe.name));
        Ok(catalog)
    }

    /// Look up a recipe visible to `user`.
    ///
    /// Recipes hidden from the user are reported exactly like missing ones.
    pub fn get(&self, user: &str, id: &RecipeId) -> SpinResult<Recipe> {
        match self.repo.get(id)? {
            Some(recipe) if is_visible(user, &recipe) => Ok(recipe),
            _ => Err(SpinError::not_found(format!("recipe {}", id))),
        }
    }

    /// Create or update a recipe.
    ///
    /// An id that does not resolve to an existing record creates a new
    /// recipe under a fresh id. Updates keep the original author.
    pub fn save(
        &self,
        user: &str,
        id: Option<&RecipeId>,
        draft: RecipeDraft,
    ) -> SpinResult<RecipeId> {
        if user.is_empty() {
            return Err(SpinError::validation("select a user first"));
        }
        if draft.name.is_empty() {
            return Err(SpinError::validation("recipe name must not be empty"));
        }

        let existing = match id {
            Some(id) => self.repo.get(id)?.map(|recipe| (id.clone(), recipe)),
            None => None,
        };

        let name = draft.name.clone();
        let (id, recipe) = match existing {
            Some((id, current)) => {
                if !can_modify(user, &current) {
                    return Err(SpinError::permission(format!(
                        "you cannot modify '{}' because it belongs to {} and is not shared",
                        current.name, current.author
                    )));
                }
                debug!("Updating recipe {} ({}) as {}", id, name, user);
                let updated = draft.apply_to(&current);
                (id, updated)
            }
            None => {
                let id = RecipeId::generate();
                debug!("Creating recipe {} ({}) as {}", id, name, user);
                (id, draft.into_recipe(user))
            }
        };

        self.repo.save(&id, &recipe)?;
        info!("Saved recipe '{}' ({})", name, id);
        self.record(user, &format!("Saved: {}", name));
        Ok(id)
    }

    /// Delete a recipe the user owns or that is shared.
    pub fn delete(&self, user: &str, id: &RecipeId) -> SpinResult<Recipe> {
        let Some(recipe) = self.repo.get(id)? else {
            return Err(SpinError::not_found(format!("recipe {}", id)));
        };
        if !can_delete(user, &recipe) {
            return Err(SpinError::permission(format!(
                "you cannot delete '{}'; it belongs to {}",
                recipe.name, recipe.author
            )));
        }
        self.repo.delete(id)?;
        info!("Deleted recipe '{}' ({})", recipe.name, id);
        self.record(user, &format!("Deleted: {}", recipe.name));
        Ok(recipe)
    }

    /// The recipe change is already persisted, so a failed log write is
    /// reported but does not fail the operation.
    fn record(&self, user: &str, action: &str) {
        if let Err(e) = self.activity.record(user, action) {
            warn!("Failed to record activity '{}': {}", action, e);
        }
    }

    /// Snapshot a visible recipe as a spin step for the execution queue.
    pub fn snapshot(&self, user: &str, id: &RecipeId) -> SpinResult<SpinStep> {
        let recipe = self.get(user, id)?;
        Ok(SpinStep::from_recipe(id, &recipe))
    }
}
