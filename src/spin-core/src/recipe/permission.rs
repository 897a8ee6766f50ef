// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Ownership and sharing rules.
//!
//! A recipe belongs to its author. Sharing it hands read, update and delete
//! rights to every user.

use super::Recipe;

/// Whether `user` may see `recipe` in any listing or lookup.
pub fn is_visible(user: &str, recipe: &Recipe) -> bool {
    recipe.shared || recipe.author == user
}

/// Whether `user` may overwrite `recipe`.
pub fn can_modify(user: &str, recipe: &Recipe) -> bool {
    recipe.author == user || recipe.shared
}

/// Whether `user` may remove `recipe`.
pub fn can_delete(user: &str, recipe: &Recipe) -> bool {
    recipe.author == user || recipe.shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeDraft;

    fn recipe(author: &str, shared: bool) -> Recipe {
        RecipeDraft::new("r", 1000, 10)
            .shared(shared)
            .into_recipe(author)
    }

    #[test]
    fn test_visibility_matrix() {
        for (author, shared, user, expected) in [
            ("alice", false, "alice", true),
            ("alice", false, "bob", false),
            ("alice", true, "alice", true),
            ("alice", true, "bob", true),
        ] {
            assert_eq!(
                is_visible(user, &recipe(author, shared)),
                expected,
                "author={author} shared={shared} user={user}"
            );
        }
    }

    #[test]
    fn test_private_recipe_is_locked_to_author() {
        let r = recipe("alice", false);
        assert!(can_modify("alice", &r));
        assert!(can_delete("alice", &r));
        assert!(!can_modify("bob", &r));
        assert!(!can_delete("bob", &r));
    }

    #[test]
    fn test_shared_recipe_is_open_to_everyone() {
        let r = recipe("alice", true);
        assert!(can_modify("bob", &r));
        assert!(can_delete("bob", &r));
    }
}
