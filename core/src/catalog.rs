//! Demo recipe catalog compiled into the binary.
//!
//! Served when no backend is configured and whenever a remote read fails.

use std::sync::LazyLock;

use serde::Deserialize;
use tracing::error;

use crate::models::{Ingredient, Recipe, RecipeFilters};
use crate::remote::{FEATURED_LIMIT, FEATURED_MIN_RATING};

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    recipes: Vec<Recipe>,
    ingredients: Vec<Ingredient>,
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/catalog.json")).unwrap_or_else(|e| {
        error!(error = %e, "embedded catalog is invalid");
        Catalog::default()
    })
});

#[must_use]
pub fn recipes() -> &'static [Recipe] {
    &CATALOG.recipes
}

/// All demo ingredients, ordered by category then name.
#[must_use]
pub fn ingredients() -> Vec<Ingredient> {
    let mut items = CATALOG.ingredients.clone();
    items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
    items
}

#[must_use]
pub fn recipe_by_id(id: &str) -> Option<Recipe> {
    recipes().iter().find(|r| r.id == id).cloned()
}

#[must_use]
pub fn filter(filters: &RecipeFilters) -> Vec<Recipe> {
    filters.apply(recipes().to_vec())
}

/// Free-text search, best rated first.
#[must_use]
pub fn search(query: &str, filters: &RecipeFilters) -> Vec<Recipe> {
    let mut hits: Vec<Recipe> = recipes()
        .iter()
        .filter(|r| r.matches_query(query) && filters.matches(r))
        .cloned()
        .collect();
    hits.sort_by(|a, b| {
        b.rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0))
    });
    hits
}

#[must_use]
pub fn featured() -> Vec<Recipe> {
    recipes()
        .iter()
        .filter(|r| r.rating.is_some_and(|rating| rating >= FEATURED_MIN_RATING))
        .take(FEATURED_LIMIT)
        .cloned()
        .collect()
}
