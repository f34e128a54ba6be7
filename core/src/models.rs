use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

pub const MEAL_TYPES: &[MealType] = &[
    MealType::Breakfast,
    MealType::Lunch,
    MealType::Dinner,
    MealType::Snack,
    MealType::Dessert,
];

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
            Self::Dessert => "Dessert",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            "dessert" => Ok(Self::Dessert),
            _ => bail!(
                "Invalid meal type '{s}'. Must be one of: {}",
                MEAL_TYPES
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => bail!("Invalid difficulty '{s}'. Must be one of: Easy, Medium, Hard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IngredientCategory {
    Vegetables,
    Fruits,
    Proteins,
    Dairy,
    Grains,
    Legumes,
    #[serde(rename = "Nuts & Seeds")]
    NutsAndSeeds,
    #[serde(rename = "Oils & Fats")]
    OilsAndFats,
    #[serde(rename = "Herbs & Spices")]
    HerbsAndSpices,
    Condiments,
    Beverages,
    Other,
}

// --- Recipes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    pub calories_per_serving: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium_mg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredient {
    pub ingredient_id: String,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredient_order: i64,
    #[serde(default)]
    pub is_optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub prep_time_minutes: i64,
    pub cook_time_minutes: i64,
    pub total_time_minutes: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    pub meal_type: MealType,
    #[serde(default)]
    pub diet_categories: Vec<String>,
    #[serde(default)]
    pub allergen_info: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: i64,
    pub nutrition: Nutrition,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Recipe {
    /// Case-insensitive free-text match over name, description, tags and cuisine.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            || self
                .cuisine_type
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub category: IngredientCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_per_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_per_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_per_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_per_100g: Option<f64>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_dairy_free: bool,
}

/// Client-side recipe filter. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_allergens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_prep_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cook_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

impl RecipeFilters {
    #[must_use]
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if self.meal_type.is_some_and(|m| m != recipe.meal_type) {
            return false;
        }
        if let Some(ref cuisine) = self.cuisine_type {
            if recipe.cuisine_type.as_deref() != Some(cuisine.as_str()) {
                return false;
            }
        }
        if self.difficulty.is_some_and(|d| d != recipe.difficulty) {
            return false;
        }
        if self
            .max_prep_time
            .is_some_and(|max| recipe.prep_time_minutes > max)
        {
            return false;
        }
        if self
            .max_cook_time
            .is_some_and(|max| recipe.cook_time_minutes > max)
        {
            return false;
        }
        if self
            .max_calories
            .is_some_and(|max| recipe.nutrition.calories_per_serving > max)
        {
            return false;
        }
        if self
            .min_protein
            .is_some_and(|min| recipe.nutrition.protein_g < min)
        {
            return false;
        }
        if let Some(ref wanted) = self.diet_categories {
            if !wanted.is_empty() && !any_shared(wanted, &recipe.diet_categories) {
                return false;
            }
        }
        if let Some(ref excluded) = self.exclude_allergens {
            if any_shared(excluded, &recipe.allergen_info) {
                return false;
            }
        }
        if let Some(ref wanted) = self.tags {
            if !wanted.is_empty() && !any_shared(wanted, &recipe.tags) {
                return false;
            }
        }
        if let Some(ref q) = self.search_query {
            if !recipe.matches_query(q) {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn apply(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn any_shared(wanted: &[String], have: &[String]) -> bool {
    wanted.iter().any(|w| have.iter().any(|h| h == w))
}

// --- Meal plans ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRecipe {
    pub id: String,
    pub meal_plan_id: String,
    pub recipe_id: String,
    pub scheduled_date: NaiveDate,
    pub meal_type: MealType,
    pub servings: i64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub total_recipes: i64,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub average_daily_calories: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub recipes: Vec<MealPlanRecipe>,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRecipeInput {
    pub recipe_id: String,
    pub scheduled_date: NaiveDate,
    pub meal_type: MealType,
    pub servings: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn validate_meal_plan_input(input: &MealPlanInput) -> Result<()> {
    if input.name.trim().is_empty() {
        bail!("Meal plan name must not be empty");
    }
    if input.end_date < input.start_date {
        bail!("Meal plan end date must not be before its start date");
    }
    Ok(())
}

pub fn validate_meal_plan_recipe_input(input: &MealPlanRecipeInput) -> Result<()> {
    if input.recipe_id.trim().is_empty() {
        bail!("recipeId must not be empty");
    }
    if input.servings <= 0 {
        bail!("Servings must be greater than 0");
    }
    Ok(())
}

// --- Favorites and ratings ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFavoriteRecipe {
    pub id: String,
    pub user_id: String,
    pub recipe_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecipeRating {
    pub id: String,
    pub user_id: String,
    pub recipe_id: String,
    pub rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub fn validate_rating(rating: i64) -> Result<()> {
    if !(1..=5).contains(&rating) {
        bail!("Rating must be between 1 and 5 (got {rating})");
    }
    Ok(())
}
