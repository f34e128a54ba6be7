//! Backend-as-a-service seam.
//!
//! `RemoteBackend` is implemented over HTTP by the CLI and by in-test mocks.
//! Wire rows mirror the hosted tables (snake_case) and convert into the
//! camelCase models used everywhere else.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::breathing::DailyProgress;
use crate::models::{
    Difficulty, Ingredient, IngredientCategory, MealPlan, MealPlanInput, MealPlanRecipe,
    MealPlanRecipeInput, MealType, Nutrition, Recipe, RecipeFilters, RecipeIngredient,
    UserFavoriteRecipe, UserRecipeRating,
};
use crate::profile::HealthProfile;

pub const DEMO_ACCESS_TOKEN: &str = "mock-jwt-token-for-testing";
pub const DEMO_USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";
pub const DEMO_EMAIL: &str = "test@wellnoosh.com";
const DEMO_SESSION_HOURS: i64 = 24;

pub const RECIPE_SELECT: &str = "*,recipe_ingredients(amount,unit,notes,ingredient_order,is_optional,ingredients(id,name,category,default_unit))";
pub const FEATURED_MIN_RATING: f64 = 4.7;
pub const FEATURED_LIMIT: usize = 10;

// --- Auth ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    /// Offline session used when no backend is configured.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            access_token: DEMO_ACCESS_TOKEN.to_string(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(DEMO_SESSION_HOURS),
            user: SessionUser {
                id: DEMO_USER_ID.to_string(),
                email: DEMO_EMAIL.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.access_token == DEMO_ACCESS_TOKEN
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserRow {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// GoTrue token response. Sign-up without auto-confirm returns only the user.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUserRow>,
}

impl AuthResponse {
    pub fn into_session(self, fallback_email: &str) -> Result<Session> {
        let access_token = self
            .access_token
            .context("No session returned; the account may need email confirmation")?;
        let user = self.user.context("Auth response has no user")?;
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(ts), _) => DateTime::from_timestamp(ts, 0).context("Invalid expires_at")?,
            (None, Some(secs)) => Utc::now() + Duration::seconds(secs),
            (None, None) => Utc::now() + Duration::hours(1),
        };
        Ok(Session {
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: SessionUser {
                id: user.id,
                email: user.email.unwrap_or_else(|| fallback_email.to_string()),
            },
        })
    }
}

// --- Backend trait ---

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
    async fn create_user_profile(&self, session: &Session, full_name: Option<&str>) -> Result<()>;

    async fn fetch_recipes(&self, filters: &RecipeFilters) -> Result<Vec<Recipe>>;
    async fn search_recipes(&self, query: &str, filters: &RecipeFilters) -> Result<Vec<Recipe>>;
    async fn fetch_recipe(&self, id: &str) -> Result<Option<Recipe>>;
    async fn fetch_featured(&self) -> Result<Vec<Recipe>>;
    async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>>;

    async fn list_favorites(&self, session: &Session) -> Result<Vec<UserFavoriteRecipe>>;
    async fn add_favorite(
        &self,
        session: &Session,
        recipe_id: &str,
        notes: Option<&str>,
    ) -> Result<UserFavoriteRecipe>;
    async fn remove_favorite(&self, session: &Session, recipe_id: &str) -> Result<()>;

    async fn get_rating(&self, session: &Session, recipe_id: &str)
    -> Result<Option<UserRecipeRating>>;
    async fn upsert_rating(
        &self,
        session: &Session,
        recipe_id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> Result<UserRecipeRating>;

    async fn list_meal_plans(&self, session: &Session) -> Result<Vec<MealPlan>>;
    async fn create_meal_plan(&self, session: &Session, input: &MealPlanInput) -> Result<MealPlan>;
    async fn add_meal_plan_recipe(
        &self,
        session: &Session,
        meal_plan_id: &str,
        input: &MealPlanRecipeInput,
    ) -> Result<MealPlanRecipe>;

    async fn upsert_health_profile(&self, session: &Session, profile: &HealthProfile) -> Result<()>;
    async fn upsert_breathing(
        &self,
        session: &Session,
        date: NaiveDate,
        progress: &DailyProgress,
    ) -> Result<()>;
    async fn upsert_water(
        &self,
        session: &Session,
        date: NaiveDate,
        progress: &DailyProgress,
    ) -> Result<()>;
}

// --- Wire rows ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientRefRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub default_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientRow {
    pub amount: f64,
    pub unit: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredient_order: Option<i64>,
    #[serde(default)]
    pub is_optional: Option<bool>,
    #[serde(default)]
    pub ingredients: Option<IngredientRefRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub prep_time_minutes: Option<i64>,
    #[serde(default)]
    pub cook_time_minutes: Option<i64>,
    #[serde(default)]
    pub total_time_minutes: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub diet_categories: Option<Vec<String>>,
    #[serde(default)]
    pub allergen_info: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<i64>,
    #[serde(default)]
    pub calories_per_serving: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub fiber_g: Option<f64>,
    #[serde(default)]
    pub sugar_g: Option<f64>,
    #[serde(default)]
    pub sodium_mg: Option<f64>,
    #[serde(default)]
    pub instructions: Option<Vec<String>>,
    #[serde(default)]
    pub tips: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_premium: Option<bool>,
    #[serde(default)]
    pub recipe_ingredients: Vec<RecipeIngredientRow>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = anyhow::Error;

    fn try_from(row: RecipeRow) -> Result<Self> {
        let meal_type = row
            .meal_type
            .as_deref()
            .context("missing meal_type")
            .and_then(MealType::from_str)
            .with_context(|| format!("recipe {}", row.id))?;
        let difficulty = row
            .difficulty
            .as_deref()
            .map(Difficulty::from_str)
            .transpose()?
            .unwrap_or(Difficulty::Medium);
        let prep = row.prep_time_minutes.unwrap_or(0);
        let cook = row.cook_time_minutes.unwrap_or(0);

        let mut ingredients: Vec<RecipeIngredient> = row
            .recipe_ingredients
            .into_iter()
            .map(|ri| {
                let reference = ri.ingredients.unwrap_or_default();
                RecipeIngredient {
                    ingredient_id: reference.id,
                    name: reference.name,
                    amount: ri.amount,
                    unit: ri.unit,
                    notes: ri.notes,
                    ingredient_order: ri.ingredient_order.unwrap_or(0),
                    is_optional: ri.is_optional.unwrap_or(false),
                }
            })
            .collect();
        ingredients.sort_by_key(|i| i.ingredient_order);

        Ok(Recipe {
            id: row.id,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            prep_time_minutes: prep,
            cook_time_minutes: cook,
            total_time_minutes: row.total_time_minutes.unwrap_or(prep + cook),
            servings: row.servings.unwrap_or(1),
            difficulty,
            cuisine_type: row.cuisine_type,
            meal_type,
            diet_categories: row.diet_categories.unwrap_or_default(),
            allergen_info: row.allergen_info.unwrap_or_default(),
            tags: row.tags.unwrap_or_default(),
            rating: row.rating,
            rating_count: row.rating_count.unwrap_or(0),
            nutrition: Nutrition {
                calories_per_serving: row.calories_per_serving.unwrap_or(0.0),
                protein_g: row.protein_g.unwrap_or(0.0),
                carbs_g: row.carbs_g.unwrap_or(0.0),
                fat_g: row.fat_g.unwrap_or(0.0),
                fiber_g: row.fiber_g,
                sugar_g: row.sugar_g,
                sodium_mg: row.sodium_mg,
            },
            instructions: row.instructions.unwrap_or_default(),
            tips: row.tips,
            video_url: row.video_url,
            source_url: row.source_url,
            is_featured: row.is_featured.unwrap_or(false),
            is_premium: row.is_premium.unwrap_or(false),
            ingredients,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert rows, dropping (and logging) any the models cannot represent.
#[must_use]
pub fn recipes_from_rows(rows: Vec<RecipeRow>) -> Vec<Recipe> {
    rows.into_iter()
        .filter_map(|row| match Recipe::try_from(row) {
            Ok(recipe) => Some(recipe),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "skipping malformed recipe row");
                None
            }
        })
        .collect()
}

fn parse_category(raw: Option<&str>) -> IngredientCategory {
    raw.and_then(|c| serde_json::from_value(serde_json::Value::String(c.to_string())).ok())
        .unwrap_or(IngredientCategory::Other)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub default_unit: Option<String>,
    #[serde(default)]
    pub calories_per_100g: Option<f64>,
    #[serde(default)]
    pub protein_per_100g: Option<f64>,
    #[serde(default)]
    pub carbs_per_100g: Option<f64>,
    #[serde(default)]
    pub fat_per_100g: Option<f64>,
    #[serde(default)]
    pub is_vegetarian: Option<bool>,
    #[serde(default)]
    pub is_vegan: Option<bool>,
    #[serde(default)]
    pub is_gluten_free: Option<bool>,
    #[serde(default)]
    pub is_dairy_free: Option<bool>,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Ingredient {
            category: parse_category(row.category.as_deref()),
            id: row.id,
            name: row.name,
            default_unit: row.default_unit,
            calories_per_100g: row.calories_per_100g,
            protein_per_100g: row.protein_per_100g,
            carbs_per_100g: row.carbs_per_100g,
            fat_per_100g: row.fat_per_100g,
            is_vegetarian: row.is_vegetarian.unwrap_or(false),
            is_vegan: row.is_vegan.unwrap_or(false),
            is_gluten_free: row.is_gluten_free.unwrap_or(false),
            is_dairy_free: row.is_dairy_free.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanRecipeRow {
    pub id: String,
    pub meal_plan_id: String,
    pub recipe_id: String,
    pub scheduled_date: NaiveDate,
    pub meal_type: String,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<MealPlanRecipeRow> for MealPlanRecipe {
    type Error = anyhow::Error;

    fn try_from(row: MealPlanRecipeRow) -> Result<Self> {
        Ok(MealPlanRecipe {
            meal_type: row.meal_type.parse()?,
            id: row.id,
            meal_plan_id: row.meal_plan_id,
            recipe_id: row.recipe_id,
            scheduled_date: row.scheduled_date,
            servings: row.servings.unwrap_or(1),
            is_completed: row.is_completed.unwrap_or(false),
            completed_at: row.completed_at,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub total_recipes: Option<i64>,
    #[serde(default)]
    pub total_calories: Option<f64>,
    #[serde(default)]
    pub average_daily_calories: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub meal_plan_recipes: Vec<MealPlanRecipeRow>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TryFrom<MealPlanRow> for MealPlan {
    type Error = anyhow::Error;

    fn try_from(row: MealPlanRow) -> Result<Self> {
        let recipes = row
            .meal_plan_recipes
            .into_iter()
            .map(MealPlanRecipe::try_from)
            .collect::<Result<Vec<_>>>()?;
        let created_at = row.created_at.unwrap_or_default();
        Ok(MealPlan {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            total_recipes: row.total_recipes.unwrap_or(0),
            total_calories: row.total_calories.unwrap_or(0.0),
            average_daily_calories: row.average_daily_calories.unwrap_or(0.0),
            is_active: row.is_active.unwrap_or(true),
            preferences: row.preferences,
            recipes,
            updated_at: row.updated_at.unwrap_or_else(|| created_at.clone()),
            created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMealPlanRow<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<&'a serde_json::Value>,
}

impl<'a> NewMealPlanRow<'a> {
    #[must_use]
    pub fn new(user_id: &'a str, input: &'a MealPlanInput) -> Self {
        Self {
            user_id,
            name: input.name.trim(),
            description: input.description.as_deref(),
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            preferences: input.preferences.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMealPlanRecipeRow<'a> {
    pub meal_plan_id: &'a str,
    pub recipe_id: &'a str,
    pub scheduled_date: NaiveDate,
    pub meal_type: &'static str,
    pub servings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

impl<'a> NewMealPlanRecipeRow<'a> {
    #[must_use]
    pub fn new(meal_plan_id: &'a str, input: &'a MealPlanRecipeInput) -> Self {
        Self {
            meal_plan_id,
            recipe_id: &input.recipe_id,
            scheduled_date: input.scheduled_date,
            meal_type: input.meal_type.as_str(),
            servings: input.servings,
            notes: input.notes.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRow {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub recipe_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub added_at: Option<String>,
}

impl From<FavoriteRow> for UserFavoriteRecipe {
    fn from(row: FavoriteRow) -> Self {
        UserFavoriteRecipe {
            id: row
                .id
                .unwrap_or_else(|| format!("{}-{}", row.user_id, row.recipe_id)),
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            notes: row.notes,
            added_at: row.added_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub recipe_id: String,
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<RatingRow> for UserRecipeRating {
    fn from(row: RatingRow) -> Self {
        UserRecipeRating {
            id: row
                .id
                .unwrap_or_else(|| format!("{}-{}", row.user_id, row.recipe_id)),
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            rating: row.rating,
            review: row.review,
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthProfileRow {
    pub user_id: String,
    pub age: Option<u32>,
    pub gender: Option<&'static str>,
    pub height_cm: Option<f64>,
    pub weight_kg: f64,
    pub activity_level: &'static str,
    pub health_goals: Vec<&'static str>,
    pub dietary_preferences: Vec<&'static str>,
    pub target_weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    pub updated_at: String,
}

impl HealthProfileRow {
    #[must_use]
    pub fn new(user_id: &str, profile: &HealthProfile) -> Self {
        Self {
            user_id: user_id.to_string(),
            age: profile.age,
            gender: profile.sex.map(crate::profile::Sex::as_str),
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            activity_level: profile.activity_level.key(),
            health_goals: profile.health_goals.iter().map(|g| g.label()).collect(),
            dietary_preferences: profile.diet_styles.iter().map(|d| d.label()).collect(),
            target_weight_kg: profile.weight_goal_kg,
            bmi: profile
                .height_cm
                .map(|h| crate::nutrition::bmi(profile.weight_kg, h)),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreathingRow<'a> {
    pub user_id: &'a str,
    pub date: NaiveDate,
    pub exercises: &'a [bool],
    pub daily_goal: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaterRow<'a> {
    pub user_id: &'a str,
    pub date: NaiveDate,
    pub glasses: &'a [bool],
    pub daily_goal: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileRow<'a> {
    pub id: &'a str,
    pub full_name: &'a str,
    pub subscription_tier: &'static str,
}

// --- Query building ---

fn pg_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect();
    format!("{{{}}}", quoted.join(","))
}

/// Strip characters that would break out of a PostgREST `or=(...)` group.
fn sanitize_search(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"'))
        .collect()
}

/// PostgREST query parameters for a recipe listing.
#[must_use]
pub fn recipe_query_params(filters: &RecipeFilters) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![("select".into(), RECIPE_SELECT.into())];
    let mut push = |key: &str, value: String| params.push((key.to_string(), value));

    if let Some(meal_type) = filters.meal_type {
        push("meal_type", format!("eq.{meal_type}"));
    }
    if let Some(ref cuisine) = filters.cuisine_type {
        push("cuisine_type", format!("eq.{cuisine}"));
    }
    if let Some(difficulty) = filters.difficulty {
        push("difficulty", format!("eq.{}", difficulty.as_str()));
    }
    if let Some(max) = filters.max_prep_time {
        push("prep_time_minutes", format!("lte.{max}"));
    }
    if let Some(max) = filters.max_cook_time {
        push("cook_time_minutes", format!("lte.{max}"));
    }
    if let Some(max) = filters.max_calories {
        push("calories_per_serving", format!("lte.{max}"));
    }
    if let Some(min) = filters.min_protein {
        push("protein_g", format!("gte.{min}"));
    }
    if let Some(ref diets) = filters.diet_categories {
        if !diets.is_empty() {
            push("diet_categories", format!("ov.{}", pg_list(diets)));
        }
    }
    if let Some(ref tags) = filters.tags {
        if !tags.is_empty() {
            push("tags", format!("ov.{}", pg_list(tags)));
        }
    }
    if let Some(ref allergens) = filters.exclude_allergens {
        if !allergens.is_empty() {
            push("allergen_info", format!("not.ov.{}", pg_list(allergens)));
        }
    }
    if let Some(ref q) = filters.search_query {
        let q = sanitize_search(q);
        if !q.is_empty() {
            push(
                "or",
                format!("(name.ilike.*{q}*,description.ilike.*{q}*)"),
            );
        }
    }
    push("order", "rating.desc.nullslast".to_string());
    params
}

#[must_use]
pub fn featured_query_params() -> Vec<(String, String)> {
    vec![
        ("select".into(), RECIPE_SELECT.into()),
        (
            "or".into(),
            format!("(is_featured.eq.true,rating.gte.{FEATURED_MIN_RATING})"),
        ),
        ("order".into(), "rating.desc.nullslast".into()),
        ("limit".into(), FEATURED_LIMIT.to_string()),
    ]
}

/// Parse the first row of a `return=representation` response.
pub fn single_row<T>(rows: Vec<T>, what: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| anyhow!("Backend returned no {what}"))
}
