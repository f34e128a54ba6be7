use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use wellnoosh_core::breathing::DailyProgress;
use wellnoosh_core::models::{
    Ingredient, MealPlan, MealPlanInput, MealPlanRecipe, MealPlanRecipeInput, Recipe,
    RecipeFilters, UserFavoriteRecipe, UserRecipeRating,
};
use wellnoosh_core::profile::HealthProfile;
use wellnoosh_core::remote::{
    AuthResponse, BreathingRow, FavoriteRow, HealthProfileRow, IngredientRow, MealPlanRecipeRow,
    MealPlanRow, NewMealPlanRecipeRow, NewMealPlanRow, RECIPE_SELECT, RatingRow, RecipeRow,
    RemoteBackend, Session, UserProfileRow, WaterRow, featured_query_params, recipe_query_params,
    recipes_from_rows, single_row,
};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";
const UPSERT_RETURNING: &str = "resolution=merge-duplicates,return=representation";
const DEFAULT_TIER: &str = "free";

/// GoTrue + PostgREST client for a Supabase project.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "wellnoosh-cli/{} (wellness companion)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn rest(&self, method: Method, table: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"), token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = checked(request, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }

    async fn send_empty(&self, request: RequestBuilder, what: &str) -> Result<()> {
        checked(request, what).await.map(|_| ())
    }

    async fn recipes(&self, params: &[(String, String)]) -> Result<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = self
            .send(self.rest(Method::GET, "recipes", None).query(params), "recipes")
            .await?;
        Ok(recipes_from_rows(rows))
    }

    async fn auth(&self, path: &str, email: &str, password: &str) -> Result<Session> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response: AuthResponse = self
            .send(
                self.request(Method::POST, path, None)
                    .json(&Credentials { email, password }),
                "auth",
            )
            .await?;
        response.into_session(email)
    }

    async fn upsert<T: Serialize + Sync>(
        &self,
        session: &Session,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<()> {
        let request = self
            .rest(Method::POST, table, Some(&session.access_token))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", MERGE_DUPLICATES)
            .json(row);
        self.send_empty(request, table).await
    }
}

/// Send a request and turn any non-2xx status into an error carrying the body.
async fn checked(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to reach backend ({what})"))?;
    let status = response.status();
    debug!(%status, what, "backend response");
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Backend request for {what} failed ({status}): {}", error_message(&body));
    }
    Ok(response)
}

/// Pull the human-readable message out of a GoTrue/PostgREST error body.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(serde_json::Value::as_str))
        })
        .map_or_else(|| body.trim().to_string(), str::to_string)
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl RemoteBackend for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.auth("/auth/v1/signup", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.auth("/auth/v1/token?grant_type=password", email, password)
            .await
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        self.send_empty(
            self.request(Method::POST, "/auth/v1/logout", Some(&session.access_token)),
            "logout",
        )
        .await
    }

    async fn create_user_profile(&self, session: &Session, full_name: Option<&str>) -> Result<()> {
        let fallback = session
            .user
            .email
            .split('@')
            .next()
            .unwrap_or(&session.user.email);
        let row = UserProfileRow {
            id: &session.user.id,
            full_name: full_name.unwrap_or(fallback),
            subscription_tier: DEFAULT_TIER,
        };
        let request = self
            .rest(Method::POST, "user_profiles", Some(&session.access_token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        self.send_empty(request, "user profile").await
    }

    async fn fetch_recipes(&self, filters: &RecipeFilters) -> Result<Vec<Recipe>> {
        self.recipes(&recipe_query_params(filters)).await
    }

    async fn search_recipes(&self, query: &str, filters: &RecipeFilters) -> Result<Vec<Recipe>> {
        let filters = RecipeFilters {
            search_query: Some(query.to_string()),
            ..filters.clone()
        };
        self.recipes(&recipe_query_params(&filters)).await
    }

    async fn fetch_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        let params = vec![
            ("select".to_string(), RECIPE_SELECT.to_string()),
            ("id".to_string(), eq(id)),
        ];
        Ok(self.recipes(&params).await?.into_iter().next())
    }

    async fn fetch_featured(&self) -> Result<Vec<Recipe>> {
        self.recipes(&featured_query_params()).await
    }

    async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>> {
        let rows: Vec<IngredientRow> = self
            .send(
                self.rest(Method::GET, "ingredients", None)
                    .query(&[("select", "*"), ("order", "category.asc,name.asc")]),
                "ingredients",
            )
            .await?;
        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    async fn list_favorites(&self, session: &Session) -> Result<Vec<UserFavoriteRecipe>> {
        let rows: Vec<FavoriteRow> = self
            .send(
                self.rest(Method::GET, "user_favorite_recipes", Some(&session.access_token))
                    .query(&[
                        ("select", "*".to_string()),
                        ("user_id", eq(&session.user.id)),
                        ("order", "added_at.desc".to_string()),
                    ]),
                "favorites",
            )
            .await?;
        Ok(rows.into_iter().map(UserFavoriteRecipe::from).collect())
    }

    async fn add_favorite(
        &self,
        session: &Session,
        recipe_id: &str,
        notes: Option<&str>,
    ) -> Result<UserFavoriteRecipe> {
        let row = FavoriteRow {
            id: None,
            user_id: session.user.id.clone(),
            recipe_id: recipe_id.to_string(),
            notes: notes.map(str::to_string),
            added_at: None,
        };
        let rows: Vec<FavoriteRow> = self
            .send(
                self.rest(Method::POST, "user_favorite_recipes", Some(&session.access_token))
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&row),
                "favorite",
            )
            .await?;
        single_row(rows, "favorite").map(UserFavoriteRecipe::from)
    }

    async fn remove_favorite(&self, session: &Session, recipe_id: &str) -> Result<()> {
        let request = self
            .rest(Method::DELETE, "user_favorite_recipes", Some(&session.access_token))
            .query(&[("user_id", eq(&session.user.id)), ("recipe_id", eq(recipe_id))]);
        self.send_empty(request, "favorite").await
    }

    async fn get_rating(
        &self,
        session: &Session,
        recipe_id: &str,
    ) -> Result<Option<UserRecipeRating>> {
        let rows: Vec<RatingRow> = self
            .send(
                self.rest(Method::GET, "user_recipe_ratings", Some(&session.access_token))
                    .query(&[
                        ("select", "*".to_string()),
                        ("user_id", eq(&session.user.id)),
                        ("recipe_id", eq(recipe_id)),
                    ]),
                "rating",
            )
            .await?;
        Ok(rows.into_iter().next().map(UserRecipeRating::from))
    }

    async fn upsert_rating(
        &self,
        session: &Session,
        recipe_id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> Result<UserRecipeRating> {
        let row = RatingRow {
            id: None,
            user_id: session.user.id.clone(),
            recipe_id: recipe_id.to_string(),
            rating,
            review: review.map(str::to_string),
            created_at: None,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        let rows: Vec<RatingRow> = self
            .send(
                self.rest(Method::POST, "user_recipe_ratings", Some(&session.access_token))
                    .query(&[("on_conflict", "user_id,recipe_id")])
                    .header("Prefer", UPSERT_RETURNING)
                    .json(&row),
                "rating",
            )
            .await?;
        single_row(rows, "rating").map(UserRecipeRating::from)
    }

    async fn list_meal_plans(&self, session: &Session) -> Result<Vec<MealPlan>> {
        let rows: Vec<MealPlanRow> = self
            .send(
                self.rest(Method::GET, "meal_plans", Some(&session.access_token))
                    .query(&[
                        ("select", "*,meal_plan_recipes(*)".to_string()),
                        ("user_id", eq(&session.user.id)),
                        ("order", "created_at.desc".to_string()),
                    ]),
                "meal plans",
            )
            .await?;
        rows.into_iter().map(MealPlan::try_from).collect()
    }

    async fn create_meal_plan(&self, session: &Session, input: &MealPlanInput) -> Result<MealPlan> {
        let rows: Vec<MealPlanRow> = self
            .send(
                self.rest(Method::POST, "meal_plans", Some(&session.access_token))
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&NewMealPlanRow::new(&session.user.id, input)),
                "meal plan",
            )
            .await?;
        single_row(rows, "meal plan").and_then(MealPlan::try_from)
    }

    async fn add_meal_plan_recipe(
        &self,
        session: &Session,
        meal_plan_id: &str,
        input: &MealPlanRecipeInput,
    ) -> Result<MealPlanRecipe> {
        let rows: Vec<MealPlanRecipeRow> = self
            .send(
                self.rest(Method::POST, "meal_plan_recipes", Some(&session.access_token))
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&NewMealPlanRecipeRow::new(meal_plan_id, input)),
                "meal plan recipe",
            )
            .await?;
        single_row(rows, "meal plan recipe").and_then(MealPlanRecipe::try_from)
    }

    async fn upsert_health_profile(&self, session: &Session, profile: &HealthProfile) -> Result<()> {
        let row = HealthProfileRow::new(&session.user.id, profile);
        self.upsert(session, "user_health_profiles", "user_id", &row)
            .await
    }

    async fn upsert_breathing(
        &self,
        session: &Session,
        date: NaiveDate,
        progress: &DailyProgress,
    ) -> Result<()> {
        let row = BreathingRow {
            user_id: &session.user.id,
            date,
            exercises: &progress.slots,
            daily_goal: progress.daily_goal,
        };
        self.upsert(session, "breathing_exercises", "user_id,date", &row)
            .await
    }

    async fn upsert_water(
        &self,
        session: &Session,
        date: NaiveDate,
        progress: &DailyProgress,
    ) -> Result<()> {
        let row = WaterRow {
            user_id: &session.user.id,
            date,
            glasses: &progress.slots,
            daily_goal: progress.daily_goal,
        };
        self.upsert(session, "water_intake", "user_id,date", &row)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_fields() {
        assert_eq!(
            error_message(r#"{"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#),
            "Email not confirmed"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
        assert_eq!(error_message(r#"{"unexpected":1}"#), r#"{"unexpected":1}"#);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SupabaseClient::new("https://example.supabase.co/", "anon").unwrap();
        assert_eq!(client.base_url, "https://example.supabase.co");
    }

    #[test]
    fn test_request_headers() {
        let client = SupabaseClient::new("https://example.supabase.co", "anon-key").unwrap();
        let request = client
            .rest(Method::GET, "recipes", Some("user-token"))
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://example.supabase.co/rest/v1/recipes"
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer user-token");

        let anon = client.rest(Method::GET, "recipes", None).build().unwrap();
        assert_eq!(anon.headers()["authorization"], "Bearer anon-key");
    }
}
