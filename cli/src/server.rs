use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use wellnoosh_core::breathing::{DailyRecord, ProgressError, Tracker};
use wellnoosh_core::models::{
    Difficulty, Ingredient, MealPlan, MealPlanInput, MealPlanRecipe, MealPlanRecipeInput,
    MealType, Recipe, RecipeFilters, UserFavoriteRecipe, UserRecipeRating,
    validate_meal_plan_input, validate_meal_plan_recipe_input, validate_rating,
};
use wellnoosh_core::nutrition::{Assessment, WeightGoalError};
use wellnoosh_core::profile::{HealthProfile, ProfileError};
use wellnoosh_core::service::{WellnooshService, WizardCompletion};
use wellnoosh_core::wizard::{QuestionnaireAnswers, WizardError, WizardOutcome};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<WellnooshService>,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend_configured: bool,
}

#[derive(Serialize)]
struct SavedProfile {
    profile: HealthProfile,
    synced: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteWizardRequest {
    profile: HealthProfile,
    answers: QuestionnaireAnswers,
    start_date: Option<NaiveDate>,
}

/// Query-string form of [`RecipeFilters`]; list values are comma separated.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RecipeQuery {
    q: Option<String>,
    meal_type: Option<String>,
    cuisine: Option<String>,
    difficulty: Option<String>,
    diet: Option<String>,
    exclude_allergens: Option<String>,
    tags: Option<String>,
    max_prep_time: Option<i64>,
    max_cook_time: Option<i64>,
    max_calories: Option<f64>,
    min_protein: Option<f64>,
}

fn split_list(value: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

impl RecipeQuery {
    fn filters(&self) -> Result<RecipeFilters, ApiError> {
        let meal_type = self
            .meal_type
            .as_deref()
            .map(str::parse::<MealType>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let difficulty = self
            .difficulty
            .as_deref()
            .map(str::parse::<Difficulty>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(RecipeFilters {
            meal_type,
            cuisine_type: self.cuisine.clone(),
            difficulty,
            diet_categories: split_list(self.diet.as_deref()),
            exclude_allergens: split_list(self.exclude_allergens.as_deref()),
            max_prep_time: self.max_prep_time,
            max_cook_time: self.max_cook_time,
            max_calories: self.max_calories,
            min_protein: self.min_protein,
            tags: split_list(self.tags.as_deref()),
            search_query: None,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFavoriteRequest {
    recipe_id: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct RateRequest {
    rating: i64,
    review: Option<String>,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    /// Domain validation failures become 400s; anything else is internal.
    fn from(err: anyhow::Error) -> Self {
        let is_validation = err.downcast_ref::<ProfileError>().is_some()
            || err.downcast_ref::<WeightGoalError>().is_some()
            || err.downcast_ref::<WizardError>().is_some()
            || err.downcast_ref::<ProgressError>().is_some();
        if is_validation {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err)
        }
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{date_str}'. Use YYYY-MM-DD")))
}

fn check_slot(tracker: Tracker, index: usize) -> Result<(), ApiError> {
    let goal = tracker.daily_goal();
    if index >= goal {
        return Err(ApiError::BadRequest(
            ProgressError::OutOfRange {
                index,
                max: goal - 1,
            }
            .to_string(),
        ));
    }
    Ok(())
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Health, profile and wizard ---

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend_configured: state.service.is_remote_configured(),
    })
}

async fn assess_profile(
    State(state): State<AppState>,
    Json(profile): Json<HealthProfile>,
) -> Result<Json<Assessment>, ApiError> {
    profile
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.service.assessment(&profile)))
}

async fn get_profile(State(state): State<AppState>) -> Result<Json<HealthProfile>, ApiError> {
    let profile = state
        .service
        .health_profile()?
        .ok_or_else(|| ApiError::NotFound("No health profile saved".to_string()))?;
    Ok(Json(profile))
}

async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<HealthProfile>,
) -> Result<Json<SavedProfile>, ApiError> {
    let synced = state.service.save_health_profile(&profile).await?;
    Ok(Json(SavedProfile { profile, synced }))
}

async fn complete_wizard(
    State(state): State<AppState>,
    Json(req): Json<CompleteWizardRequest>,
) -> Result<(StatusCode, Json<WizardCompletion>), ApiError> {
    let outcome = WizardOutcome::from_inputs(req.profile, req.answers)?;
    let start = req
        .start_date
        .unwrap_or_else(|| Local::now().date_naive());
    let done = state.service.complete_wizard_from(&outcome, start).await?;
    Ok((StatusCode::CREATED, Json(done)))
}

async fn last_wizard_outcome(
    State(state): State<AppState>,
) -> Result<Json<WizardOutcome>, ApiError> {
    let outcome = state
        .service
        .last_wizard_outcome()?
        .ok_or_else(|| ApiError::NotFound("The wizard has not been completed yet".to_string()))?;
    Ok(Json(outcome))
}

// --- Recipes ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filters = query.filters()?;
    Ok(Json(state.service.recipes(&filters).await))
}

async fn featured_recipes(State(state): State<AppState>) -> Json<Vec<Recipe>> {
    Json(state.service.featured_recipes().await)
}

async fn search_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filters = query.filters()?;
    let q = query.q.as_deref().unwrap_or_default();
    Ok(Json(state.service.search_recipes(q, &filters).await))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = state
        .service
        .recipe(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Recipe not found: {id}")))?;
    Ok(Json(recipe))
}

async fn list_ingredients(State(state): State<AppState>) -> Json<Vec<Ingredient>> {
    Json(state.service.ingredients().await)
}

// --- Favorites and ratings ---

async fn list_favorites(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserFavoriteRecipe>>, ApiError> {
    Ok(Json(state.service.favorites().await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(req): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<UserFavoriteRecipe>), ApiError> {
    if req.recipe_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "recipeId must not be empty".to_string(),
        ));
    }
    let favorite = state
        .service
        .add_favorite(&req.recipe_id, req.notes.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.service.remove_favorite(&recipe_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "{recipe_id} is not in your favorites"
        )))
    }
}

async fn get_rating(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Result<Json<UserRecipeRating>, ApiError> {
    let rating = state
        .service
        .rating(&recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No rating for {recipe_id}")))?;
    Ok(Json(rating))
}

async fn put_rating(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    Json(req): Json<RateRequest>,
) -> Result<Json<UserRecipeRating>, ApiError> {
    validate_rating(req.rating).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let saved = state
        .service
        .rate_recipe(&recipe_id, req.rating, req.review.as_deref())
        .await?;
    Ok(Json(saved))
}

// --- Meal plans ---

async fn list_meal_plans(State(state): State<AppState>) -> Result<Json<Vec<MealPlan>>, ApiError> {
    Ok(Json(state.service.meal_plans().await?))
}

async fn create_meal_plan(
    State(state): State<AppState>,
    Json(input): Json<MealPlanInput>,
) -> Result<(StatusCode, Json<MealPlan>), ApiError> {
    validate_meal_plan_input(&input).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let plan = state.service.create_meal_plan(&input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn add_meal_plan_recipe(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    Json(input): Json<MealPlanRecipeInput>,
) -> Result<(StatusCode, Json<MealPlanRecipe>), ApiError> {
    validate_meal_plan_recipe_input(&input).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let plans = state.service.meal_plans().await?;
    if !plans.iter().any(|p| p.id == plan_id) {
        return Err(ApiError::NotFound(format!(
            "Meal plan not found: {plan_id}"
        )));
    }
    if state.service.recipe(&input.recipe_id).await.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Recipe not found: {}",
            input.recipe_id
        )));
    }

    let entry = state
        .service
        .add_recipe_to_meal_plan(&plan_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// --- Daily trackers ---

async fn get_breathing(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    Ok(Json(state.service.daily_record(Tracker::Breathing, date)?))
}

async fn complete_breathing(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    Ok(Json(state.service.record_breathing_completion(date).await?))
}

async fn toggle_breathing(
    State(state): State<AppState>,
    Path((date_str, index)): Path<(String, usize)>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    check_slot(Tracker::Breathing, index)?;
    Ok(Json(state.service.toggle_breathing(date, index).await?))
}

async fn get_water(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    Ok(Json(state.service.daily_record(Tracker::Water, date)?))
}

async fn add_water(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    Ok(Json(state.service.add_water(date).await?))
}

async fn toggle_water(
    State(state): State<AppState>,
    Path((date_str, index)): Path<(String, usize)>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_date(&date_str)?;
    check_slot(Tracker::Water, index)?;
    Ok(Json(state.service.toggle_water(date, index).await?))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/assessment", post(assess_profile))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/wizard/complete", post(complete_wizard))
        .route("/api/wizard/outcome", get(last_wizard_outcome))
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/featured", get(featured_recipes))
        .route("/api/recipes/search", get(search_recipes))
        .route("/api/recipes/{id}", get(get_recipe))
        .route("/api/ingredients", get(list_ingredients))
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route("/api/favorites/{recipe_id}", delete(remove_favorite))
        .route("/api/ratings/{recipe_id}", get(get_rating).put(put_rating))
        .route("/api/meal-plans", get(list_meal_plans).post(create_meal_plan))
        .route("/api/meal-plans/{id}/recipes", post(add_meal_plan_recipe))
        .route("/api/breathing/{date}", get(get_breathing))
        .route("/api/breathing/{date}/complete", post(complete_breathing))
        .route("/api/breathing/{date}/toggle/{index}", post(toggle_breathing))
        .route("/api/water/{date}", get(get_water))
        .route("/api/water/{date}/add", post(add_water))
        .route("/api/water/{date}/toggle/{index}", post(toggle_water))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters; short keys are hidden entirely.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    service: WellnooshService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(service),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    match api_key {
        Some(ref key) if new_api_key => {
            eprintln!("Generated API key (stored in the data directory):\n  {key}");
        }
        Some(ref key) => {
            eprintln!(
                "API key: {} (see api_key file in data directory)",
                mask_key(key)
            );
        }
        None => {
            warn!("authentication disabled (--no-auth)");
            eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
        }
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(%bind, port, "server listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            service: Arc::new(WellnooshService::new_in_memory().unwrap()),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    async fn send(app: Router, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn empty_post(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::post(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn mask_key_handles_short_and_multibyte_keys() {
        assert_eq!(mask_key("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(mask_key("abc"), "****");
        assert_eq!(mask_key(""), "****");
        assert_eq!(mask_key("ééééxxxxxxxxxxxxüüüü"), "éééé...üüüü");
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let (status, json) = send(
            test_app(Some("test-key-abc123".to_string())),
            get("/api/health"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("correct-key".to_string()));
        let response = app
            .oneshot(
                axum::http::Request::get("/api/health")
                    .header("authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("correct-key".to_string()));
        let response = app
            .oneshot(
                axum::http::Request::get("/api/health")
                    .header("authorization", "Bearer correct-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let response = test_app(None).oneshot(get("/api/health")).await.unwrap();
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn security_headers_on_auth_failure() {
        let response = test_app(Some("secret".to_string()))
            .oneshot(get("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let response = test_app(None)
            .oneshot(
                axum::http::Request::put("/api/profile")
                    .header("content-type", "application/json")
                    .body(Body::from(vec![0u8; BODY_LIMIT + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/.wellnoosh/db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn domain_errors_map_to_bad_request() {
        let err: ApiError = anyhow::Error::from(ProfileError::Age(5)).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("between 13 and 120")));
        let err: ApiError = anyhow::anyhow!("disk on fire").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn health_reports_offline_backend() {
        let (status, json) = send(test_app(None), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["backendConfigured"], false);
    }

    #[tokio::test]
    async fn assessment_computes_target() {
        let body = serde_json::json!({
            "age": 30,
            "genderBiologicalSex": "female",
            "heightCm": 170.0,
            "weightKg": 70.0,
            "activityLevel": "sedentary",
            "healthGoals": ["Lose Weight"],
        });
        let (status, json) = send(test_app(None), json_request("POST", "/api/assessment", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!((json["bmi"].as_f64().unwrap() - 24.2).abs() < 0.05);
        assert_eq!(json["target"]["calories"], 1290);
    }

    #[tokio::test]
    async fn assessment_rejects_out_of_range_age() {
        let body = serde_json::json!({ "age": 8, "weightKg": 70.0 });
        let (status, json) = send(test_app(None), json_request("POST", "/api/assessment", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Age"));
    }

    #[tokio::test]
    async fn profile_round_trip_through_api() {
        let state = test_state(None);
        let (status, _) = send(build_router(state.clone()), get("/api/profile")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let body = serde_json::json!({ "age": 41, "weightKg": 82.5 });
        let (status, json) = send(
            build_router(state.clone()),
            json_request("PUT", "/api/profile", &body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["synced"], false);

        let (status, json) = send(build_router(state), get("/api/profile")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["age"], 41);
    }

    #[tokio::test]
    async fn wizard_complete_creates_week() {
        let state = test_state(None);
        let body = serde_json::json!({
            "profile": {
                "age": 30,
                "genderBiologicalSex": "female",
                "heightCm": 170.0,
                "weightKg": 70.0,
                "healthGoals": ["Lose Weight"],
                "dietStyles": ["Balanced"],
                "weightGoalKg": 65.0,
            },
            "answers": {
                "dailyActivity": "Sitting all day long at work",
                "mealsPerDay": "Three",
                "stomachComfort": "No",
            },
            "startDate": "2026-04-06",
        });
        let (status, json) = send(
            build_router(state.clone()),
            json_request("POST", "/api/wizard/complete", &body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["meals"].as_array().unwrap().len(), 21);
        assert_eq!(json["plan"]["startDate"], "2026-04-06");
        assert_eq!(json["plan"]["endDate"], "2026-04-12");

        let (status, json) = send(build_router(state), get("/api/wizard/outcome")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["dailyCalories"], 1290);
    }

    #[tokio::test]
    async fn wizard_complete_rejects_missing_goals() {
        let body = serde_json::json!({
            "profile": { "weightKg": 70.0 },
            "answers": {
                "dailyActivity": "Sitting all day long at work",
                "mealsPerDay": "Three",
                "stomachComfort": "No",
            },
        });
        let (status, json) = send(
            test_app(None),
            json_request("POST", "/api/wizard/complete", &body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Select at least one option to continue");
    }

    #[tokio::test]
    async fn recipes_filter_by_query_string() {
        let (status, json) = send(
            test_app(None),
            get("/api/recipes?mealType=dinner&diet=Vegan"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let recipes = json.as_array().unwrap();
        assert!(!recipes.is_empty());
        for recipe in recipes {
            assert_eq!(recipe["mealType"], "Dinner");
        }
    }

    #[tokio::test]
    async fn recipes_reject_bad_meal_type() {
        let (status, _) = send(test_app(None), get("/api/recipes?mealType=brunch")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recipe_not_found_returns_404() {
        let (status, json) = send(test_app(None), get("/api/recipes/no-such-recipe")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Recipe not found: no-such-recipe");
    }

    #[tokio::test]
    async fn favorites_add_list_remove() {
        let state = test_state(None);
        let body = serde_json::json!({ "recipeId": "demo-baked-salmon" });
        let (status, _) = send(
            build_router(state.clone()),
            json_request("POST", "/api/favorites", &body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = send(build_router(state.clone()), get("/api/favorites")).await;
        assert_eq!(json.as_array().unwrap().len(), 1);

        let delete = axum::http::Request::delete("/api/favorites/demo-baked-salmon")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build_router(state.clone()), delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let delete = axum::http::Request::delete("/api/favorites/demo-baked-salmon")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build_router(state), delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rating_validates_range() {
        let state = test_state(None);
        let (status, _) = send(
            build_router(state.clone()),
            json_request("PUT", "/api/ratings/r1", &serde_json::json!({ "rating": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            build_router(state.clone()),
            json_request(
                "PUT",
                "/api/ratings/r1",
                &serde_json::json!({ "rating": 4, "review": "tasty" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rating"], 4);

        let (status, json) = send(build_router(state), get("/api/ratings/r1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["review"], "tasty");
    }

    #[tokio::test]
    async fn meal_plan_create_and_schedule() {
        let state = test_state(None);
        let body = serde_json::json!({
            "name": "Test week",
            "startDate": "2026-04-06",
            "endDate": "2026-04-12",
        });
        let (status, plan) = send(
            build_router(state.clone()),
            json_request("POST", "/api/meal-plans", &body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let plan_id = plan["id"].as_str().unwrap().to_string();

        let entry = serde_json::json!({
            "recipeId": "demo-baked-salmon",
            "scheduledDate": "2026-04-07",
            "mealType": "Dinner",
            "servings": 2,
        });
        let (status, json) = send(
            build_router(state.clone()),
            json_request("POST", &format!("/api/meal-plans/{plan_id}/recipes"), &entry),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["servings"], 2);

        let (status, _) = send(
            build_router(state.clone()),
            json_request("POST", "/api/meal-plans/missing/recipes", &entry),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, plans) = send(build_router(state), get("/api/meal-plans")).await;
        assert_eq!(plans[0]["totalRecipes"], 1);
        assert_eq!(plans[0]["totalCalories"], 1240.0);
    }

    #[tokio::test]
    async fn meal_plan_rejects_reversed_dates() {
        let body = serde_json::json!({
            "name": "Backwards",
            "startDate": "2026-04-12",
            "endDate": "2026-04-06",
        });
        let (status, _) = send(test_app(None), json_request("POST", "/api/meal-plans", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn breathing_complete_and_toggle() {
        let state = test_state(None);
        let (status, json) = send(
            build_router(state.clone()),
            empty_post("/api/breathing/2026-04-06/complete"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["completed"], 1);
        assert_eq!(json["dailyGoal"], 6);

        let (_, json) = send(
            build_router(state.clone()),
            empty_post("/api/breathing/2026-04-06/toggle/0"),
        )
        .await;
        assert_eq!(json["completed"], 0);

        let (status, _) = send(
            build_router(state),
            empty_post("/api/breathing/2026-04-06/toggle/6"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn water_add_caps_at_goal() {
        let state = test_state(None);
        for _ in 0..10 {
            send(build_router(state.clone()), empty_post("/api/water/2026-04-06/add")).await;
        }
        let (status, json) = send(build_router(state), get("/api/water/2026-04-06")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["completed"], 8);
        assert_eq!(json["synced"], false);
    }

    #[tokio::test]
    async fn tracker_rejects_bad_date() {
        let (status, json) = send(test_app(None), get("/api/water/06-04-2026")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }
}
