use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::breathing::{DailyProgress, DailyRecord, Tracker};
use crate::catalog;
use crate::db::Database;
use crate::models::{
    Ingredient, MealPlan, MealPlanInput, MealPlanRecipe, MealPlanRecipeInput, Recipe,
    RecipeFilters, UserFavoriteRecipe, UserRecipeRating, validate_meal_plan_input,
    validate_meal_plan_recipe_input, validate_rating,
};
use crate::nutrition::{self, Assessment};
use crate::planner::{self, MealsPerDay, PLAN_DAYS, PlannedMeal};
use crate::profile::{DietStyle, HealthProfile};
use crate::remote::{RemoteBackend, Session};
use crate::wizard::{Wizard, WizardOutcome};

const SESSION_KEY: &str = "auth_session";
const WIZARD_OUTCOME_KEY: &str = "wizard_outcome";
/// Owner of local rows while nobody is signed in.
pub const LOCAL_USER_ID: &str = "local";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWeek {
    pub plan: MealPlan,
    pub meals: Vec<PlannedMeal>,
}

/// A finished wizard: the outcome plus the week it produced.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardCompletion {
    pub outcome: WizardOutcome,
    pub plan: MealPlan,
    pub meals: Vec<PlannedMeal>,
}

pub struct WellnooshService {
    db: Mutex<Database>,
    remote: Option<Arc<dyn RemoteBackend>>,
}

impl WellnooshService {
    pub fn new(db: Database, remote: Option<Arc<dyn RemoteBackend>>) -> Self {
        Self {
            db: Mutex::new(db),
            remote,
        }
    }

    pub fn open(db_path: &Path, remote: Option<Arc<dyn RemoteBackend>>) -> Result<Self> {
        Ok(Self::new(Database::open(db_path)?, remote))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, None))
    }

    #[must_use]
    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The backend plus a usable session, when both exist.
    fn remote_session(&self) -> Result<Option<(Arc<dyn RemoteBackend>, Session)>> {
        let Some(remote) = self.remote.clone() else {
            return Ok(None);
        };
        let Some(session) = self.session()? else {
            return Ok(None);
        };
        if session.is_demo() {
            return Ok(None);
        }
        if session.is_expired(Utc::now()) {
            warn!(user = %session.user.id, "session expired, working locally");
            return Ok(None);
        }
        Ok(Some((remote, session)))
    }

    fn user_id(&self) -> Result<String> {
        Ok(self
            .session()?
            .map_or_else(|| LOCAL_USER_ID.to_string(), |s| s.user.id))
    }

    // --- Auth ---

    pub fn session(&self) -> Result<Option<Session>> {
        self.db().get_json_setting(SESSION_KEY)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Session> {
        let email = normalize_credentials(email, password)?;
        let session = match &self.remote {
            None => Session::demo(),
            Some(remote) => {
                let session = remote.sign_up(&email, password).await?;
                if let Err(e) = remote.create_user_profile(&session, full_name).await {
                    warn!(error = %format!("{e:#}"), user = %session.user.id, "failed to create user profile");
                }
                session
            }
        };
        self.db().set_json_setting(SESSION_KEY, &session)?;
        info!(user = %session.user.id, demo = session.is_demo(), "signed up");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_credentials(email, password)?;
        let session = match &self.remote {
            None => Session::demo(),
            Some(remote) => remote.sign_in(&email, password).await?,
        };
        self.db().set_json_setting(SESSION_KEY, &session)?;
        info!(user = %session.user.id, demo = session.is_demo(), "signed in");
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<()> {
        if let Some((remote, session)) = self.remote_session()? {
            if let Err(e) = remote.sign_out(&session).await {
                warn!(error = %format!("{e:#}"), "remote sign-out failed");
            }
        }
        self.db().delete_setting(SESSION_KEY)?;
        Ok(())
    }

    // --- Recipes ---

    pub async fn recipes(&self, filters: &RecipeFilters) -> Vec<Recipe> {
        if let Some(remote) = &self.remote {
            match remote.fetch_recipes(filters).await {
                Ok(recipes) => return recipes,
                Err(e) => warn!(error = %format!("{e:#}"), "recipe fetch failed, using demo catalog"),
            }
        }
        catalog::filter(filters)
    }

    pub async fn recipe(&self, id: &str) -> Option<Recipe> {
        if let Some(remote) = &self.remote {
            match remote.fetch_recipe(id).await {
                Ok(recipe) => return recipe,
                Err(e) => warn!(error = %format!("{e:#}"), id, "recipe lookup failed, using demo catalog"),
            }
        }
        catalog::recipe_by_id(id)
    }

    pub async fn search_recipes(&self, query: &str, filters: &RecipeFilters) -> Vec<Recipe> {
        if query.trim().is_empty() {
            return self.recipes(filters).await;
        }
        if let Some(remote) = &self.remote {
            match remote.search_recipes(query, filters).await {
                Ok(recipes) => return recipes,
                Err(e) => warn!(error = %format!("{e:#}"), query, "recipe search failed, using demo catalog"),
            }
        }
        catalog::search(query, filters)
    }

    pub async fn featured_recipes(&self) -> Vec<Recipe> {
        if let Some(remote) = &self.remote {
            match remote.fetch_featured().await {
                Ok(recipes) => return recipes,
                Err(e) => warn!(error = %format!("{e:#}"), "featured fetch failed, using demo catalog"),
            }
        }
        catalog::featured()
    }

    pub async fn ingredients(&self) -> Vec<Ingredient> {
        if let Some(remote) = &self.remote {
            match remote.fetch_ingredients().await {
                Ok(items) => return items,
                Err(e) => warn!(error = %format!("{e:#}"), "ingredient fetch failed, using demo catalog"),
            }
        }
        catalog::ingredients()
    }

    // --- Favorites ---

    pub async fn favorites(&self) -> Result<Vec<UserFavoriteRecipe>> {
        if let Some((remote, session)) = self.remote_session()? {
            match remote.list_favorites(&session).await {
                Ok(favorites) => {
                    let db = self.db();
                    for favorite in &favorites {
                        db.upsert_favorite(favorite)?;
                    }
                    return Ok(favorites);
                }
                Err(e) => warn!(error = %format!("{e:#}"), "favorites fetch failed, using local store"),
            }
        }
        let user_id = self.user_id()?;
        self.db().list_favorites(&user_id)
    }

    pub async fn add_favorite(
        &self,
        recipe_id: &str,
        notes: Option<&str>,
    ) -> Result<UserFavoriteRecipe> {
        if recipe_id.trim().is_empty() {
            bail!("recipeId must not be empty");
        }
        if let Some((remote, session)) = self.remote_session()? {
            let favorite = remote.add_favorite(&session, recipe_id, notes).await?;
            self.db().upsert_favorite(&favorite)?;
            return Ok(favorite);
        }
        let user_id = self.user_id()?;
        self.db().add_favorite(&user_id, recipe_id, notes)
    }

    /// Returns whether a favorite existed locally.
    pub async fn remove_favorite(&self, recipe_id: &str) -> Result<bool> {
        if let Some((remote, session)) = self.remote_session()? {
            remote.remove_favorite(&session, recipe_id).await?;
        }
        let user_id = self.user_id()?;
        self.db().remove_favorite(&user_id, recipe_id)
    }

    // --- Ratings ---

    pub async fn rating(&self, recipe_id: &str) -> Result<Option<UserRecipeRating>> {
        if let Some((remote, session)) = self.remote_session()? {
            return Ok(match remote.get_rating(&session, recipe_id).await {
                Ok(rating) => rating,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), recipe_id, "rating fetch failed");
                    None
                }
            });
        }
        let user_id = self.user_id()?;
        self.db().get_rating(&user_id, recipe_id)
    }

    pub async fn rate_recipe(
        &self,
        recipe_id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> Result<UserRecipeRating> {
        validate_rating(rating)?;
        if let Some((remote, session)) = self.remote_session()? {
            let saved = remote
                .upsert_rating(&session, recipe_id, rating, review)
                .await?;
            self.db().save_rating(&saved)?;
            return Ok(saved);
        }
        let user_id = self.user_id()?;
        self.db().upsert_rating(&user_id, recipe_id, rating, review)
    }

    // --- Meal plans ---

    pub async fn meal_plans(&self) -> Result<Vec<MealPlan>> {
        if let Some((remote, session)) = self.remote_session()? {
            match remote.list_meal_plans(&session).await {
                Ok(plans) => return Ok(plans),
                Err(e) => warn!(error = %format!("{e:#}"), "meal plan fetch failed, using local store"),
            }
        }
        let user_id = self.user_id()?;
        self.db().list_meal_plans(&user_id)
    }

    pub async fn create_meal_plan(&self, input: &MealPlanInput) -> Result<MealPlan> {
        validate_meal_plan_input(input)?;
        if let Some((remote, session)) = self.remote_session()? {
            let plan = remote.create_meal_plan(&session, input).await?;
            self.db().upsert_meal_plan(&plan)?;
            return Ok(plan);
        }
        let user_id = self.user_id()?;
        self.db().create_meal_plan(&user_id, input)
    }

    pub async fn add_recipe_to_meal_plan(
        &self,
        meal_plan_id: &str,
        input: &MealPlanRecipeInput,
    ) -> Result<MealPlanRecipe> {
        validate_meal_plan_recipe_input(input)?;
        let recipe = self
            .recipe(&input.recipe_id)
            .await
            .with_context(|| format!("Recipe not found: {}", input.recipe_id))?;
        self.schedule(meal_plan_id, input, recipe.nutrition.calories_per_serving)
            .await
    }

    async fn schedule(
        &self,
        meal_plan_id: &str,
        input: &MealPlanRecipeInput,
        calories_per_serving: f64,
    ) -> Result<MealPlanRecipe> {
        #[allow(clippy::cast_precision_loss)]
        let calories = calories_per_serving * input.servings as f64;
        if let Some((remote, session)) = self.remote_session()? {
            let entry = remote
                .add_meal_plan_recipe(&session, meal_plan_id, input)
                .await?;
            if let Err(e) = self.db().save_meal_plan_recipe(&entry, calories) {
                debug!(error = %format!("{e:#}"), meal_plan_id, "plan not mirrored locally");
            }
            return Ok(entry);
        }
        self.db()
            .add_meal_plan_recipe(meal_plan_id, input, calories_per_serving)
    }

    // --- Health profile ---

    pub fn health_profile(&self) -> Result<Option<HealthProfile>> {
        let user_id = self.user_id()?;
        self.db().get_health_profile(&user_id)
    }

    /// Validate and store the profile. Returns whether it reached the backend.
    pub async fn save_health_profile(&self, profile: &HealthProfile) -> Result<bool> {
        profile.validate()?;
        let user_id = self.user_id()?;
        self.db().save_health_profile(&user_id, profile)?;
        let Some((remote, session)) = self.remote_session()? else {
            return Ok(false);
        };
        match remote.upsert_health_profile(&session, profile).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "health profile sync failed, changes saved locally");
                Ok(false)
            }
        }
    }

    #[must_use]
    pub fn assessment(&self, profile: &HealthProfile) -> Assessment {
        nutrition::assess(profile)
    }

    // --- Wizard ---

    /// A wizard preloaded with the saved profile, or defaults for a new user.
    pub fn start_wizard(&self) -> Result<Wizard> {
        Ok(Wizard::new(self.health_profile()?.unwrap_or_default()))
    }

    pub fn last_wizard_outcome(&self) -> Result<Option<WizardOutcome>> {
        self.db().get_json_setting(WIZARD_OUTCOME_KEY)
    }

    pub async fn complete_wizard(&self, outcome: &WizardOutcome) -> Result<WizardCompletion> {
        self.complete_wizard_from(outcome, Local::now().date_naive())
            .await
    }

    /// Persist the wizard result and lay out a week of meals starting at `start`.
    pub async fn complete_wizard_from(
        &self,
        outcome: &WizardOutcome,
        start: NaiveDate,
    ) -> Result<WizardCompletion> {
        let synced = self.save_health_profile(&outcome.profile).await?;
        debug!(synced, "wizard profile saved");
        self.db().set_json_setting(WIZARD_OUTCOME_KEY, outcome)?;

        let week = self
            .plan_week(
                &outcome.profile,
                outcome.daily_calories,
                outcome.answers.meals_per_day,
                start,
                serde_json::json!({ "stomachComfort": outcome.answers.stomach_comfort }),
            )
            .await?;
        Ok(WizardCompletion {
            outcome: outcome.clone(),
            plan: week.plan,
            meals: week.meals,
        })
    }

    /// Plan a week from the saved profile without running the wizard.
    pub async fn generate_meal_plan(
        &self,
        meals_per_day: MealsPerDay,
        start: NaiveDate,
    ) -> Result<GeneratedWeek> {
        let profile = self.health_profile()?.unwrap_or_default();
        let calories = nutrition::daily_calories(&profile).calories;
        self.plan_week(&profile, calories, meals_per_day, start, serde_json::json!({}))
            .await
    }

    #[allow(clippy::cast_precision_loss)]
    async fn plan_week(
        &self,
        profile: &HealthProfile,
        daily_calories: i64,
        meals_per_day: MealsPerDay,
        start: NaiveDate,
        mut preferences: serde_json::Value,
    ) -> Result<GeneratedWeek> {
        let filters = diet_filters(profile);
        let candidates = self.recipes(&RecipeFilters::default()).await;
        let mut meals =
            planner::generate_week(&candidates, start, meals_per_day, daily_calories, &filters);
        if meals.is_empty() && filters != RecipeFilters::default() {
            warn!("no recipes match the selected diet styles, planning without them");
            meals = planner::generate_week(
                &candidates,
                start,
                meals_per_day,
                daily_calories,
                &RecipeFilters::default(),
            );
        }

        if let Some(prefs) = preferences.as_object_mut() {
            prefs.insert("dailyCalories".into(), daily_calories.into());
            prefs.insert("mealsPerDay".into(), serde_json::to_value(meals_per_day)?);
            prefs.insert(
                "dietCategories".into(),
                serde_json::to_value(&filters.diet_categories)?,
            );
        }
        let input = MealPlanInput {
            name: format!("Week of {}", start.format("%b %-d")),
            description: Some(format!(
                "{daily_calories} kcal/day, {} meals per day",
                meals_per_day.label().to_lowercase()
            )),
            start_date: start,
            end_date: start + Duration::days(PLAN_DAYS - 1),
            preferences: Some(preferences),
        };
        let mut plan = self.create_meal_plan(&input).await?;
        for meal in &meals {
            let entry = MealPlanRecipeInput {
                recipe_id: meal.recipe_id.clone(),
                scheduled_date: meal.date,
                meal_type: meal.meal_type,
                servings: 1,
                notes: Some(format!("{} at {}", meal.meal_type, meal.time)),
            };
            let scheduled = self.schedule(&plan.id, &entry, meal.calories).await?;
            plan.total_recipes += 1;
            plan.total_calories += meal.calories;
            plan.recipes.push(scheduled);
        }
        plan.average_daily_calories = (plan.total_calories / PLAN_DAYS as f64).round();
        info!(plan = %plan.id, meals = meals.len(), "meal plan generated");

        Ok(GeneratedWeek { plan, meals })
    }

    // --- Daily trackers ---

    pub fn daily_record(&self, tracker: Tracker, date: NaiveDate) -> Result<DailyRecord> {
        let user_id = self.user_id()?;
        Ok(self
            .db()
            .get_daily_record(tracker, &user_id, date)?
            .unwrap_or_else(|| DailyRecord::new(tracker, date, tracker.empty(), false)))
    }

    pub async fn record_breathing_completion(&self, date: NaiveDate) -> Result<DailyRecord> {
        self.update_tracker(Tracker::Breathing, date, |p| {
            p.add_next();
            Ok(())
        })
        .await
    }

    pub async fn toggle_breathing(&self, date: NaiveDate, index: usize) -> Result<DailyRecord> {
        self.update_tracker(Tracker::Breathing, date, |p| {
            p.toggle(index)?;
            Ok(())
        })
        .await
    }

    pub async fn add_water(&self, date: NaiveDate) -> Result<DailyRecord> {
        self.update_tracker(Tracker::Water, date, |p| {
            p.add_next();
            Ok(())
        })
        .await
    }

    pub async fn toggle_water(&self, date: NaiveDate, index: usize) -> Result<DailyRecord> {
        self.update_tracker(Tracker::Water, date, |p| {
            p.toggle(index)?;
            Ok(())
        })
        .await
    }

    /// Apply a change locally first, then try to push it. A failed push
    /// leaves the record marked unsynced for `sync_pending`.
    async fn update_tracker<F>(&self, tracker: Tracker, date: NaiveDate, change: F) -> Result<DailyRecord>
    where
        F: FnOnce(&mut DailyProgress) -> Result<()>,
    {
        let user_id = self.user_id()?;
        let mut record = {
            let db = self.db();
            let mut progress = db
                .get_daily_record(tracker, &user_id, date)?
                .map_or_else(|| tracker.empty(), |r| r.progress);
            change(&mut progress)?;
            let record = DailyRecord::new(tracker, date, progress, false);
            db.save_daily_record(&user_id, &record)?;
            record
        };

        // Another change to the same day may land while the push is in flight.
        if self.push_record(&record).await {
            record.synced =
                self.db()
                    .mark_daily_synced(tracker, &user_id, date, &record.progress.slots)?;
        }
        Ok(record)
    }

    async fn push_record(&self, record: &DailyRecord) -> bool {
        let (remote, session) = match self.remote_session() {
            Ok(Some(pair)) => pair,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read session");
                return false;
            }
        };
        let pushed = match record.tracker {
            Tracker::Breathing => {
                remote
                    .upsert_breathing(&session, record.date, &record.progress)
                    .await
            }
            Tracker::Water => {
                remote
                    .upsert_water(&session, record.date, &record.progress)
                    .await
            }
        };
        match pushed {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    error = %format!("{e:#}"),
                    tracker = record.tracker.as_str(),
                    date = %record.date,
                    "sync failed, changes saved locally"
                );
                false
            }
        }
    }

    /// Push every unsynced tracker day. Returns how many were pushed.
    pub async fn sync_pending(&self) -> Result<usize> {
        if self.remote_session()?.is_none() {
            return Ok(0);
        }
        let user_id = self.user_id()?;
        let mut pushed = 0;
        for tracker in [Tracker::Breathing, Tracker::Water] {
            let pending = self.db().unsynced_records(tracker, &user_id)?;
            for record in pending {
                if self.push_record(&record).await
                    && self.db().mark_daily_synced(
                        tracker,
                        &user_id,
                        record.date,
                        &record.progress.slots,
                    )?
                {
                    pushed += 1;
                }
            }
        }
        Ok(pushed)
    }
}

fn normalize_credentials(email: &str, password: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        bail!("Please enter a valid email address");
    }
    if password.len() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(email)
}

/// Diet styles that correspond to recipe diet categories narrow the plan.
fn diet_filters(profile: &HealthProfile) -> RecipeFilters {
    let diets: Vec<String> = profile
        .diet_styles
        .iter()
        .filter(|style| {
            matches!(
                style,
                DietStyle::Vegetarian
                    | DietStyle::Vegan
                    | DietStyle::Pescatarian
                    | DietStyle::Keto
                    | DietStyle::GlutenFree
                    | DietStyle::DairyFree
            )
        })
        .map(|style| style.label().to_string())
        .collect();
    RecipeFilters {
        diet_categories: (!diets.is_empty()).then_some(diets),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::{MealType, Nutrition};
    use crate::profile::{HealthGoal, Sex};
    use crate::remote::{SessionUser, DEMO_USER_ID};
    use crate::wizard::{DailyActivity, QuestionnaireAnswers, StomachComfort};

    #[derive(Default)]
    struct MockRemote {
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        fail_profile: bool,
        slow_water: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl MockRemote {
        fn failing() -> Self {
            let mock = Self::default();
            mock.fail_reads.store(true, Ordering::SeqCst);
            mock.fail_writes.store(true, Ordering::SeqCst);
            mock
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn read(&self) -> Result<()> {
            if self.fail_reads.load(Ordering::SeqCst) {
                bail!("backend unavailable");
            }
            Ok(())
        }

        fn write(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                bail!("backend rejected write");
            }
            Ok(())
        }

        fn session(email: &str) -> Session {
            Session {
                access_token: "remote-token".into(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
                user: SessionUser {
                    id: "remote-user".into(),
                    email: email.into(),
                },
            }
        }
    }

    fn remote_recipe(id: &str) -> Recipe {
        Recipe {
            id: id.into(),
            name: "Remote stew".into(),
            description: None,
            image_url: None,
            prep_time_minutes: 5,
            cook_time_minutes: 5,
            total_time_minutes: 10,
            servings: 1,
            difficulty: crate::models::Difficulty::Easy,
            cuisine_type: None,
            meal_type: MealType::Dinner,
            diet_categories: vec![],
            allergen_info: vec![],
            tags: vec![],
            rating: Some(4.0),
            rating_count: 1,
            nutrition: Nutrition {
                calories_per_serving: 400.0,
                protein_g: 20.0,
                carbs_g: 30.0,
                fat_g: 10.0,
                fiber_g: None,
                sugar_g: None,
                sodium_mg: None,
            },
            instructions: vec![],
            tips: None,
            video_url: None,
            source_url: None,
            is_featured: false,
            is_premium: false,
            ingredients: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    #[async_trait]
    impl RemoteBackend for MockRemote {
        async fn sign_up(&self, email: &str, _password: &str) -> Result<Session> {
            self.log(format!("sign_up {email}"));
            self.write()?;
            Ok(Self::session(email))
        }

        async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
            self.log(format!("sign_in {email}"));
            self.write()?;
            Ok(Self::session(email))
        }

        async fn sign_out(&self, _session: &Session) -> Result<()> {
            self.log("sign_out");
            self.write()
        }

        async fn create_user_profile(&self, _session: &Session, _name: Option<&str>) -> Result<()> {
            self.log("create_user_profile");
            if self.fail_profile {
                bail!("profile insert failed");
            }
            Ok(())
        }

        async fn fetch_recipes(&self, _filters: &RecipeFilters) -> Result<Vec<Recipe>> {
            self.read()?;
            Ok(vec![remote_recipe("remote-1")])
        }

        async fn search_recipes(&self, _query: &str, _filters: &RecipeFilters) -> Result<Vec<Recipe>> {
            self.read()?;
            Ok(vec![remote_recipe("remote-1")])
        }

        async fn fetch_recipe(&self, id: &str) -> Result<Option<Recipe>> {
            self.read()?;
            Ok((id == "remote-1").then(|| remote_recipe(id)))
        }

        async fn fetch_featured(&self) -> Result<Vec<Recipe>> {
            self.read()?;
            Ok(vec![])
        }

        async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>> {
            self.read()?;
            Ok(vec![])
        }

        async fn list_favorites(&self, session: &Session) -> Result<Vec<UserFavoriteRecipe>> {
            self.read()?;
            Ok(vec![UserFavoriteRecipe {
                id: "fav-1".into(),
                user_id: session.user.id.clone(),
                recipe_id: "remote-1".into(),
                notes: None,
                added_at: "2026-01-01T00:00:00Z".into(),
            }])
        }

        async fn add_favorite(
            &self,
            session: &Session,
            recipe_id: &str,
            notes: Option<&str>,
        ) -> Result<UserFavoriteRecipe> {
            self.log(format!("add_favorite {recipe_id}"));
            self.write()?;
            Ok(UserFavoriteRecipe {
                id: format!("fav-{recipe_id}"),
                user_id: session.user.id.clone(),
                recipe_id: recipe_id.into(),
                notes: notes.map(str::to_string),
                added_at: "2026-01-01T00:00:00Z".into(),
            })
        }

        async fn remove_favorite(&self, _session: &Session, recipe_id: &str) -> Result<()> {
            self.log(format!("remove_favorite {recipe_id}"));
            self.write()
        }

        async fn get_rating(&self, _session: &Session, _recipe_id: &str) -> Result<Option<UserRecipeRating>> {
            self.read()?;
            Ok(None)
        }

        async fn upsert_rating(
            &self,
            session: &Session,
            recipe_id: &str,
            rating: i64,
            review: Option<&str>,
        ) -> Result<UserRecipeRating> {
            self.write()?;
            Ok(UserRecipeRating {
                id: "rating-1".into(),
                user_id: session.user.id.clone(),
                recipe_id: recipe_id.into(),
                rating,
                review: review.map(str::to_string),
                created_at: "2026-01-01T00:00:00Z".into(),
                updated_at: None,
            })
        }

        async fn list_meal_plans(&self, _session: &Session) -> Result<Vec<MealPlan>> {
            self.read()?;
            Ok(vec![])
        }

        async fn create_meal_plan(&self, session: &Session, input: &MealPlanInput) -> Result<MealPlan> {
            self.log("create_meal_plan");
            self.write()?;
            Ok(MealPlan {
                id: "plan-1".into(),
                user_id: session.user.id.clone(),
                name: input.name.clone(),
                description: input.description.clone(),
                start_date: input.start_date,
                end_date: input.end_date,
                total_recipes: 0,
                total_calories: 0.0,
                average_daily_calories: 0.0,
                is_active: true,
                preferences: input.preferences.clone(),
                recipes: vec![],
                created_at: "2026-01-01T00:00:00Z".into(),
                updated_at: "2026-01-01T00:00:00Z".into(),
            })
        }

        async fn add_meal_plan_recipe(
            &self,
            _session: &Session,
            meal_plan_id: &str,
            input: &MealPlanRecipeInput,
        ) -> Result<MealPlanRecipe> {
            self.write()?;
            Ok(MealPlanRecipe {
                id: uuid::Uuid::new_v4().to_string(),
                meal_plan_id: meal_plan_id.into(),
                recipe_id: input.recipe_id.clone(),
                scheduled_date: input.scheduled_date,
                meal_type: input.meal_type,
                servings: input.servings,
                is_completed: false,
                completed_at: None,
                notes: input.notes.clone(),
            })
        }

        async fn upsert_health_profile(&self, _session: &Session, _profile: &HealthProfile) -> Result<()> {
            self.log("upsert_health_profile");
            self.write()
        }

        async fn upsert_breathing(
            &self,
            _session: &Session,
            date: NaiveDate,
            progress: &DailyProgress,
        ) -> Result<()> {
            self.log(format!("upsert_breathing {date} {}", progress.completed()));
            self.write()
        }

        async fn upsert_water(
            &self,
            _session: &Session,
            date: NaiveDate,
            progress: &DailyProgress,
        ) -> Result<()> {
            self.log(format!("upsert_water {date} {}", progress.completed()));
            if self.slow_water.swap(false, Ordering::SeqCst) {
                for _ in 0..20 {
                    tokio::task::yield_now().await;
                }
            }
            self.write()
        }
    }

    fn with_remote(mock: MockRemote) -> (WellnooshService, Arc<MockRemote>) {
        let mock = Arc::new(mock);
        let remote: Arc<dyn RemoteBackend> = mock.clone();
        let service = WellnooshService::new(Database::open_in_memory().unwrap(), Some(remote));
        (service, mock)
    }

    async fn signed_in(mock: MockRemote) -> (WellnooshService, Arc<MockRemote>) {
        let fail = mock.fail_writes.swap(false, Ordering::SeqCst);
        let (service, mock) = with_remote(mock);
        service.sign_in("me@example.com", "secret123").await.unwrap();
        mock.fail_writes.store(fail, Ordering::SeqCst);
        (service, mock)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 6).unwrap()
    }

    fn outcome(meals_per_day: MealsPerDay) -> WizardOutcome {
        let profile = HealthProfile {
            age: Some(30),
            sex: Some(Sex::Female),
            height_cm: Some(170.0),
            weight_kg: 70.0,
            health_goals: [HealthGoal::LoseWeight].into_iter().collect(),
            weight_goal_kg: Some(65.0),
            ..Default::default()
        };
        let assessment = nutrition::assess(&profile);
        WizardOutcome {
            daily_calories: assessment.target.calories,
            bmi: assessment.bmi,
            bmi_feedback: assessment.bmi_feedback.clone(),
            assessment,
            answers: QuestionnaireAnswers {
                daily_activity: DailyActivity::SittingAtWork,
                meals_per_day,
                stomach_comfort: StomachComfort::Yes,
            },
            profile,
        }
    }

    #[tokio::test]
    async fn test_offline_reads_use_catalog() {
        let service = WellnooshService::new_in_memory().unwrap();
        assert!(!service.is_remote_configured());
        assert_eq!(
            service.recipes(&RecipeFilters::default()).await.len(),
            catalog::recipes().len()
        );
        assert!(service.recipe("demo-baked-salmon").await.is_some());
        assert!(!service.featured_recipes().await.is_empty());
        assert!(!service.ingredients().await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_reads_preferred() {
        let (service, _) = with_remote(MockRemote::default());
        let recipes = service.recipes(&RecipeFilters::default()).await;
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "remote-1");
        assert!(service.recipe("demo-baked-salmon").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_remote_reads_fall_back_to_catalog() {
        let (service, _) = with_remote(MockRemote::failing());
        let filters = RecipeFilters {
            meal_type: Some(MealType::Breakfast),
            ..Default::default()
        };
        let recipes = service.recipes(&filters).await;
        assert!(!recipes.is_empty());
        assert!(recipes.iter().all(|r| r.meal_type == MealType::Breakfast));
        assert!(service.recipe("demo-baked-salmon").await.is_some());
        assert!(!service.search_recipes("salmon", &RecipeFilters::default()).await.is_empty());
        assert_eq!(service.featured_recipes().await, catalog::featured());
    }

    #[tokio::test]
    async fn test_offline_sign_in_uses_demo_session() {
        let service = WellnooshService::new_in_memory().unwrap();
        let session = service.sign_in("Someone@Example.com", "secret123").await.unwrap();
        assert!(session.is_demo());
        assert_eq!(service.session().unwrap().unwrap().user.id, DEMO_USER_ID);
        service.sign_out().await.unwrap();
        assert!(service.session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_normalizes_email() {
        let (service, mock) = with_remote(MockRemote::default());
        let session = service.sign_in("  Foo@Bar.COM ", "secret123").await.unwrap();
        assert_eq!(session.user.email, "foo@bar.com");
        assert_eq!(mock.calls(), vec!["sign_in foo@bar.com"]);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials_before_remote() {
        let (service, mock) = with_remote(MockRemote::default());
        assert!(service.sign_in("not-an-email", "secret123").await.is_err());
        assert!(service.sign_in("a@b.c", "123").await.is_err());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_profile_failure_is_only_logged() {
        let (service, mock) = with_remote(MockRemote {
            fail_profile: true,
            ..Default::default()
        });
        let session = service.sign_up("new@example.com", "secret123", Some("New User")).await;
        assert!(session.is_ok());
        assert_eq!(
            mock.calls(),
            vec!["sign_up new@example.com", "create_user_profile"]
        );
        assert!(service.session().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_remote_write_propagates_and_stores_nothing() {
        let (service, _) = signed_in(MockRemote::failing()).await;
        assert!(service.add_favorite("demo-baked-salmon", None).await.is_err());
        assert!(service.rate_recipe("demo-baked-salmon", 4, None).await.is_err());
        let favorites = service.favorites().await.unwrap();
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn test_remote_write_is_mirrored_locally() {
        let (service, mock) = signed_in(MockRemote::default()).await;
        let favorite = service.add_favorite("remote-1", Some("yum")).await.unwrap();
        assert_eq!(favorite.user_id, "remote-user");

        mock.fail_reads.store(true, Ordering::SeqCst);
        let favorites = service.favorites().await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].notes.as_deref(), Some("yum"));
    }

    #[tokio::test]
    async fn test_rating_read_failure_degrades_to_none() {
        let (service, _) = signed_in(MockRemote::failing()).await;
        assert_eq!(service.rating("remote-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rating_validation() {
        let service = WellnooshService::new_in_memory().unwrap();
        assert!(service.rate_recipe("r", 0, None).await.is_err());
        let saved = service.rate_recipe("r", 5, Some("Lovely")).await.unwrap();
        assert_eq!(saved.user_id, LOCAL_USER_ID);
        assert_eq!(service.rating("r").await.unwrap().unwrap().rating, 5);
    }

    #[tokio::test]
    async fn test_local_meal_plan_flow() {
        let service = WellnooshService::new_in_memory().unwrap();
        let plan = service
            .create_meal_plan(&MealPlanInput {
                name: "Week".into(),
                description: None,
                start_date: day(),
                end_date: day() + Duration::days(6),
                preferences: None,
            })
            .await
            .unwrap();
        let input = MealPlanRecipeInput {
            recipe_id: "demo-baked-salmon".into(),
            scheduled_date: day(),
            meal_type: MealType::Dinner,
            servings: 2,
            notes: None,
        };
        service.add_recipe_to_meal_plan(&plan.id, &input).await.unwrap();

        let missing = MealPlanRecipeInput {
            recipe_id: "nope".into(),
            ..input
        };
        let err = service
            .add_recipe_to_meal_plan(&plan.id, &missing)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Recipe not found"));

        let plans = service.meal_plans().await.unwrap();
        assert_eq!(plans[0].total_recipes, 1);
        assert_eq!(plans[0].total_calories, 1240.0);
    }

    #[tokio::test]
    async fn test_save_health_profile_validates() {
        let service = WellnooshService::new_in_memory().unwrap();
        let bad = HealthProfile {
            age: Some(8),
            ..Default::default()
        };
        assert!(service.save_health_profile(&bad).await.is_err());
        assert!(service.health_profile().unwrap().is_none());

        let good = HealthProfile {
            age: Some(40),
            ..Default::default()
        };
        assert!(!service.save_health_profile(&good).await.unwrap());
        assert_eq!(service.health_profile().unwrap(), Some(good));
    }

    #[tokio::test]
    async fn test_health_profile_remote_failure_keeps_local() {
        let (service, mock) = signed_in(MockRemote::failing()).await;
        let profile = HealthProfile::default();
        assert!(!service.save_health_profile(&profile).await.unwrap());
        assert!(mock.calls().contains(&"upsert_health_profile".to_string()));
        assert_eq!(service.health_profile().unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_complete_wizard_builds_week() {
        let service = WellnooshService::new_in_memory().unwrap();
        let done = service
            .complete_wizard_from(&outcome(MealsPerDay::Three), day())
            .await
            .unwrap();
        assert_eq!(done.meals.len(), 21);
        assert_eq!(done.plan.recipes.len(), 21);
        assert_eq!(done.plan.start_date, day());
        assert_eq!(done.plan.end_date, day() + Duration::days(6));

        let stored = service.meal_plans().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_recipes, 21);
        assert_eq!(
            service.last_wizard_outcome().unwrap().unwrap().daily_calories,
            done.outcome.daily_calories
        );
        assert!(service.health_profile().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_complete_wizard_honours_diet_styles() {
        let service = WellnooshService::new_in_memory().unwrap();
        let mut vegan = outcome(MealsPerDay::Two);
        vegan.profile.diet_styles = [DietStyle::Vegan].into_iter().collect();
        let done = service.complete_wizard_from(&vegan, day()).await.unwrap();
        assert!(!done.meals.is_empty());
        for meal in &done.meals {
            let recipe = catalog::recipe_by_id(&meal.recipe_id).unwrap();
            assert!(recipe.diet_categories.iter().any(|d| d == "Vegan"));
        }
    }

    #[tokio::test]
    async fn test_generate_meal_plan_from_saved_profile() {
        let service = WellnooshService::new_in_memory().unwrap();
        let week = service
            .generate_meal_plan(MealsPerDay::Four, day())
            .await
            .unwrap();
        assert_eq!(week.meals.len(), 28);
        assert_eq!(week.plan.total_recipes, 28);
        let prefs = week.plan.preferences.unwrap();
        assert_eq!(prefs["mealsPerDay"], "Four");
        assert!(prefs["dailyCalories"].as_i64().unwrap() > 1200);
    }

    #[tokio::test]
    async fn test_tracker_offline_is_local_only() {
        let service = WellnooshService::new_in_memory().unwrap();
        let record = service.record_breathing_completion(day()).await.unwrap();
        assert_eq!(record.completed, 1);
        assert!(!record.synced);
        let record = service.toggle_breathing(day(), 0).await.unwrap();
        assert_eq!(record.completed, 0);
        assert!(service.toggle_breathing(day(), 6).await.is_err());
        assert_eq!(service.daily_record(Tracker::Breathing, day()).unwrap().completed, 0);
    }

    #[tokio::test]
    async fn test_tracker_sync_failure_keeps_local_change() {
        let (service, mock) = signed_in(MockRemote::failing()).await;
        let record = service.add_water(day()).await.unwrap();
        assert_eq!(record.completed, 1);
        assert!(!record.synced);
        assert!(mock.calls().contains(&"upsert_water 2026-04-06 1".to_string()));

        mock.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(service.sync_pending().await.unwrap(), 1);
        assert!(service.daily_record(Tracker::Water, day()).unwrap().synced);
        assert_eq!(service.sync_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tracker_sync_success() {
        let (service, _) = signed_in(MockRemote::default()).await;
        let record = service.toggle_water(day(), 7).await.unwrap();
        assert!(record.synced);
        assert!(record.progress.slots[7]);
    }

    #[tokio::test]
    async fn test_concurrent_water_adds_both_kept() {
        let (service, mock) = signed_in(MockRemote::default()).await;
        mock.slow_water.store(true, Ordering::SeqCst);
        let (first, second) = tokio::join!(service.add_water(day()), service.add_water(day()));
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.completed, 1);
        assert_eq!(second.completed, 2);
        assert!(!first.synced);
        assert!(second.synced);

        let stored = service.daily_record(Tracker::Water, day()).unwrap();
        assert_eq!(stored.completed, 2);
        assert!(stored.synced);
    }

    #[tokio::test]
    async fn test_water_caps_at_goal() {
        let service = WellnooshService::new_in_memory().unwrap();
        for _ in 0..10 {
            service.add_water(day()).await.unwrap();
        }
        let record = service.daily_record(Tracker::Water, day()).unwrap();
        assert_eq!(record.completed, 8);
        assert!(record.progress.is_goal_met());
    }
}
