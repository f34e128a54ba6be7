use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::breathing::{DailyProgress, DailyRecord, Tracker};
use crate::models::{
    MealPlan, MealPlanInput, MealPlanRecipe, MealPlanRecipeInput, UserFavoriteRecipe,
    UserRecipeRating,
};
use crate::profile::HealthProfile;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_health_profiles (
                    user_id TEXT PRIMARY KEY,
                    age INTEGER,
                    sex TEXT,
                    height_cm REAL,
                    weight_kg REAL NOT NULL,
                    weight_unit TEXT NOT NULL,
                    height_unit TEXT NOT NULL,
                    activity_level TEXT NOT NULL,
                    health_goals TEXT NOT NULL,
                    diet_styles TEXT NOT NULL,
                    weight_goal_kg REAL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    total_recipes INTEGER NOT NULL DEFAULT 0,
                    total_calories REAL NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    preferences TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plan_recipes (
                    id TEXT PRIMARY KEY,
                    meal_plan_id TEXT NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
                    recipe_id TEXT NOT NULL,
                    scheduled_date TEXT NOT NULL,
                    meal_type TEXT NOT NULL,
                    servings INTEGER NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS user_favorite_recipes (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    recipe_id TEXT NOT NULL,
                    notes TEXT,
                    added_at TEXT NOT NULL,
                    UNIQUE (user_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS user_recipe_ratings (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    recipe_id TEXT NOT NULL,
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    review TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT,
                    UNIQUE (user_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS breathing_exercises (
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    completed TEXT NOT NULL,
                    daily_goal INTEGER NOT NULL,
                    synced INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, date)
                );

                CREATE TABLE IF NOT EXISTS water_intake (
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    completed TEXT NOT NULL,
                    daily_goal INTEGER NOT NULL,
                    synced INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, date)
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_meal_plans_user ON meal_plans(user_id);
                CREATE INDEX IF NOT EXISTS idx_meal_plan_recipes_plan ON meal_plan_recipes(meal_plan_id);
                CREATE INDEX IF NOT EXISTS idx_favorites_user ON user_favorite_recipes(user_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns:
    // 0: age, 1: sex, 2: height_cm, 3: weight_kg, 4: weight_unit, 5: height_unit,
    // 6: activity_level, 7: health_goals, 8: diet_styles, 9: weight_goal_kg
    fn health_profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<HealthProfile> {
        let sex: Option<String> = row.get(1)?;
        Ok(HealthProfile {
            age: row.get(0)?,
            sex: sex.map(|s| enum_from_sql(1, s)).transpose()?,
            height_cm: row.get(2)?,
            weight_kg: row.get(3)?,
            weight_unit: enum_from_sql(4, row.get(4)?)?,
            height_unit: enum_from_sql(5, row.get(5)?)?,
            activity_level: enum_from_sql(6, row.get(6)?)?,
            health_goals: json_from_sql(7, &row.get::<_, String>(7)?)?,
            diet_styles: json_from_sql(8, &row.get::<_, String>(8)?)?,
            weight_goal_kg: row.get(9)?,
        })
    }

    // Expects columns:
    // 0: id, 1: user_id, 2: name, 3: description, 4: start_date, 5: end_date,
    // 6: total_recipes, 7: total_calories, 8: is_active, 9: preferences,
    // 10: created_at, 11: updated_at
    fn meal_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlan> {
        let start_date = date_from_sql(4, &row.get::<_, String>(4)?)?;
        let end_date = date_from_sql(5, &row.get::<_, String>(5)?)?;
        let total_calories: f64 = row.get(7)?;
        let preferences: Option<String> = row.get(9)?;
        Ok(MealPlan {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            start_date,
            end_date,
            total_recipes: row.get(6)?,
            total_calories,
            average_daily_calories: average_daily(total_calories, start_date, end_date),
            is_active: row.get(8)?,
            preferences: preferences
                .map(|p| json_from_sql(9, &p))
                .transpose()?,
            recipes: Vec::new(),
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn meal_plan_recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlanRecipe> {
        Ok(MealPlanRecipe {
            id: row.get(0)?,
            meal_plan_id: row.get(1)?,
            recipe_id: row.get(2)?,
            scheduled_date: date_from_sql(3, &row.get::<_, String>(3)?)?,
            meal_type: enum_from_sql(4, row.get(4)?)?,
            servings: row.get(5)?,
            is_completed: row.get(6)?,
            completed_at: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn favorite_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserFavoriteRecipe> {
        Ok(UserFavoriteRecipe {
            id: row.get(0)?,
            user_id: row.get(1)?,
            recipe_id: row.get(2)?,
            notes: row.get(3)?,
            added_at: row.get(4)?,
        })
    }

    fn rating_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserRecipeRating> {
        Ok(UserRecipeRating {
            id: row.get(0)?,
            user_id: row.get(1)?,
            recipe_id: row.get(2)?,
            rating: row.get(3)?,
            review: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Health profile ---

    pub fn save_health_profile(&self, user_id: &str, profile: &HealthProfile) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let sex = profile.sex.map(|s| enum_to_sql(&s)).transpose()?;
        self.conn.execute(
            "INSERT INTO user_health_profiles (user_id, age, sex, height_cm, weight_kg, weight_unit,
                height_unit, activity_level, health_goals, diet_styles, weight_goal_kg, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(user_id) DO UPDATE SET
                age = excluded.age,
                sex = excluded.sex,
                height_cm = excluded.height_cm,
                weight_kg = excluded.weight_kg,
                weight_unit = excluded.weight_unit,
                height_unit = excluded.height_unit,
                activity_level = excluded.activity_level,
                health_goals = excluded.health_goals,
                diet_styles = excluded.diet_styles,
                weight_goal_kg = excluded.weight_goal_kg,
                updated_at = excluded.updated_at",
            params![
                user_id,
                profile.age,
                sex,
                profile.height_cm,
                profile.weight_kg,
                enum_to_sql(&profile.weight_unit)?,
                enum_to_sql(&profile.height_unit)?,
                enum_to_sql(&profile.activity_level)?,
                serde_json::to_string(&profile.health_goals)?,
                serde_json::to_string(&profile.diet_styles)?,
                profile.weight_goal_kg,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_health_profile(&self, user_id: &str) -> Result<Option<HealthProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT age, sex, height_cm, weight_kg, weight_unit, height_unit, activity_level,
                        health_goals, diet_styles, weight_goal_kg
                 FROM user_health_profiles WHERE user_id = ?1",
                params![user_id],
                Self::health_profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    // --- Meal plans ---

    pub fn create_meal_plan(&self, user_id: &str, input: &MealPlanInput) -> Result<MealPlan> {
        let now = Local::now().to_rfc3339();
        let plan = MealPlan {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            total_recipes: 0,
            total_calories: 0.0,
            average_daily_calories: 0.0,
            is_active: true,
            preferences: input.preferences.clone(),
            recipes: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.upsert_meal_plan(&plan)?;
        Ok(plan)
    }

    /// Insert or replace a plan header by id. Recipes are stored separately.
    pub fn upsert_meal_plan(&self, plan: &MealPlan) -> Result<()> {
        let preferences = plan
            .preferences
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO meal_plans (id, user_id, name, description, start_date, end_date,
                total_recipes, total_calories, is_active, preferences, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                total_recipes = excluded.total_recipes,
                total_calories = excluded.total_calories,
                is_active = excluded.is_active,
                preferences = excluded.preferences,
                updated_at = excluded.updated_at",
            params![
                plan.id,
                plan.user_id,
                plan.name,
                plan.description,
                date_to_sql(plan.start_date),
                date_to_sql(plan.end_date),
                plan.total_recipes,
                plan.total_calories,
                plan.is_active,
                preferences,
                plan.created_at,
                plan.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_meal_plan(&self, id: &str) -> Result<Option<MealPlan>> {
        let plan = self
            .conn
            .query_row(
                "SELECT id, user_id, name, description, start_date, end_date, total_recipes,
                        total_calories, is_active, preferences, created_at, updated_at
                 FROM meal_plans WHERE id = ?1",
                params![id],
                Self::meal_plan_from_row,
            )
            .optional()?;
        match plan {
            Some(mut plan) => {
                plan.recipes = self.get_meal_plan_recipes(&plan.id)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// A user's plans, newest first, each with its scheduled recipes.
    pub fn list_meal_plans(&self, user_id: &str) -> Result<Vec<MealPlan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, description, start_date, end_date, total_recipes,
                    total_calories, is_active, preferences, created_at, updated_at
             FROM meal_plans WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;
        let mut plans = stmt
            .query_map(params![user_id], Self::meal_plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for plan in &mut plans {
            plan.recipes = self.get_meal_plan_recipes(&plan.id)?;
        }
        Ok(plans)
    }

    pub fn get_meal_plan_recipes(&self, meal_plan_id: &str) -> Result<Vec<MealPlanRecipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meal_plan_id, recipe_id, scheduled_date, meal_type, servings,
                    is_completed, completed_at, notes
             FROM meal_plan_recipes WHERE meal_plan_id = ?1
             ORDER BY scheduled_date, rowid",
        )?;
        let recipes = stmt
            .query_map(params![meal_plan_id], Self::meal_plan_recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Schedule a recipe in a plan and roll its calories into the plan totals.
    pub fn add_meal_plan_recipe(
        &self,
        meal_plan_id: &str,
        input: &MealPlanRecipeInput,
        calories_per_serving: f64,
    ) -> Result<MealPlanRecipe> {
        let entry = MealPlanRecipe {
            id: Uuid::new_v4().to_string(),
            meal_plan_id: meal_plan_id.to_string(),
            recipe_id: input.recipe_id.clone(),
            scheduled_date: input.scheduled_date,
            meal_type: input.meal_type,
            servings: input.servings,
            is_completed: false,
            completed_at: None,
            notes: input.notes.clone(),
        };
        #[allow(clippy::cast_precision_loss)]
        let calories = calories_per_serving * input.servings as f64;
        self.save_meal_plan_recipe(&entry, calories)?;
        Ok(entry)
    }

    /// Store an already-identified plan entry, e.g. one echoed back by the backend.
    pub fn save_meal_plan_recipe(&self, entry: &MealPlanRecipe, calories: f64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE meal_plans
             SET total_recipes = total_recipes + 1,
                 total_calories = total_calories + ?1,
                 updated_at = ?2
             WHERE id = ?3",
            params![calories, Local::now().to_rfc3339(), entry.meal_plan_id],
        )?;
        if updated == 0 {
            bail!("Meal plan not found: {}", entry.meal_plan_id);
        }
        tx.execute(
            "INSERT OR REPLACE INTO meal_plan_recipes (id, meal_plan_id, recipe_id, scheduled_date,
                meal_type, servings, is_completed, completed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id,
                entry.meal_plan_id,
                entry.recipe_id,
                date_to_sql(entry.scheduled_date),
                enum_to_sql(&entry.meal_type)?,
                entry.servings,
                entry.is_completed,
                entry.completed_at,
                entry.notes,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // --- Favorites ---

    /// Mark a recipe as a favorite. Adding an existing favorite returns it unchanged.
    pub fn add_favorite(
        &self,
        user_id: &str,
        recipe_id: &str,
        notes: Option<&str>,
    ) -> Result<UserFavoriteRecipe> {
        let favorite = UserFavoriteRecipe {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            notes: notes.map(str::to_string),
            added_at: Local::now().to_rfc3339(),
        };
        self.upsert_favorite(&favorite)?;
        self.get_favorite(user_id, recipe_id)?
            .context("Favorite not found after insert")
    }

    pub fn upsert_favorite(&self, favorite: &UserFavoriteRecipe) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_favorite_recipes (id, user_id, recipe_id, notes, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, recipe_id) DO NOTHING",
            params![
                favorite.id,
                favorite.user_id,
                favorite.recipe_id,
                favorite.notes,
                favorite.added_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_favorite(&self, user_id: &str, recipe_id: &str) -> Result<Option<UserFavoriteRecipe>> {
        let favorite = self
            .conn
            .query_row(
                "SELECT id, user_id, recipe_id, notes, added_at
                 FROM user_favorite_recipes WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                Self::favorite_from_row,
            )
            .optional()?;
        Ok(favorite)
    }

    pub fn remove_favorite(&self, user_id: &str, recipe_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM user_favorite_recipes WHERE user_id = ?1 AND recipe_id = ?2",
            params![user_id, recipe_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<UserFavoriteRecipe>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, recipe_id, notes, added_at
             FROM user_favorite_recipes WHERE user_id = ?1
             ORDER BY added_at DESC",
        )?;
        let favorites = stmt
            .query_map(params![user_id], Self::favorite_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    // --- Ratings ---

    pub fn upsert_rating(
        &self,
        user_id: &str,
        recipe_id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> Result<UserRecipeRating> {
        let now = Local::now().to_rfc3339();
        self.save_rating(&UserRecipeRating {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            rating,
            review: review.map(str::to_string),
            created_at: now.clone(),
            updated_at: Some(now),
        })?;
        self.get_rating(user_id, recipe_id)?
            .context("Rating not found after upsert")
    }

    /// One rating per user and recipe; a second save replaces score and review.
    pub fn save_rating(&self, rating: &UserRecipeRating) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_recipe_ratings (id, user_id, recipe_id, rating, review, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, recipe_id) DO UPDATE SET
                rating = excluded.rating,
                review = excluded.review,
                updated_at = excluded.updated_at",
            params![
                rating.id,
                rating.user_id,
                rating.recipe_id,
                rating.rating,
                rating.review,
                rating.created_at,
                rating.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_rating(&self, user_id: &str, recipe_id: &str) -> Result<Option<UserRecipeRating>> {
        let rating = self
            .conn
            .query_row(
                "SELECT id, user_id, recipe_id, rating, review, created_at, updated_at
                 FROM user_recipe_ratings WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                Self::rating_from_row,
            )
            .optional()?;
        Ok(rating)
    }

    // --- Daily trackers ---

    fn tracker_table(tracker: Tracker) -> &'static str {
        match tracker {
            Tracker::Breathing => "breathing_exercises",
            Tracker::Water => "water_intake",
        }
    }

    pub fn get_daily_record(
        &self,
        tracker: Tracker,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>> {
        let table = Self::tracker_table(tracker);
        let row: Option<(String, i64, bool)> = self
            .conn
            .query_row(
                &format!(
                    "SELECT completed, daily_goal, synced FROM {table}
                     WHERE user_id = ?1 AND date = ?2"
                ),
                params![user_id, date_to_sql(date)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((completed, goal, synced)) = row else {
            return Ok(None);
        };
        let slots: Vec<bool> = serde_json::from_str(&completed)
            .with_context(|| format!("Corrupt {} slots for {date}", tracker.as_str()))?;
        let goal = usize::try_from(goal).unwrap_or_else(|_| tracker.daily_goal());
        Ok(Some(DailyRecord::new(
            tracker,
            date,
            DailyProgress::from_slots(slots, goal),
            synced,
        )))
    }

    pub fn save_daily_record(&self, user_id: &str, record: &DailyRecord) -> Result<()> {
        let table = Self::tracker_table(record.tracker);
        let goal = i64::try_from(record.progress.daily_goal)?;
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (user_id, date, completed, daily_goal, synced, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                    completed = excluded.completed,
                    daily_goal = excluded.daily_goal,
                    synced = excluded.synced,
                    updated_at = excluded.updated_at"
            ),
            params![
                user_id,
                date_to_sql(record.date),
                serde_json::to_string(&record.progress.slots)?,
                goal,
                record.synced,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Mark a day synced, but only if its slots still match what was pushed.
    /// Returns false when a newer local change has replaced them.
    pub fn mark_daily_synced(
        &self,
        tracker: Tracker,
        user_id: &str,
        date: NaiveDate,
        slots: &[bool],
    ) -> Result<bool> {
        let table = Self::tracker_table(tracker);
        let rows = self.conn.execute(
            &format!(
                "UPDATE {table} SET synced = 1
                 WHERE user_id = ?1 AND date = ?2 AND completed = ?3"
            ),
            params![user_id, date_to_sql(date), serde_json::to_string(slots)?],
        )?;
        Ok(rows > 0)
    }

    /// Days whose last change never reached the backend.
    pub fn unsynced_records(&self, tracker: Tracker, user_id: &str) -> Result<Vec<DailyRecord>> {
        let table = Self::tracker_table(tracker);
        let dates: Vec<String> = {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT date FROM {table} WHERE user_id = ?1 AND synced = 0 ORDER BY date"
            ))?;
            stmt.query_map(params![user_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut records = Vec::with_capacity(dates.len());
        for date in dates {
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("Invalid stored date: {date}"))?;
            if let Some(record) = self.get_daily_record(tracker, user_id, date)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // --- User Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn set_json_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_setting(key, &serde_json::to_string(value)?)
    }

    pub fn get_json_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_setting(key)?
            .map(|raw| {
                serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in setting {key}"))
            })
            .transpose()
    }
}

#[allow(clippy::cast_precision_loss)]
fn average_daily(total_calories: f64, start: NaiveDate, end: NaiveDate) -> f64 {
    let days = (end - start).num_days() + 1;
    if days <= 0 {
        return 0.0;
    }
    (total_calories / days as f64).round()
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_from_sql(idx: usize, text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Unit-variant enums are stored as their serde string form.
fn enum_to_sql<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => bail!("Expected a string-valued enum, got {other}"),
    }
}

fn enum_from_sql<T: DeserializeOwned>(idx: usize, text: String) -> rusqlite::Result<T> {
    serde_json::from_value(serde_json::Value::String(text))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_from_sql<T: DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use crate::profile::{ActivityLevel, DietStyle, HealthGoal, Sex, WeightUnit};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn sample_profile() -> HealthProfile {
        HealthProfile {
            age: Some(34),
            sex: Some(Sex::NonBinary),
            height_cm: Some(172.0),
            weight_kg: 68.5,
            weight_unit: WeightUnit::Lbs,
            activity_level: ActivityLevel::ModeratelyActive,
            health_goals: [HealthGoal::LoseWeight, HealthGoal::ImproveEnergy]
                .into_iter()
                .collect(),
            diet_styles: [DietStyle::Vegetarian].into_iter().collect(),
            weight_goal_kg: Some(64.0),
            ..Default::default()
        }
    }

    fn plan_input() -> MealPlanInput {
        MealPlanInput {
            name: " Spring week ".to_string(),
            description: Some("Light meals".to_string()),
            start_date: d(2),
            end_date: d(8),
            preferences: Some(serde_json::json!({ "mealsPerDay": "Three" })),
        }
    }

    #[test]
    fn test_health_profile_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_health_profile("u1").unwrap().is_none());
        db.save_health_profile("u1", &sample_profile()).unwrap();
        assert_eq!(db.get_health_profile("u1").unwrap(), Some(sample_profile()));
    }

    #[test]
    fn test_health_profile_upsert_replaces() {
        let db = Database::open_in_memory().unwrap();
        db.save_health_profile("u1", &sample_profile()).unwrap();
        let mut updated = sample_profile();
        updated.weight_kg = 66.0;
        updated.sex = None;
        db.save_health_profile("u1", &updated).unwrap();
        let stored = db.get_health_profile("u1").unwrap().unwrap();
        assert_eq!(stored.weight_kg, 66.0);
        assert_eq!(stored.sex, None);
    }

    #[test]
    fn test_create_and_list_meal_plans() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan("u1", &plan_input()).unwrap();
        assert_eq!(plan.name, "Spring week");
        assert!(plan.is_active);

        db.create_meal_plan("u2", &plan_input()).unwrap();
        let plans = db.list_meal_plans("u1").unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, plan.id);
        assert_eq!(
            plans[0].preferences,
            Some(serde_json::json!({ "mealsPerDay": "Three" }))
        );
    }

    #[test]
    fn test_add_meal_plan_recipe_updates_totals() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.create_meal_plan("u1", &plan_input()).unwrap();
        let input = MealPlanRecipeInput {
            recipe_id: "demo-baked-salmon".to_string(),
            scheduled_date: d(3),
            meal_type: MealType::Dinner,
            servings: 2,
            notes: None,
        };
        db.add_meal_plan_recipe(&plan.id, &input, 350.0).unwrap();
        let input = MealPlanRecipeInput {
            recipe_id: "demo-overnight-oats".to_string(),
            scheduled_date: d(2),
            meal_type: MealType::Breakfast,
            servings: 1,
            notes: Some("extra berries".to_string()),
        };
        db.add_meal_plan_recipe(&plan.id, &input, 700.0).unwrap();

        let stored = db.get_meal_plan(&plan.id).unwrap().unwrap();
        assert_eq!(stored.total_recipes, 2);
        assert_eq!(stored.total_calories, 1400.0);
        assert_eq!(stored.average_daily_calories, 200.0);
        assert_eq!(stored.recipes.len(), 2);
        assert_eq!(stored.recipes[0].meal_type, MealType::Breakfast);
        assert_eq!(stored.recipes[0].notes.as_deref(), Some("extra berries"));
    }

    #[test]
    fn test_add_recipe_to_missing_plan_fails() {
        let db = Database::open_in_memory().unwrap();
        let input = MealPlanRecipeInput {
            recipe_id: "r".to_string(),
            scheduled_date: d(1),
            meal_type: MealType::Lunch,
            servings: 1,
            notes: None,
        };
        let err = db.add_meal_plan_recipe("nope", &input, 100.0).unwrap_err();
        assert!(err.to_string().contains("Meal plan not found"));
    }

    #[test]
    fn test_favorites_are_unique_per_recipe() {
        let db = Database::open_in_memory().unwrap();
        let first = db.add_favorite("u1", "r1", Some("weeknight")).unwrap();
        let again = db.add_favorite("u1", "r1", None).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.notes.as_deref(), Some("weeknight"));
        db.add_favorite("u1", "r2", None).unwrap();
        assert_eq!(db.list_favorites("u1").unwrap().len(), 2);

        assert!(db.remove_favorite("u1", "r1").unwrap());
        assert!(!db.remove_favorite("u1", "r1").unwrap());
        assert_eq!(db.list_favorites("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_rating_upsert_keeps_one_row() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_rating("u1", "r1").unwrap().is_none());
        let first = db.upsert_rating("u1", "r1", 3, None).unwrap();
        let second = db.upsert_rating("u1", "r1", 5, Some("Great")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.rating, 5);
        assert_eq!(second.review.as_deref(), Some("Great"));
    }

    #[test]
    fn test_rating_out_of_range_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.upsert_rating("u1", "r1", 6, None).is_err());
    }

    #[test]
    fn test_daily_records_per_tracker() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .get_daily_record(Tracker::Water, "u1", d(5))
            .unwrap()
            .is_none());

        let mut progress = Tracker::Water.empty();
        progress.add_next();
        progress.add_next();
        let record = DailyRecord::new(Tracker::Water, d(5), progress, false);
        db.save_daily_record("u1", &record).unwrap();

        let stored = db
            .get_daily_record(Tracker::Water, "u1", d(5))
            .unwrap()
            .unwrap();
        assert_eq!(stored.completed, 2);
        assert_eq!(stored.progress.daily_goal, 8);
        assert!(!stored.synced);
        assert!(db
            .get_daily_record(Tracker::Breathing, "u1", d(5))
            .unwrap()
            .is_none());

        let unsynced = db.unsynced_records(Tracker::Water, "u1").unwrap();
        assert_eq!(unsynced.len(), 1);
        db.save_daily_record("u1", &DailyRecord { synced: true, ..stored })
            .unwrap();
        assert!(db.unsynced_records(Tracker::Water, "u1").unwrap().is_empty());
    }

    #[test]
    fn test_mark_synced_skips_stale_slots() {
        let db = Database::open_in_memory().unwrap();
        let mut progress = Tracker::Water.empty();
        progress.add_next();
        let pushed = progress.slots.clone();
        db.save_daily_record("u1", &DailyRecord::new(Tracker::Water, d(5), progress.clone(), false))
            .unwrap();

        progress.add_next();
        db.save_daily_record("u1", &DailyRecord::new(Tracker::Water, d(5), progress.clone(), false))
            .unwrap();
        assert!(!db.mark_daily_synced(Tracker::Water, "u1", d(5), &pushed).unwrap());
        let stored = db.get_daily_record(Tracker::Water, "u1", d(5)).unwrap().unwrap();
        assert!(!stored.synced);
        assert_eq!(stored.completed, 2);

        assert!(db.mark_daily_synced(Tracker::Water, "u1", d(5), &progress.slots).unwrap());
        assert!(db.unsynced_records(Tracker::Water, "u1").unwrap().is_empty());
    }

    #[test]
    fn test_settings_crud() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("k").unwrap(), None);
        db.set_setting("k", "v1").unwrap();
        db.set_setting("k", "v2").unwrap();
        assert_eq!(db.get_setting("k").unwrap().as_deref(), Some("v2"));
        assert!(db.delete_setting("k").unwrap());
        assert!(!db.delete_setting("k").unwrap());
    }

    #[test]
    fn test_json_settings() {
        let db = Database::open_in_memory().unwrap();
        db.set_json_setting("profile", &sample_profile()).unwrap();
        let back: Option<HealthProfile> = db.get_json_setting("profile").unwrap();
        assert_eq!(back, Some(sample_profile()));
        db.set_setting("broken", "{").unwrap();
        assert!(db.get_json_setting::<HealthProfile>("broken").is_err());
    }

    #[test]
    fn test_open_file_database_migrates_once() {
        let dir = std::env::temp_dir().join(format!("wellnoosh-db-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.db");
        {
            let db = Database::open(&path).unwrap();
            db.set_setting("k", "v").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_setting("k").unwrap().as_deref(), Some("v"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
