//! Seven-day meal plan generation from a recipe catalog.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MealType, Recipe, RecipeFilters};
use crate::profile::ProfileError;

pub const PLAN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MealsPerDay {
    Two,
    #[default]
    Three,
    Four,
    Five,
}

pub const MEALS_PER_DAY: &[MealsPerDay] = &[
    MealsPerDay::Two,
    MealsPerDay::Three,
    MealsPerDay::Four,
    MealsPerDay::Five,
];

/// One eating occasion in a day, with a suggested clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub meal_type: MealType,
    pub time: &'static str,
}

const BREAKFAST: MealSlot = MealSlot {
    meal_type: MealType::Breakfast,
    time: "08:00",
};
const MORNING_SNACK: MealSlot = MealSlot {
    meal_type: MealType::Snack,
    time: "10:30",
};
const LUNCH: MealSlot = MealSlot {
    meal_type: MealType::Lunch,
    time: "13:00",
};
const AFTERNOON_SNACK: MealSlot = MealSlot {
    meal_type: MealType::Snack,
    time: "16:00",
};
const DINNER: MealSlot = MealSlot {
    meal_type: MealType::Dinner,
    time: "19:30",
};

impl MealsPerDay {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Two => "Two",
            Self::Three => "Three",
            Self::Four => "Four",
            Self::Five => "Five",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Two => "Breakfast, dinner, optional snacks",
            Self::Three => "Breakfast, lunch, and dinner",
            Self::Four => "Breakfast, snack, lunch, and dinner",
            Self::Five => "Breakfast, lunch, dinner, and two snacks",
        }
    }

    #[must_use]
    pub fn slots(self) -> &'static [MealSlot] {
        match self {
            Self::Two => &[BREAKFAST, DINNER],
            Self::Three => &[BREAKFAST, LUNCH, DINNER],
            Self::Four => &[BREAKFAST, MORNING_SNACK, LUNCH, DINNER],
            Self::Five => &[BREAKFAST, MORNING_SNACK, LUNCH, AFTERNOON_SNACK, DINNER],
        }
    }
}

impl fmt::Display for MealsPerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MealsPerDay {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "two" | "2" => Ok(Self::Two),
            "three" | "3" => Ok(Self::Three),
            "four" | "4" => Ok(Self::Four),
            "five" | "5" | "5-6" => Ok(Self::Five),
            _ => Err(ProfileError::Unknown {
                kind: "meals per day",
                value: s.to_string(),
            }),
        }
    }
}

fn slot_weight(meal_type: MealType) -> f64 {
    match meal_type {
        MealType::Breakfast => 3.0,
        MealType::Lunch | MealType::Dinner => 4.0,
        MealType::Snack | MealType::Dessert => 1.0,
    }
}

/// Calorie share of each slot. Shares always sum to 1.
#[must_use]
pub fn slot_shares(meals: MealsPerDay) -> Vec<f64> {
    let slots = meals.slots();
    let total: f64 = slots.iter().map(|s| slot_weight(s.meal_type)).sum();
    slots
        .iter()
        .map(|s| slot_weight(s.meal_type) / total)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub time: &'static str,
    pub recipe_id: String,
    pub recipe_name: String,
    pub calories: f64,
    pub target_calories: f64,
}

/// Build a week of meals starting at `start`.
///
/// For every slot the recipe of that meal type whose calories per serving are
/// closest to the slot's share of `daily_calories` wins, skipping recipes
/// already used that day or in the same slot the day before when another
/// candidate exists. Slots with no matching recipe are left out.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn generate_week(
    catalog: &[Recipe],
    start: NaiveDate,
    meals: MealsPerDay,
    daily_calories: i64,
    filters: &RecipeFilters,
) -> Vec<PlannedMeal> {
    let filters = RecipeFilters {
        meal_type: None,
        ..filters.clone()
    };
    let slots = meals.slots();
    let shares = slot_shares(meals);
    let mut previous_day: Vec<Option<&str>> = vec![None; slots.len()];
    let mut plan = Vec::new();

    for offset in 0..PLAN_DAYS {
        let date = start + chrono::Duration::days(offset);
        let mut used_today: HashSet<&str> = HashSet::new();

        for (idx, slot) in slots.iter().enumerate() {
            let target = daily_calories as f64 * shares[idx];
            let mut ranked: Vec<&Recipe> = catalog
                .iter()
                .filter(|r| r.meal_type == slot.meal_type && filters.matches(r))
                .collect();
            if ranked.is_empty() {
                debug!(meal_type = %slot.meal_type, %date, "no recipe for slot");
                continue;
            }
            ranked.sort_by(|a, b| {
                let da = (a.nutrition.calories_per_serving - target).abs();
                let db = (b.nutrition.calories_per_serving - target).abs();
                da.total_cmp(&db).then_with(|| a.id.cmp(&b.id))
            });

            let pick: &Recipe = ranked
                .iter()
                .copied()
                .find(|r| {
                    !used_today.contains(r.id.as_str()) && previous_day[idx] != Some(r.id.as_str())
                })
                .or_else(|| {
                    ranked
                        .iter()
                        .copied()
                        .find(|r| !used_today.contains(r.id.as_str()))
                })
                .unwrap_or(ranked[0]);

            used_today.insert(pick.id.as_str());
            previous_day[idx] = Some(pick.id.as_str());
            plan.push(PlannedMeal {
                date,
                meal_type: slot.meal_type,
                time: slot.time,
                recipe_id: pick.id.clone(),
                recipe_name: pick.name.clone(),
                calories: pick.nutrition.calories_per_serving,
                target_calories: target.round(),
            });
        }
    }

    plan
}
