//! BMI, BMR and daily calorie targets.
//!
//! Everything here is a pure function of a [`HealthProfile`]: recomputing from
//! the same profile always yields the same numbers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::profile::{HealthGoal, HealthProfile, MIN_WEIGHT_KG, Sex};

pub const DEFAULT_AGE: u32 = 30;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_SEX: Sex = Sex::Female;

/// Daily kcal added or removed for a gain or loss goal.
pub const GOAL_ADJUSTMENT_KCAL: i64 = 500;
pub const MAINTENANCE_TOLERANCE_KG: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    #[serde(rename = "Normal weight")]
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// Body mass index rounded to one decimal.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    let raw = weight_kg / (height_m * height_m);
    (raw * 10.0).round() / 10.0
}

#[must_use]
pub fn bmi_feedback(category: BmiCategory, goals: &BTreeSet<HealthGoal>) -> &'static str {
    let losing = goals.contains(&HealthGoal::LoseWeight);
    let gaining = goals.contains(&HealthGoal::GainWeight);
    match category {
        BmiCategory::Underweight if gaining => {
            "Great! Your goal aligns with gaining healthy weight. Focus on nutrient-dense, calorie-rich foods."
        }
        BmiCategory::Underweight => {
            "Consider focusing on healthy weight gain with balanced nutrition and strength training."
        }
        BmiCategory::Normal => {
            "Excellent! You're in the healthy weight range. Maintain with balanced nutrition and regular activity."
        }
        BmiCategory::Overweight if losing => {
            "Good choice! Gradual weight loss through balanced nutrition and exercise will help you reach a healthier range."
        }
        BmiCategory::Overweight => {
            "Consider focusing on portion control and increasing physical activity for optimal health."
        }
        BmiCategory::Obese if losing => {
            "Excellent goal! A structured approach with proper nutrition and exercise can significantly improve your health."
        }
        BmiCategory::Obese => {
            "Consider consulting with a healthcare provider for a personalized weight management plan."
        }
    }
}

/// Basal metabolic rate, revised Harris-Benedict. Non-binary uses the female equation.
#[must_use]
pub fn bmr(sex: Sex, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    let age = f64::from(age);
    match sex {
        Sex::Male => 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age,
        Sex::Female | Sex::NonBinary => {
            447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age
        }
    }
}

/// A profile field that was missing and replaced by a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssumedField {
    Age,
    HeightCm,
    Sex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieTarget {
    pub calories: i64,
    pub bmr: f64,
    pub multiplier: f64,
    pub adjustment: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumed: Vec<AssumedField>,
}

struct Resolved {
    age: u32,
    height_cm: f64,
    sex: Sex,
    assumed: Vec<AssumedField>,
}

fn resolve(profile: &HealthProfile) -> Resolved {
    let mut assumed = Vec::new();
    let age = profile.age.unwrap_or_else(|| {
        assumed.push(AssumedField::Age);
        DEFAULT_AGE
    });
    let height_cm = profile.height_cm.unwrap_or_else(|| {
        assumed.push(AssumedField::HeightCm);
        DEFAULT_HEIGHT_CM
    });
    let sex = profile.sex.unwrap_or_else(|| {
        assumed.push(AssumedField::Sex);
        DEFAULT_SEX
    });
    if !assumed.is_empty() {
        warn!(
            ?assumed,
            "profile incomplete, substituting defaults (age {DEFAULT_AGE}, height {DEFAULT_HEIGHT_CM} cm, female)"
        );
    }
    Resolved {
        age,
        height_cm,
        sex,
        assumed,
    }
}

fn goal_adjustment(goals: &BTreeSet<HealthGoal>) -> i64 {
    if goals.contains(&HealthGoal::LoseWeight) {
        -GOAL_ADJUSTMENT_KCAL
    } else if goals.contains(&HealthGoal::GainWeight) {
        GOAL_ADJUSTMENT_KCAL
    } else {
        0
    }
}

/// Daily calorie target: BMR × activity multiplier, ±500 for a loss or gain goal.
/// A loss goal wins when both loss and gain are selected.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn daily_calories(profile: &HealthProfile) -> CalorieTarget {
    let r = resolve(profile);
    let base = bmr(r.sex, profile.weight_kg, r.height_cm, r.age);
    let multiplier = profile.activity_level.multiplier();
    let adjustment = goal_adjustment(&profile.health_goals);
    let total = base * multiplier + adjustment as f64;
    CalorieTarget {
        calories: total.round() as i64,
        bmr: base,
        multiplier,
        adjustment,
        assumed: r.assumed,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub bmi_feedback: String,
    pub target: CalorieTarget,
}

#[must_use]
pub fn assess(profile: &HealthProfile) -> Assessment {
    let target = daily_calories(profile);
    let height_cm = profile.height_cm.unwrap_or(DEFAULT_HEIGHT_CM);
    let value = bmi(profile.weight_kg, height_cm);
    let category = BmiCategory::from_bmi(value);
    Assessment {
        bmi: value,
        bmi_category: category,
        bmi_feedback: bmi_feedback(category, &profile.health_goals).to_string(),
        target,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeightGoalError {
    #[error("Your weight goal should be at least 30kg.")]
    BelowMinimum,
    #[error("Your weight goal should be lower than your current weight for weight loss.")]
    NotBelowCurrent,
    #[error("Your weight goal should be higher than your current weight for weight gain.")]
    NotAboveCurrent,
    #[error("For weight maintenance, your goal should be within 5kg of your current weight.")]
    OutsideMaintenanceRange,
}

/// Check a target weight against the selected goals. Rules are checked in
/// the order loss, gain, maintenance and the first violation is returned.
pub fn validate_weight_goal(
    current_kg: f64,
    goal_kg: f64,
    goals: &BTreeSet<HealthGoal>,
) -> Result<(), WeightGoalError> {
    if goal_kg < MIN_WEIGHT_KG {
        return Err(WeightGoalError::BelowMinimum);
    }
    if goals.contains(&HealthGoal::LoseWeight) && goal_kg >= current_kg {
        return Err(WeightGoalError::NotBelowCurrent);
    }
    if goals.contains(&HealthGoal::GainWeight) && goal_kg <= current_kg {
        return Err(WeightGoalError::NotAboveCurrent);
    }
    if goals.contains(&HealthGoal::MaintainWeight)
        && (goal_kg - current_kg).abs() > MAINTENANCE_TOLERANCE_KG
    {
        return Err(WeightGoalError::OutsideMaintenanceRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ActivityLevel;

    fn goals(list: &[HealthGoal]) -> BTreeSet<HealthGoal> {
        list.iter().copied().collect()
    }

    fn female_30_70_170(activity: ActivityLevel, g: &[HealthGoal]) -> HealthProfile {
        HealthProfile {
            age: Some(30),
            sex: Some(Sex::Female),
            height_cm: Some(170.0),
            weight_kg: 70.0,
            activity_level: activity,
            health_goals: goals(g),
            ..Default::default()
        }
    }

    #[test]
    fn test_bmi_normal() {
        let value = bmi(70.0, 175.0);
        assert!((value - 22.9).abs() < f64::EPSILON);
        assert_eq!(BmiCategory::from_bmi(value).label(), "Normal weight");
    }

    #[test]
    fn test_bmi_boundaries() {
        let just_normal = bmi(50.0, 160.0);
        assert!((just_normal - 19.5).abs() < f64::EPSILON);
        assert_eq!(BmiCategory::from_bmi(just_normal), BmiCategory::Normal);

        let under = bmi(45.0, 160.0);
        assert!((under - 17.6).abs() < f64::EPSILON);
        assert_eq!(BmiCategory::from_bmi(under), BmiCategory::Underweight);

        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
    }

    #[test]
    fn test_daily_calories_female_sedentary_lose() {
        let profile = female_30_70_170(ActivityLevel::Sedentary, &[HealthGoal::LoseWeight]);
        let target = daily_calories(&profile);
        let expected_bmr = 447.593 + 9.247 * 70.0 + 3.098 * 170.0 - 4.330 * 30.0;
        assert!((target.bmr - expected_bmr).abs() < 1e-9);
        assert_eq!(target.calories, (expected_bmr * 1.2 - 500.0).round() as i64);
        assert_eq!(target.calories, 1290);
        assert_eq!(target.adjustment, -500);
        assert!(target.assumed.is_empty());
    }

    #[test]
    fn test_daily_calories_male_gain() {
        let profile = HealthProfile {
            age: Some(25),
            sex: Some(Sex::Male),
            height_cm: Some(180.0),
            weight_kg: 75.0,
            activity_level: ActivityLevel::ModeratelyActive,
            health_goals: goals(&[HealthGoal::GainWeight]),
            ..Default::default()
        };
        let expected: f64 = 88.362 + 13.397 * 75.0 + 4.799 * 180.0 - 5.677 * 25.0;
        let target = daily_calories(&profile);
        assert_eq!(target.calories, (expected * 1.55 + 500.0).round() as i64);
    }

    #[test]
    fn test_lose_wins_over_gain() {
        let profile = female_30_70_170(
            ActivityLevel::Sedentary,
            &[HealthGoal::GainWeight, HealthGoal::LoseWeight],
        );
        assert_eq!(daily_calories(&profile).adjustment, -500);
    }

    #[test]
    fn test_non_binary_uses_female_equation() {
        assert!(
            (bmr(Sex::NonBinary, 60.0, 165.0, 40) - bmr(Sex::Female, 60.0, 165.0, 40)).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn test_missing_fields_are_reported_as_assumed() {
        let complete = female_30_70_170(ActivityLevel::Sedentary, &[]);
        let sparse = HealthProfile {
            weight_kg: 70.0,
            ..Default::default()
        };
        let a = daily_calories(&complete);
        let b = daily_calories(&sparse);
        assert_eq!(a.calories, b.calories);
        assert_eq!(
            b.assumed,
            vec![AssumedField::Age, AssumedField::HeightCm, AssumedField::Sex]
        );
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let profile = female_30_70_170(ActivityLevel::VeryActive, &[HealthGoal::LoseWeight]);
        assert_eq!(assess(&profile), assess(&profile));
        assert_eq!(daily_calories(&profile), daily_calories(&profile));
    }

    #[test]
    fn test_feedback_depends_on_goal() {
        let lose = goals(&[HealthGoal::LoseWeight]);
        let none = BTreeSet::new();
        assert!(bmi_feedback(BmiCategory::Obese, &lose).starts_with("Excellent goal!"));
        assert!(bmi_feedback(BmiCategory::Obese, &none).contains("healthcare provider"));
        assert!(
            bmi_feedback(BmiCategory::Underweight, &goals(&[HealthGoal::GainWeight]))
                .starts_with("Great!")
        );
        assert!(bmi_feedback(BmiCategory::Overweight, &none).contains("portion control"));
    }

    #[test]
    fn test_weight_goal_lose_requires_lower() {
        let lose = goals(&[HealthGoal::LoseWeight]);
        assert_eq!(
            validate_weight_goal(80.0, 80.0, &lose),
            Err(WeightGoalError::NotBelowCurrent)
        );
        assert!(validate_weight_goal(80.0, 75.0, &lose).is_ok());
    }

    #[test]
    fn test_weight_goal_gain_requires_higher() {
        let gain = goals(&[HealthGoal::GainWeight]);
        assert_eq!(
            validate_weight_goal(60.0, 59.5, &gain),
            Err(WeightGoalError::NotAboveCurrent)
        );
        assert!(validate_weight_goal(60.0, 65.0, &gain).is_ok());
    }

    #[test]
    fn test_weight_goal_maintain_within_five_kg() {
        let maintain = goals(&[HealthGoal::MaintainWeight]);
        assert!(validate_weight_goal(70.0, 67.0, &maintain).is_ok());
        assert!(validate_weight_goal(70.0, 75.0, &maintain).is_ok());
        assert_eq!(
            validate_weight_goal(70.0, 64.0, &maintain),
            Err(WeightGoalError::OutsideMaintenanceRange)
        );
    }

    #[test]
    fn test_weight_goal_without_weight_goals_is_free() {
        let other = goals(&[HealthGoal::BetterSleep]);
        assert!(validate_weight_goal(70.0, 90.0, &other).is_ok());
        assert_eq!(
            validate_weight_goal(70.0, 29.5, &other),
            Err(WeightGoalError::BelowMinimum)
        );
    }

    #[test]
    fn test_weight_goal_messages() {
        assert_eq!(
            WeightGoalError::NotBelowCurrent.to_string(),
            "Your weight goal should be lower than your current weight for weight loss."
        );
    }
}
