//! Health profile: biometrics, activity level and goal selections.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KG_PER_LB: f64 = 0.453_592;
pub const LBS_PER_KG: f64 = 2.20462;
pub const CM_PER_INCH: f64 = 2.54;
pub const CM_PER_FOOT: f64 = 30.48;

pub const MIN_AGE: u32 = 13;
pub const MAX_AGE: u32 = 120;
pub const MIN_HEIGHT_CM: f64 = 100.0;
pub const MAX_HEIGHT_CM: f64 = 250.0;
pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;
pub const MIN_WEIGHT_LBS: f64 = 66.0;
pub const MAX_WEIGHT_LBS: f64 = 660.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("Age must be between 13 and 120 (got {0})")]
    Age(u32),
    #[error("Height must be between 100 and 250 cm (got {0:.1} cm)")]
    Height(f64),
    #[error("Height must be between 3 and 8 feet with 0-11 inches (got {feet}' {inches}\")")]
    FeetInches { feet: u32, inches: u32 },
    #[error("Weight must be between 30 and 300 kg (got {0:.1} kg)")]
    WeightKg(f64),
    #[error("Weight must be between 66 and 660 lbs (got {0:.1} lbs)")]
    WeightLbs(f64),
    #[error("Unknown {kind} '{value}'")]
    Unknown { kind: &'static str, value: String },
}

fn unknown(kind: &'static str, value: &str) -> ProfileError {
    ProfileError::Unknown {
        kind,
        value: value.to_string(),
    }
}

/// Biological sex as used by the BMR equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sex {
    Male,
    Female,
    NonBinary,
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::NonBinary => "non-binary",
        }
    }
}

impl FromStr for Sex {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "non-binary" | "nonbinary" | "nb" => Ok(Self::NonBinary),
            _ => Err(unknown("gender", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
}

pub const ACTIVITY_LEVELS: &[ActivityLevel] = &[
    ActivityLevel::Sedentary,
    ActivityLevel::LightlyActive,
    ActivityLevel::ModeratelyActive,
    ActivityLevel::VeryActive,
    ActivityLevel::ExtremelyActive,
];

impl ActivityLevel {
    /// TDEE multiplier applied to BMR.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtremelyActive => 1.9,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sedentary => "Sedentary (little/no exercise)",
            Self::LightlyActive => "Lightly Active (light exercise 1-3 days/week)",
            Self::ModeratelyActive => "Moderately Active (moderate exercise 3-5 days/week)",
            Self::VeryActive => "Very Active (hard exercise 6-7 days/week)",
            Self::ExtremelyActive => "Extremely Active (very hard exercise, physical job)",
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "light",
            Self::ModeratelyActive => "moderate",
            Self::VeryActive => "very",
            Self::ExtremelyActive => "extreme",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActivityLevel {
    type Err = ProfileError;

    /// Accepts the short key, the snake_case name, or the full option label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ACTIVITY_LEVELS
            .iter()
            .copied()
            .find(|level| {
                lower == level.key()
                    || lower == level.label().to_lowercase()
                    || lower.replace(['-', ' '], "_") == snake_name(*level)
            })
            .ok_or_else(|| unknown("activity level", s))
    }
}

fn snake_name(level: ActivityLevel) -> &'static str {
    match level {
        ActivityLevel::Sedentary => "sedentary",
        ActivityLevel::LightlyActive => "lightly_active",
        ActivityLevel::ModeratelyActive => "moderately_active",
        ActivityLevel::VeryActive => "very_active",
        ActivityLevel::ExtremelyActive => "extremely_active",
    }
}

macro_rules! labelled_enum {
    ($name:ident, $kind:literal, $all:ident, { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        pub const $all: &[$name] = &[$($name::$variant),+];

        impl $name {
            #[must_use]
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ProfileError;

            /// Matches the label case-insensitively, treating `-`, `_` and spaces alike.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                $all.iter()
                    .copied()
                    .find(|v| normalize(v.label()) == wanted)
                    .ok_or_else(|| unknown($kind, s))
            }
        }
    };
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

labelled_enum!(HealthGoal, "health goal", HEALTH_GOALS, {
    LoseWeight => "Lose Weight",
    GainWeight => "Gain Weight",
    MaintainWeight => "Maintain Weight",
    BuildMuscle => "Build Muscle",
    ImproveEnergy => "Improve Energy",
    BetterDigestion => "Better Digestion",
    ReduceInflammation => "Reduce Inflammation",
    HeartHealth => "Heart Health",
    BetterSleep => "Better Sleep",
    GeneralWellness => "General Wellness",
});

labelled_enum!(DietStyle, "diet style", DIET_STYLES, {
    Balanced => "Balanced",
    Omnivore => "Omnivore",
    Vegetarian => "Vegetarian",
    Vegan => "Vegan",
    Pescatarian => "Pescatarian",
    Keto => "Keto",
    Paleo => "Paleo",
    Mediterranean => "Mediterranean",
    LowCarb => "Low Carb",
    GlutenFree => "Gluten-Free",
    DairyFree => "Dairy-Free",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Cm,
    Ft,
}

#[must_use]
pub fn lbs_to_kg(lbs: f64) -> f64 {
    lbs * KG_PER_LB
}

#[must_use]
pub fn kg_to_lbs(kg: f64) -> f64 {
    kg * LBS_PER_KG
}

#[must_use]
pub fn feet_inches_to_cm(feet: u32, inches: u32) -> f64 {
    f64::from(feet) * CM_PER_FOOT + f64::from(inches) * CM_PER_INCH
}

/// Convert a weight entered in `unit` to kilograms, enforcing that unit's bounds.
pub fn weight_input_to_kg(value: f64, unit: WeightUnit) -> Result<f64, ProfileError> {
    match unit {
        WeightUnit::Kg => {
            validate_weight_kg(value)?;
            Ok(value)
        }
        WeightUnit::Lbs => {
            if !(MIN_WEIGHT_LBS..=MAX_WEIGHT_LBS).contains(&value) {
                return Err(ProfileError::WeightLbs(value));
            }
            Ok(lbs_to_kg(value))
        }
    }
}

pub fn height_feet_inches_to_cm(feet: u32, inches: u32) -> Result<f64, ProfileError> {
    if !(3..=8).contains(&feet) || inches > 11 {
        return Err(ProfileError::FeetInches { feet, inches });
    }
    Ok(feet_inches_to_cm(feet, inches))
}

pub fn validate_age(age: u32) -> Result<(), ProfileError> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(ProfileError::Age(age))
    }
}

pub fn validate_height_cm(cm: f64) -> Result<(), ProfileError> {
    if (MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&cm) {
        Ok(())
    } else {
        Err(ProfileError::Height(cm))
    }
}

pub fn validate_weight_kg(kg: f64) -> Result<(), ProfileError> {
    if (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&kg) {
        Ok(())
    } else {
        Err(ProfileError::WeightKg(kg))
    }
}

/// A user's biometrics and goal selections. Height and weight are always
/// stored metric; the unit fields only record how the user prefers to see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, rename = "genderBiologicalSex")]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    pub weight_kg: f64,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub height_unit: HeightUnit,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub health_goals: BTreeSet<HealthGoal>,
    #[serde(default)]
    pub diet_styles: BTreeSet<DietStyle>,
    #[serde(default)]
    pub weight_goal_kg: Option<f64>,
}

impl Default for HealthProfile {
    fn default() -> Self {
        Self {
            age: None,
            sex: None,
            height_cm: None,
            weight_kg: 70.0,
            weight_unit: WeightUnit::Kg,
            height_unit: HeightUnit::Cm,
            activity_level: ActivityLevel::Sedentary,
            health_goals: BTreeSet::new(),
            diet_styles: BTreeSet::new(),
            weight_goal_kg: None,
        }
    }
}

impl HealthProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        if let Some(cm) = self.height_cm {
            validate_height_cm(cm)?;
        }
        validate_weight_kg(self.weight_kg)
    }

    #[must_use]
    pub fn has_goal(&self, goal: HealthGoal) -> bool {
        self.health_goals.contains(&goal)
    }
}
