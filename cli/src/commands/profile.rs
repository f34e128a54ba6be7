use anyhow::Result;

use wellnoosh_core::nutrition::{self, AssumedField, Assessment, CalorieTarget};
use wellnoosh_core::profile::{
    ActivityLevel, DietStyle, HealthGoal, HealthProfile, HeightUnit, Sex, WeightUnit, kg_to_lbs,
};
use wellnoosh_core::service::WellnooshService;

use super::helpers::{parse_height, parse_weight, print_json};

/// Field updates for `profile set`; anything left `None` keeps its saved value.
#[derive(Debug, Default)]
pub(crate) struct ProfileUpdate {
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub activity: Option<String>,
    pub goals: Vec<String>,
    pub diets: Vec<String>,
    pub goal_weight: Option<String>,
}

impl ProfileUpdate {
    fn apply(self, mut profile: HealthProfile) -> Result<HealthProfile> {
        if let Some(age) = self.age {
            profile.age = Some(age);
        }
        if let Some(ref sex) = self.sex {
            profile.sex = Some(sex.parse::<Sex>()?);
        }
        if let Some(ref height) = self.height {
            let (cm, unit) = parse_height(height)?;
            profile.height_cm = Some(cm);
            profile.height_unit = unit;
        }
        if let Some(ref weight) = self.weight {
            let (kg, unit) = parse_weight(weight)?;
            profile.weight_kg = kg;
            profile.weight_unit = unit;
        }
        if let Some(ref activity) = self.activity {
            profile.activity_level = activity.parse::<ActivityLevel>()?;
        }
        if !self.goals.is_empty() {
            profile.health_goals = self
                .goals
                .iter()
                .map(|g| g.parse::<HealthGoal>())
                .collect::<Result<_, _>>()?;
        }
        if !self.diets.is_empty() {
            profile.diet_styles = self
                .diets
                .iter()
                .map(|d| d.parse::<DietStyle>())
                .collect::<Result<_, _>>()?;
        }
        if let Some(ref goal) = self.goal_weight {
            let (kg, _) = parse_weight(goal)?;
            nutrition::validate_weight_goal(profile.weight_kg, kg, &profile.health_goals)?;
            profile.weight_goal_kg = Some(kg);
        }
        Ok(profile)
    }
}

fn saved_or_default(service: &WellnooshService) -> Result<HealthProfile> {
    Ok(service.health_profile()?.unwrap_or_default())
}

fn format_weight(kg: f64, unit: WeightUnit) -> String {
    match unit {
        WeightUnit::Kg => format!("{kg:.1} kg"),
        WeightUnit::Lbs => format!("{:.1} lbs ({kg:.1} kg)", kg_to_lbs(kg)),
    }
}

fn format_height(cm: f64, unit: HeightUnit) -> String {
    match unit {
        HeightUnit::Cm => format!("{cm:.0} cm"),
        HeightUnit::Ft => {
            let total_inches = (cm / 2.54).round() as i64;
            format!("{}'{}\" ({cm:.0} cm)", total_inches / 12, total_inches % 12)
        }
    }
}

fn join_labels<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let labels: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    if labels.is_empty() {
        "-".to_string()
    } else {
        labels.join(", ")
    }
}

pub(crate) fn print_profile(profile: &HealthProfile) {
    println!(
        "Age:           {}",
        profile.age.map_or("-".into(), |a| a.to_string())
    );
    println!(
        "Sex:           {}",
        profile.sex.map_or("-", Sex::as_str)
    );
    println!(
        "Height:        {}",
        profile
            .height_cm
            .map_or("-".into(), |cm| format_height(cm, profile.height_unit))
    );
    println!(
        "Weight:        {}",
        format_weight(profile.weight_kg, profile.weight_unit)
    );
    println!(
        "Goal weight:   {}",
        profile
            .weight_goal_kg
            .map_or("-".into(), |kg| format_weight(kg, profile.weight_unit))
    );
    println!("Activity:      {}", profile.activity_level);
    println!("Health goals:  {}", join_labels(&profile.health_goals));
    println!("Diet styles:   {}", join_labels(&profile.diet_styles));
}

pub(crate) async fn cmd_profile_set(
    service: &WellnooshService,
    update: ProfileUpdate,
    json: bool,
) -> Result<()> {
    let profile = update.apply(saved_or_default(service)?)?;
    let synced = service.save_health_profile(&profile).await?;

    if json {
        print_json(&serde_json::json!({ "profile": profile, "synced": synced }))?;
    } else {
        print_profile(&profile);
        if service.is_remote_configured() && !synced {
            eprintln!("\nSaved locally; changes will sync when the backend is reachable.");
        }
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(service: &WellnooshService, json: bool) -> Result<()> {
    match service.health_profile()? {
        Some(profile) if json => print_json(&profile)?,
        Some(profile) => print_profile(&profile),
        None if json => println!("{}", serde_json::json!({ "error": "No health profile saved" })),
        None => eprintln!("No health profile yet. Use `wellnoosh profile set` or `wellnoosh wizard`."),
    }
    Ok(())
}

fn print_assumed(assumed: &[AssumedField]) {
    if assumed.is_empty() {
        return;
    }
    let fields: Vec<&str> = assumed
        .iter()
        .map(|f| match f {
            AssumedField::Age => "age (30)",
            AssumedField::HeightCm => "height (170 cm)",
            AssumedField::Sex => "sex (female)",
        })
        .collect();
    eprintln!(
        "Note: profile incomplete, assumed {}. Use `wellnoosh profile set` for an exact figure.",
        fields.join(", ")
    );
}

pub(crate) fn print_assessment(assessment: &Assessment) {
    println!(
        "BMI:       {:.1} ({})",
        assessment.bmi,
        assessment.bmi_category.label()
    );
    println!("           {}", assessment.bmi_feedback);
    print_target(&assessment.target);
}

fn print_target(target: &CalorieTarget) {
    println!("Calories:  {} kcal/day", target.calories);
    println!(
        "           BMR {:.0} x {} activity{}",
        target.bmr,
        target.multiplier,
        match target.adjustment {
            0 => String::new(),
            a if a > 0 => format!(" + {a} for weight gain"),
            a => format!(" - {} for weight loss", a.abs()),
        }
    );
    print_assumed(&target.assumed);
}

/// BMI for the saved profile, optionally overriding weight/height for a what-if.
pub(crate) fn cmd_bmi(
    service: &WellnooshService,
    weight: Option<&str>,
    height: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut profile = saved_or_default(service)?;
    if let Some(w) = weight {
        profile.weight_kg = parse_weight(w)?.0;
    }
    if let Some(h) = height {
        profile.height_cm = Some(parse_height(h)?.0);
    }
    let assessment = service.assessment(&profile);

    if json {
        print_json(&serde_json::json!({
            "bmi": assessment.bmi,
            "bmiCategory": assessment.bmi_category,
            "bmiFeedback": assessment.bmi_feedback,
        }))?;
    } else {
        println!(
            "BMI: {:.1} ({})",
            assessment.bmi,
            assessment.bmi_category.label()
        );
        println!("{}", assessment.bmi_feedback);
        if profile.height_cm.is_none() {
            print_assumed(&[AssumedField::HeightCm]);
        }
    }
    Ok(())
}

pub(crate) fn cmd_calories(service: &WellnooshService, json: bool) -> Result<()> {
    let profile = saved_or_default(service)?;
    let assessment = service.assessment(&profile);
    if json {
        print_json(&assessment)?;
    } else {
        print_assessment(&assessment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_merges_into_saved_profile() {
        let saved = HealthProfile {
            age: Some(40),
            weight_kg: 80.0,
            ..Default::default()
        };
        let update = ProfileUpdate {
            height: Some("5'10\"".into()),
            goals: vec!["lose weight".into()],
            goal_weight: Some("75kg".into()),
            ..Default::default()
        };
        let profile = update.apply(saved).unwrap();
        assert_eq!(profile.age, Some(40));
        assert_eq!(profile.height_unit, HeightUnit::Ft);
        assert!(profile.has_goal(HealthGoal::LoseWeight));
        assert_eq!(profile.weight_goal_kg, Some(75.0));
    }

    #[test]
    fn test_update_rejects_inconsistent_goal_weight() {
        let update = ProfileUpdate {
            weight: Some("70".into()),
            goals: vec!["Gain Weight".into()],
            goal_weight: Some("65".into()),
            ..Default::default()
        };
        let err = update.apply(HealthProfile::default()).unwrap_err();
        assert!(err.to_string().contains("higher than your current weight"));
    }

    #[test]
    fn test_update_rejects_unknown_labels() {
        let update = ProfileUpdate {
            diets: vec!["carnivore".into()],
            ..Default::default()
        };
        assert!(update.apply(HealthProfile::default()).is_err());
    }

    #[test]
    fn test_format_height_imperial() {
        assert_eq!(format_height(177.8, HeightUnit::Ft), "5'10\" (178 cm)");
        assert_eq!(format_height(172.0, HeightUnit::Cm), "172 cm");
    }
}
