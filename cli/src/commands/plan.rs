use anyhow::{Result, bail};
use chrono::Duration;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use wellnoosh_core::models::{MealPlan, MealPlanInput, MealPlanRecipeInput, MealType};
use wellnoosh_core::planner::{MealsPerDay, PLAN_DAYS, PlannedMeal};
use wellnoosh_core::service::WellnooshService;

use super::helpers::{parse_date, print_json, truncate};

pub(crate) fn print_week(meals: &[PlannedMeal]) {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Time")]
        time: &'static str,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "Target")]
        target: String,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| MealRow {
            date: m.date.format("%a %Y-%m-%d").to_string(),
            time: m.time,
            meal: m.meal_type.to_string(),
            recipe: truncate(&m.recipe_name, 34),
            calories: format!("{:.0}", m.calories),
            target: format!("{:.0}", m.target_calories),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_plans(plans: &[MealPlan]) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Dates")]
        dates: String,
        #[tabled(rename = "Recipes")]
        recipes: i64,
        #[tabled(rename = "kcal/day")]
        daily: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            id: p.id.clone(),
            name: truncate(&p.name, 30),
            dates: format!("{} to {}", p.start_date, p.end_date),
            recipes: p.total_recipes,
            daily: format!("{:.0}", p.average_daily_calories),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) async fn cmd_plan_list(service: &WellnooshService, json: bool) -> Result<()> {
    let plans = service.meal_plans().await?;
    if json {
        print_json(&plans)?;
    } else if plans.is_empty() {
        eprintln!("No meal plans yet. Use `wellnoosh plan generate` or `wellnoosh wizard`.");
    } else {
        print_plans(&plans);
    }
    Ok(())
}

pub(crate) async fn cmd_plan_create(
    service: &WellnooshService,
    name: &str,
    start: Option<String>,
    days: i64,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    if days < 1 {
        bail!("A meal plan must cover at least one day");
    }
    let start_date = parse_date(start)?;
    let input = MealPlanInput {
        name: name.to_string(),
        description,
        start_date,
        end_date: start_date + Duration::days(days - 1),
        preferences: None,
    };
    let plan = service.create_meal_plan(&input).await?;
    if json {
        print_json(&plan)?;
    } else {
        println!(
            "Created meal plan \"{}\" ({} to {})\n  ID: {}",
            plan.name, plan.start_date, plan.end_date, plan.id
        );
    }
    Ok(())
}

pub(crate) struct AddRecipeArgs {
    pub plan_id: String,
    pub recipe_id: String,
    pub date: Option<String>,
    pub meal: String,
    pub servings: i64,
    pub notes: Option<String>,
}

pub(crate) async fn cmd_plan_add_recipe(
    service: &WellnooshService,
    args: AddRecipeArgs,
    json: bool,
) -> Result<()> {
    let input = MealPlanRecipeInput {
        recipe_id: args.recipe_id,
        scheduled_date: parse_date(args.date)?,
        meal_type: args.meal.parse::<MealType>()?,
        servings: args.servings,
        notes: args.notes,
    };
    let entry = service
        .add_recipe_to_meal_plan(&args.plan_id, &input)
        .await?;
    if json {
        print_json(&entry)?;
    } else {
        println!(
            "Scheduled {} for {} on {} ({} serving{})",
            entry.recipe_id,
            entry.meal_type,
            entry.scheduled_date,
            entry.servings,
            if entry.servings == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

pub(crate) async fn cmd_plan_generate(
    service: &WellnooshService,
    meals: &str,
    start: Option<String>,
    json: bool,
) -> Result<()> {
    let meals_per_day: MealsPerDay = meals.parse()?;
    let start = parse_date(start)?;
    let week = service.generate_meal_plan(meals_per_day, start).await?;
    if json {
        print_json(&week)?;
    } else {
        println!(
            "Created \"{}\": {} meals over {PLAN_DAYS} days, about {:.0} kcal/day",
            week.plan.name,
            week.meals.len(),
            week.plan.average_daily_calories
        );
        print_week(&week.meals);
    }
    Ok(())
}
