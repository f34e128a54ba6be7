use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use wellnoosh_core::models::Recipe;
use wellnoosh_core::profile::{
    HeightUnit, WeightUnit, height_feet_inches_to_cm, validate_height_cm, weight_input_to_kg,
};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Split "70.5kg" or "154 lbs" into (70.5, "kg") / (154.0, "lbs").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.parse().ok()?;
    Some((qty, unit_part.trim()))
}

/// Parse a weight such as "70", "70kg" or "154 lbs" into kilograms.
pub(crate) fn parse_weight(s: &str) -> Result<(f64, WeightUnit)> {
    let s = s.trim();
    let (value, unit) =
        split_number_unit(s).with_context(|| format!("Invalid weight '{s}'. Use '70kg' or '154lbs'"))?;
    let unit = match unit.to_lowercase().as_str() {
        "" | "kg" | "kgs" => WeightUnit::Kg,
        "lb" | "lbs" => WeightUnit::Lbs,
        other => bail!("Unknown weight unit '{other}'. Use 'kg' or 'lbs'"),
    };
    Ok((weight_input_to_kg(value, unit)?, unit))
}

/// Parse a height such as "175", "175cm", `5'10"` or "5ft 10in" into centimetres.
pub(crate) fn parse_height(s: &str) -> Result<(f64, HeightUnit)> {
    let s = s.trim().to_lowercase();
    let imperial = s.replace("ft", "'").replace("in", "\"").replace(' ', "");
    if let Some((feet, rest)) = imperial.split_once('\'') {
        let feet: u32 = feet
            .parse()
            .with_context(|| format!("Invalid feet in height '{s}'"))?;
        let inches = rest.trim_end_matches('"');
        let inches: u32 = if inches.is_empty() {
            0
        } else {
            inches
                .parse()
                .with_context(|| format!("Invalid inches in height '{s}'"))?
        };
        return Ok((height_feet_inches_to_cm(feet, inches)?, HeightUnit::Ft));
    }
    let cm: f64 = s
        .trim_end_matches("cm")
        .trim()
        .parse()
        .with_context(|| format!("Invalid height '{s}'. Use '175cm' or 5'10\""))?;
    validate_height_cm(cm)?;
    Ok((cm, HeightUnit::Cm))
}

pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) fn parse_choice(line: &str, count: usize) -> Result<usize> {
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

/// Parse "1,3, 4" into zero-based indices, dropping duplicates.
pub(crate) fn parse_multi_choice(line: &str, count: usize) -> Result<Vec<usize>> {
    let mut picked = Vec::new();
    for part in line.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let idx = parse_choice(part, count)?;
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    Ok(picked)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Rating")]
        rating: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: truncate(&r.id, 28),
            name: truncate(&r.name, 32),
            meal: r.meal_type.to_string(),
            time: format!("{} min", r.total_time_minutes),
            calories: format!("{:.0}", r.nutrition.calories_per_serving),
            protein: format!("{:.0}g", r.nutrition.protein_g),
            rating: r.rating.map_or("-".into(), |v| format!("{v:.1}")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Render filled/empty slots, e.g. `●●○○○○`.
pub(crate) fn slot_bar(slots: &[bool]) -> String {
    slots.iter().map(|&done| if done { '●' } else { '○' }).collect()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
