use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use wellnoosh_core::models::{Difficulty, MealType, Recipe, RecipeFilters};
use wellnoosh_core::service::WellnooshService;

use super::helpers::{print_json, print_recipe_table, truncate};

/// Filter flags shared by `recipe list` and `recipe search`.
#[derive(Debug, Default)]
pub(crate) struct FilterArgs {
    pub meal: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub diet: Vec<String>,
    pub exclude_allergen: Vec<String>,
    pub tag: Vec<String>,
    pub max_prep: Option<i64>,
    pub max_cook: Option<i64>,
    pub max_calories: Option<f64>,
    pub min_protein: Option<f64>,
}

impl FilterArgs {
    pub(crate) fn into_filters(self) -> Result<RecipeFilters> {
        let non_empty = |v: Vec<String>| (!v.is_empty()).then_some(v);
        Ok(RecipeFilters {
            meal_type: self.meal.as_deref().map(str::parse::<MealType>).transpose()?,
            cuisine_type: self.cuisine,
            difficulty: self
                .difficulty
                .as_deref()
                .map(str::parse::<Difficulty>)
                .transpose()?,
            diet_categories: non_empty(self.diet),
            exclude_allergens: non_empty(self.exclude_allergen),
            max_prep_time: self.max_prep,
            max_cook_time: self.max_cook,
            max_calories: self.max_calories,
            min_protein: self.min_protein,
            tags: non_empty(self.tag),
            search_query: None,
        })
    }
}

fn print_recipes(recipes: &[Recipe], empty_hint: &str, json: bool) -> Result<()> {
    if json {
        print_json(&recipes)?;
    } else if recipes.is_empty() {
        eprintln!("{empty_hint}");
    } else {
        print_recipe_table(recipes);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_list(
    service: &WellnooshService,
    filters: FilterArgs,
    json: bool,
) -> Result<()> {
    let recipes = service.recipes(&filters.into_filters()?).await;
    print_recipes(&recipes, "No recipes match those filters.", json)
}

pub(crate) async fn cmd_recipe_search(
    service: &WellnooshService,
    query: &str,
    filters: FilterArgs,
    json: bool,
) -> Result<()> {
    let recipes = service
        .search_recipes(query, &filters.into_filters()?)
        .await;
    print_recipes(&recipes, &format!("No recipes found for '{query}'."), json)
}

pub(crate) async fn cmd_recipe_featured(service: &WellnooshService, json: bool) -> Result<()> {
    let recipes = service.featured_recipes().await;
    print_recipes(&recipes, "No featured recipes right now.", json)
}

pub(crate) async fn cmd_recipe_show(service: &WellnooshService, id: &str, json: bool) -> Result<()> {
    let Some(recipe) = service.recipe(id).await else {
        bail!("Recipe not found: {id}");
    };
    let rating = service.rating(id).await?;

    if json {
        print_json(&serde_json::json!({ "recipe": recipe, "myRating": rating }))?;
        return Ok(());
    }

    println!("{}", recipe.name);
    if let Some(ref description) = recipe.description {
        println!("{description}");
    }
    println!();
    println!(
        "{} | {} | {} min ({} prep, {} cook) | serves {}",
        recipe.meal_type,
        recipe.difficulty.as_str(),
        recipe.total_time_minutes,
        recipe.prep_time_minutes,
        recipe.cook_time_minutes,
        recipe.servings
    );
    let n = &recipe.nutrition;
    println!(
        "Per serving: {:.0} kcal, {:.0}g protein, {:.0}g carbs, {:.0}g fat",
        n.calories_per_serving, n.protein_g, n.carbs_g, n.fat_g
    );
    if !recipe.diet_categories.is_empty() {
        println!("Diet: {}", recipe.diet_categories.join(", "));
    }
    if !recipe.allergen_info.is_empty() {
        println!("Allergens: {}", recipe.allergen_info.join(", "));
    }
    if let Some(r) = recipe.rating {
        println!("Rating: {r:.1} ({} ratings)", recipe.rating_count);
    }
    if let Some(mine) = rating {
        println!("Your rating: {}/5", mine.rating);
    }

    if !recipe.ingredients.is_empty() {
        println!("\nIngredients:");
        for ing in &recipe.ingredients {
            let optional = if ing.is_optional { " (optional)" } else { "" };
            let notes = ing
                .notes
                .as_deref()
                .map(|n| format!(", {n}"))
                .unwrap_or_default();
            println!("  - {} {} {}{notes}{optional}", ing.amount, ing.unit, ing.name);
        }
    }
    if !recipe.instructions.is_empty() {
        println!("\nSteps:");
        for (i, step) in recipe.instructions.iter().enumerate() {
            println!("  {}. {step}", i + 1);
        }
    }
    if let Some(ref tips) = recipe.tips {
        println!("\nTip: {tips}");
    }
    Ok(())
}

pub(crate) async fn cmd_ingredients(
    service: &WellnooshService,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut items = service.ingredients().await;
    if let Some(cat) = category {
        let wanted = cat.to_lowercase();
        items.retain(|i| {
            serde_json::to_value(i.category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_lowercase))
                .is_some_and(|c| c.contains(&wanted))
        });
    }

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        eprintln!("No ingredients found.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "kcal/100g")]
        calories: String,
        #[tabled(rename = "Vegan")]
        vegan: &'static str,
    }

    let rows: Vec<IngredientRow> = items
        .iter()
        .map(|i| IngredientRow {
            name: truncate(&i.name, 30),
            category: serde_json::to_value(i.category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            unit: i.default_unit.clone().unwrap_or_default(),
            calories: i.calories_per_100g.map_or("-".into(), |c| format!("{c:.0}")),
            vegan: if i.is_vegan { "yes" } else { "" },
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) async fn cmd_favorite_add(
    service: &WellnooshService,
    recipe_id: &str,
    notes: Option<&str>,
    json: bool,
) -> Result<()> {
    let favorite = service.add_favorite(recipe_id, notes).await?;
    if json {
        print_json(&favorite)?;
    } else {
        println!("Added {recipe_id} to favorites");
    }
    Ok(())
}

pub(crate) async fn cmd_favorite_remove(
    service: &WellnooshService,
    recipe_id: &str,
    json: bool,
) -> Result<()> {
    let removed = service.remove_favorite(recipe_id).await?;
    if json {
        println!("{}", serde_json::json!({ "removed": recipe_id, "existed": removed }));
    } else if removed {
        println!("Removed {recipe_id} from favorites");
    } else {
        eprintln!("{recipe_id} was not in your favorites");
    }
    Ok(())
}

pub(crate) async fn cmd_favorite_list(service: &WellnooshService, json: bool) -> Result<()> {
    let favorites = service.favorites().await?;
    if json {
        return print_json(&favorites);
    }
    if favorites.is_empty() {
        eprintln!("No favorites yet. Use `wellnoosh favorite add <recipe-id>`.");
        return Ok(());
    }

    let mut recipes = Vec::with_capacity(favorites.len());
    for favorite in &favorites {
        match service.recipe(&favorite.recipe_id).await {
            Some(recipe) => recipes.push(recipe),
            None => eprintln!("  (recipe {} is no longer available)", favorite.recipe_id),
        }
    }
    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) async fn cmd_rate(
    service: &WellnooshService,
    recipe_id: &str,
    rating: i64,
    review: Option<&str>,
    json: bool,
) -> Result<()> {
    let saved = service.rate_recipe(recipe_id, rating, review).await?;
    if json {
        print_json(&saved)?;
    } else {
        let stars = "★".repeat(usize::try_from(saved.rating).unwrap_or(0));
        println!("Rated {recipe_id} {stars} ({}/5)", saved.rating);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_args_convert() {
        let filters = FilterArgs {
            meal: Some("dinner".into()),
            difficulty: Some("easy".into()),
            diet: vec!["Vegan".into()],
            max_calories: Some(500.0),
            ..Default::default()
        }
        .into_filters()
        .unwrap();
        assert_eq!(filters.meal_type, Some(MealType::Dinner));
        assert_eq!(filters.difficulty, Some(Difficulty::Easy));
        assert_eq!(filters.diet_categories, Some(vec!["Vegan".to_string()]));
        assert_eq!(filters.tags, None);
        assert_eq!(filters.max_calories, Some(500.0));
    }

    #[test]
    fn test_filter_args_reject_bad_meal() {
        let args = FilterArgs {
            meal: Some("brunch".into()),
            ..Default::default()
        };
        assert!(args.into_filters().is_err());
    }
}
