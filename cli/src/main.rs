mod commands;
mod config;
mod server;
mod supabase;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    AddRecipeArgs, FilterArgs, ProfileUpdate, cmd_auth_signin, cmd_auth_signout, cmd_auth_signup,
    cmd_auth_status, cmd_bmi, cmd_breathe, cmd_breathing_status, cmd_breathing_toggle,
    cmd_calories, cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove, cmd_ingredients,
    cmd_plan_add_recipe, cmd_plan_create, cmd_plan_generate, cmd_plan_list, cmd_profile_set,
    cmd_profile_show, cmd_rate, cmd_recipe_featured, cmd_recipe_list, cmd_recipe_search,
    cmd_recipe_show, cmd_water_add, cmd_water_status, cmd_water_toggle, cmd_wizard,
};
use crate::config::Config;

const LOG_ENV_VAR: &str = "WELLNOOSH_LOG";

#[derive(Parser)]
#[command(
    name = "wellnoosh",
    version,
    about = "Your wellness companion: goals, breathing, water, recipes and meal plans"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View or edit your health profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show BMI for your profile (optionally with a different weight/height)
    Bmi {
        /// Weight to use instead of the saved one (e.g. "70kg", "154lbs")
        #[arg(short, long)]
        weight: Option<String>,
        /// Height to use instead of the saved one (e.g. "175cm", 5'10")
        #[arg(long)]
        height: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show your daily calorie target and how it was computed
    Calories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Walk through the goal reassessment wizard and generate a weekly meal plan
    Wizard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a guided breathing session
    Breathe {
        /// Pattern: 478 (30 seconds) or 424 (five cycles)
        #[arg(short, long, default_value = "478")]
        pattern: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Daily breathing sessions (6 per day)
    Breathing {
        #[command(subcommand)]
        command: BreathingCommands,
    },
    /// Daily water intake (8 glasses per day)
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Browse recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// List ingredients
    Ingredients {
        /// Only show this category (e.g. protein, vegetable, grain)
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage favorite recipes
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Rate a recipe from 1 to 5
    Rate {
        /// Recipe ID
        recipe_id: String,
        /// Rating (1-5)
        rating: i64,
        /// Optional review text
        #[arg(long)]
        review: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage meal plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Sign up, sign in or out of the backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update profile fields; anything omitted keeps its saved value
    Set {
        /// Age in years (13-120)
        #[arg(long)]
        age: Option<u32>,
        /// Sex: male, female or non-binary
        #[arg(long)]
        sex: Option<String>,
        /// Height (e.g. "175cm", 5'10", "5ft 10in")
        #[arg(long)]
        height: Option<String>,
        /// Weight (e.g. "70kg", "154lbs")
        #[arg(short, long)]
        weight: Option<String>,
        /// Activity: sedentary, light, moderate, very or extreme
        #[arg(short, long)]
        activity: Option<String>,
        /// Health goal (repeatable), e.g. --goal "lose weight"
        #[arg(long = "goal")]
        goals: Vec<String>,
        /// Diet style (repeatable), e.g. --diet vegan
        #[arg(long = "diet")]
        diets: Vec<String>,
        /// Goal weight (e.g. "65kg")
        #[arg(long)]
        goal_weight: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the saved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BreathingCommands {
    /// Show sessions completed for a day (default: today)
    Status {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip one session slot (1-6)
    Toggle {
        /// Slot number
        slot: usize,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Log one glass of water
    Add {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip one glass slot (1-8)
    Toggle {
        /// Slot number
        slot: usize,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show glasses logged for a day (default: today)
    Status {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Recipe filters shared by `recipe list` and `recipe search`.
#[derive(clap::Args)]
struct RecipeFilterFlags {
    /// Meal type: breakfast, lunch, dinner, snack, dessert
    #[arg(short, long)]
    meal: Option<String>,
    /// Cuisine (e.g. Mediterranean)
    #[arg(long)]
    cuisine: Option<String>,
    /// Difficulty: easy, medium, hard
    #[arg(long)]
    difficulty: Option<String>,
    /// Required diet category (repeatable)
    #[arg(long)]
    diet: Vec<String>,
    /// Allergen to exclude (repeatable)
    #[arg(long)]
    exclude_allergen: Vec<String>,
    /// Required tag (repeatable)
    #[arg(long)]
    tag: Vec<String>,
    /// Maximum prep time in minutes
    #[arg(long)]
    max_prep: Option<i64>,
    /// Maximum cook time in minutes
    #[arg(long)]
    max_cook: Option<i64>,
    /// Maximum calories per serving
    #[arg(long)]
    max_calories: Option<f64>,
    /// Minimum protein (g) per serving
    #[arg(long)]
    min_protein: Option<f64>,
}

impl From<RecipeFilterFlags> for FilterArgs {
    fn from(f: RecipeFilterFlags) -> Self {
        FilterArgs {
            meal: f.meal,
            cuisine: f.cuisine,
            difficulty: f.difficulty,
            diet: f.diet,
            exclude_allergen: f.exclude_allergen,
            tag: f.tag,
            max_prep: f.max_prep,
            max_cook: f.max_cook,
            max_calories: f.max_calories,
            min_protein: f.min_protein,
        }
    }
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes
    List {
        #[command(flatten)]
        filters: RecipeFilterFlags,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe with ingredients and steps
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search recipes by name or description
    Search {
        /// Search query
        query: String,
        #[command(flatten)]
        filters: RecipeFilterFlags,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show featured recipes
    Featured {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Add a recipe to favorites
    Add {
        /// Recipe ID
        recipe_id: String,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe from favorites
    Remove {
        /// Recipe ID
        recipe_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List favorite recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create an empty meal plan
    Create {
        /// Plan name
        name: String,
        /// First day (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        start: Option<String>,
        /// Number of days the plan covers
        #[arg(short, long, default_value = "7")]
        days: i64,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List meal plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Schedule a recipe in a meal plan
    AddRecipe {
        /// Meal plan ID
        plan_id: String,
        /// Recipe ID
        recipe_id: String,
        /// Day to schedule (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner, snack, dessert
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Servings
        #[arg(short, long, default_value = "1")]
        servings: i64,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a 7-day plan from your profile's calorie target
    Generate {
        /// Meals per day: 2, 3, 4 or 5-6
        #[arg(short, long, default_value = "3")]
        meals: String,
        /// First day (default: today)
        #[arg(long)]
        start: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Create an account
    Signup {
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in and sync anything saved while offline
    Signin {
        /// Email address
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out
    Signout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show backend and session status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = config.open_service()?;

    match cli.command {
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                age,
                sex,
                height,
                weight,
                activity,
                goals,
                diets,
                goal_weight,
                json,
            } => {
                let update = ProfileUpdate {
                    age,
                    sex,
                    height,
                    weight,
                    activity,
                    goals,
                    diets,
                    goal_weight,
                };
                cmd_profile_set(&service, update, json).await
            }
            ProfileCommands::Show { json } => cmd_profile_show(&service, json),
        },
        Commands::Bmi {
            weight,
            height,
            json,
        } => cmd_bmi(&service, weight.as_deref(), height.as_deref(), json),
        Commands::Calories { json } => cmd_calories(&service, json),
        Commands::Wizard { json } => cmd_wizard(&service, json).await,
        Commands::Breathe { pattern, json } => cmd_breathe(&service, &pattern, json).await,
        Commands::Breathing { command } => match command {
            BreathingCommands::Status { date, json } => cmd_breathing_status(&service, date, json),
            BreathingCommands::Toggle { slot, date, json } => {
                cmd_breathing_toggle(&service, slot, date, json).await
            }
        },
        Commands::Water { command } => match command {
            WaterCommands::Add { date, json } => cmd_water_add(&service, date, json).await,
            WaterCommands::Toggle { slot, date, json } => {
                cmd_water_toggle(&service, slot, date, json).await
            }
            WaterCommands::Status { date, json } => cmd_water_status(&service, date, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::List { filters, json } => {
                cmd_recipe_list(&service, filters.into(), json).await
            }
            RecipeCommands::Show { id, json } => cmd_recipe_show(&service, &id, json).await,
            RecipeCommands::Search {
                query,
                filters,
                json,
            } => cmd_recipe_search(&service, &query, filters.into(), json).await,
            RecipeCommands::Featured { json } => cmd_recipe_featured(&service, json).await,
        },
        Commands::Ingredients { category, json } => {
            cmd_ingredients(&service, category.as_deref(), json).await
        }
        Commands::Favorite { command } => match command {
            FavoriteCommands::Add {
                recipe_id,
                notes,
                json,
            } => cmd_favorite_add(&service, &recipe_id, notes.as_deref(), json).await,
            FavoriteCommands::Remove { recipe_id, json } => {
                cmd_favorite_remove(&service, &recipe_id, json).await
            }
            FavoriteCommands::List { json } => cmd_favorite_list(&service, json).await,
        },
        Commands::Rate {
            recipe_id,
            rating,
            review,
            json,
        } => cmd_rate(&service, &recipe_id, rating, review.as_deref(), json).await,
        Commands::Plan { command } => match command {
            PlanCommands::Create {
                name,
                start,
                days,
                description,
                json,
            } => cmd_plan_create(&service, &name, start, days, description, json).await,
            PlanCommands::List { json } => cmd_plan_list(&service, json).await,
            PlanCommands::AddRecipe {
                plan_id,
                recipe_id,
                date,
                meal,
                servings,
                notes,
                json,
            } => {
                let args = AddRecipeArgs {
                    plan_id,
                    recipe_id,
                    date,
                    meal,
                    servings,
                    notes,
                };
                cmd_plan_add_recipe(&service, args, json).await
            }
            PlanCommands::Generate { meals, start, json } => {
                cmd_plan_generate(&service, &meals, start, json).await
            }
        },
        Commands::Auth { command } => match command {
            AuthCommands::Signup {
                email,
                password,
                name,
                json,
            } => cmd_auth_signup(&service, &email, password, name.as_deref(), json).await,
            AuthCommands::Signin {
                email,
                password,
                json,
            } => cmd_auth_signin(&service, &email, password, json).await,
            AuthCommands::Signout { json } => cmd_auth_signout(&service, json).await,
            AuthCommands::Status { json } => cmd_auth_status(&service, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(service, port, &bind, api_key, new_api_key).await
        }
    }
}
