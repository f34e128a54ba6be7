mod auth;
mod helpers;
mod plan;
mod profile;
mod recipe;
mod wellness;
mod wizard;

pub(crate) use auth::{cmd_auth_signin, cmd_auth_signout, cmd_auth_signup, cmd_auth_status};
pub(crate) use plan::{
    AddRecipeArgs, cmd_plan_add_recipe, cmd_plan_create, cmd_plan_generate, cmd_plan_list,
};
pub(crate) use profile::{ProfileUpdate, cmd_bmi, cmd_calories, cmd_profile_set, cmd_profile_show};
pub(crate) use recipe::{
    FilterArgs, cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove, cmd_ingredients,
    cmd_rate, cmd_recipe_featured, cmd_recipe_list, cmd_recipe_search, cmd_recipe_show,
};
pub(crate) use wellness::{
    cmd_breathe, cmd_breathing_status, cmd_breathing_toggle, cmd_water_add, cmd_water_status,
    cmd_water_toggle,
};
pub(crate) use wizard::cmd_wizard;
