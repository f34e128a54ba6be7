pub mod breathing;
pub mod catalog;
pub mod db;
pub mod models;
pub mod nutrition;
pub mod planner;
pub mod profile;
pub mod remote;
pub mod service;
pub mod wizard;
