pub mod chart;
pub mod config;
pub mod filter;
pub mod loader;
pub mod models;
pub mod parse;
pub mod prefs;
pub mod stats;
pub mod store;
pub mod table;

/// Application name for XDG paths
pub const APP_NAME: &str = "animelog";
