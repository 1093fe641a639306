use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::stats::streak::STREAK_MIN_MINUTES;

/// Application configuration loaded from TOML config file.
/// All fields have defaults and the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the JSON documents (`anime.json`, `history.json`, ...).
    pub data_dir: Option<PathBuf>,
    /// Static host serving the same documents. Takes precedence over `data_dir`.
    pub base_url: Option<String>,
    /// Custom cache database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Minutes a day needs to count toward a watching streak.
    pub streak_min_minutes: f64,
    /// Timeout for each HTTP request.
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            base_url: None,
            db_path: None,
            streak_min_minutes: STREAK_MIN_MINUTES,
            http_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/animelog/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default cache database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("animelog.db")
    } else {
        PathBuf::from("animelog.db")
    }
}
