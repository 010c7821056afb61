use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const PAGE_SIZE: u32 = 50;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 15;
pub const TOKEN_EXPIRY_WARNING_SECS: i64 = 300; // 5 minutes
pub const CHANGE_FEED_CAPACITY: usize = 64;
pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;

pub const ACCESS_TOKEN_ENV: &str = "REELMARK_ACCESS_TOKEN";
pub const OWNER_ENV: &str = "REELMARK_OWNER";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelmark")
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

pub fn get_default_database_path() -> PathBuf {
    get_config_dir().join("annotations.db")
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub request_timeout_seconds: u64,
    pub database_path: Option<PathBuf>,
    pub show_empty_playlists: bool,
    pub default_playback_speed: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            page_size: PAGE_SIZE,
            request_timeout_seconds: REQUEST_TIMEOUT_SECONDS,
            database_path: None,
            show_empty_playlists: false,
            default_playback_speed: DEFAULT_PLAYBACK_SPEED,
        }
    }
}

impl AppConfig {
    /// Load from the default location, falling back to defaults when no file exists.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&get_config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Invalid config at {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.page_size == 0 || self.page_size > PAGE_SIZE {
            return Err(AppError::Config(format!(
                "page_size must be between 1 and {}",
                PAGE_SIZE
            )));
        }
        if self.default_playback_speed.is_nan() || self.default_playback_speed <= 0.0 {
            return Err(AppError::Config(
                "default_playback_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(get_default_database_path)
    }
}
