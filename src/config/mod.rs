use crate::cli::Args;
use crate::core::error::StudioError;
use crate::core::logging::DEFAULT_LOG_LEVEL;
use crate::image::types::{AspectRatio, ImageCount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

/// Environment variables consulted for the provider credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[cfg(test)]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the credential from the process environment.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StudioError>
    where
        F: Fn(&str) -> Option<String>,
    {
        API_KEY_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .map(|v| ApiKey(v.trim().to_string()))
            .ok_or_else(|| {
                StudioError::Config(format!(
                    "{} environment variable not set",
                    API_KEY_VARS.join(" or ")
                ))
            })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_images: Option<ImageCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// Contents of `~/.gemstudio/config.yaml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    pub image: ImageDefaults,
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gemstudio")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("input_history.txt")
    }

    /// Load the user config. A missing file means all defaults.
    pub fn load() -> Result<Config, StudioError> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        Ok(Config::default())
    }

    /// Write a default config file on first run so users can find and edit it.
    pub fn write_default_if_missing() -> Result<(), StudioError> {
        let path = Self::config_path();
        if Self::write_default_at(&path)? {
            info!(path = %path.display(), "Wrote default config");
        }
        Ok(())
    }

    fn write_default_at(path: &Path) -> Result<bool, StudioError> {
        if path.exists() {
            return Ok(false);
        }
        Config::default().save_to(path)?;
        Ok(true)
    }

    pub fn load_from(path: &Path) -> Result<Config, StudioError> {
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        let config = serde_yml::from_str::<Config>(&contents)
            .map_err(|e| StudioError::Config(format!("Parse {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StudioError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }
}

/// Process-wide settings, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiKey,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub log_level: String,
    pub aspect_ratio: AspectRatio,
    pub number_of_images: ImageCount,
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn with_api_key(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            aspect_ratio: AspectRatio::default(),
            number_of_images: ImageCount::default(),
            output_dir: PathBuf::from("."),
        }
    }

    /// Merge command-line flags over the config file over built-in defaults.
    pub fn resolve(config: Config, args: &Args, api_key: ApiKey) -> Self {
        let defaults = Self::with_api_key(api_key);
        Self {
            base_url: args
                .base_url
                .clone()
                .or(config.base_url)
                .unwrap_or(defaults.base_url),
            chat_model: args
                .model
                .clone()
                .or(config.chat_model)
                .unwrap_or(defaults.chat_model),
            image_model: args
                .image_model
                .clone()
                .or(config.image_model)
                .unwrap_or(defaults.image_model),
            log_level: args
                .log_level
                .clone()
                .or(config.log_level)
                .unwrap_or(defaults.log_level),
            aspect_ratio: config.image.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            number_of_images: config
                .image
                .number_of_images
                .unwrap_or(defaults.number_of_images),
            output_dir: config.image.output_dir.unwrap_or(defaults.output_dir),
            api_key: defaults.api_key,
        }
    }
}
