use log::{info, LevelFilter};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::chat::LoaderOptions;

pub const DEFAULT_BASE_URL: &str = "https://qa.corider.in/assignment";
pub const DEFAULT_LOG_FILE: &str = "tripchat.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL '{0}': must be an absolute http(s) URL")]
    InvalidBaseUrl(String),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// On-disk configuration, every field optional
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub start_page: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub start_page: u32,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        let loader = LoaderOptions::default();
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            start_page: 0,
            request_timeout: loader.timeout,
            max_retries: loader.max_retries,
            backoff_base: loader.backoff_base,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Layer defaults, then the config file, then command line values
    pub fn resolve(file: Option<ConfigFile>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let defaults = Config::default();

        let base_url = overrides
            .base_url
            .clone()
            .or(file.base_url)
            .unwrap_or(defaults.base_url);
        validate_base_url(&base_url)?;

        let log_level = match overrides.log_level.clone().or(file.log_level) {
            Some(level) => level
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::InvalidLogLevel(level))?,
            None => defaults.log_level,
        };

        Ok(Config {
            base_url,
            start_page: overrides.start_page.or(file.start_page).unwrap_or(defaults.start_page),
            request_timeout: overrides
                .request_timeout_secs
                .or(file.request_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: overrides.max_retries.or(file.max_retries).unwrap_or(defaults.max_retries),
            backoff_base: file
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
            log_file: overrides.log_file.clone().or(file.log_file).unwrap_or(defaults.log_file),
            log_level,
        })
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions::default()
            .with_timeout(self.request_timeout)
            .with_max_retries(self.max_retries)
            .with_backoff_base(self.backoff_base)
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    match Url::parse(base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(ConfigError::InvalidBaseUrl(base_url.to_string())),
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join("tripchat").join("config.json"))
}

/// Read the config file at `path`, `None` if it does not exist
pub fn load_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let file: ConfigFile = serde_json::from_str(&contents)?;
    info!("Loaded configuration from {}", path.display());
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = ConfigFile {
            base_url: Some("http://file.example".to_string()),
            start_page: Some(2),
            max_retries: Some(5),
            backoff_base_ms: Some(10),
            log_level: Some("warn".to_string()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            base_url: Some("http://cli.example".to_string()),
            log_level: Some("DEBUG".to_string()),
            ..Default::default()
        };

        let config = Config::resolve(Some(file), &overrides).unwrap();
        assert_eq!(config.base_url, "http://cli.example");
        assert_eq!(config.start_page, 2);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base, Duration::from_millis(10));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_url = ConfigOverrides {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(None, &bad_url),
            Err(ConfigError::InvalidBaseUrl(_))
        ));

        let ftp = ConfigOverrides {
            base_url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(Config::resolve(None, &ftp), Err(ConfigError::InvalidBaseUrl(_))));

        let bad_level = ConfigOverrides {
            log_level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(None, &bad_level),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_loader_options_follow_config() {
        let config = Config {
            max_retries: 0,
            request_timeout: Duration::from_secs(3),
            ..Config::default()
        };
        let options = config.loader_options();
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_config_file_is_none() {
        let path = Path::new("/definitely/not/here/tripchat.json");
        assert!(load_config_file(path).unwrap().is_none());
    }
}
