//! Optional user configuration loaded from `~/.callstats.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StatsError};

pub const DEFAULT_ENDPOINT: &str = "https://api.data.metro.tokyo.lg.jp/v1/Covid19CallCenter";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data source URL, queried with `from`, `till` and `limit`
    pub endpoint: String,
    /// Maximum number of records requested per fetch
    pub limit: u32,
    pub timeout_seconds: u64,
    /// Years offered by the year selector
    pub years: Vec<String>,
    pub default_year: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limit: 1000,
            timeout_seconds: 30,
            years: vec!["2020".to_string(), "2021".to_string(), "2022".to_string()],
            default_year: "2020".to_string(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".callstats.toml"))
            .ok_or_else(|| StatsError::Config("Could not find home directory".to_string()))
    }

    /// Load the user's configuration, or defaults when no file exists.
    pub fn load() -> Result<Config> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| StatsError::Config(format!("Failed to parse config file: {}", e)))?;

        if config.limit == 0 {
            return Err(StatsError::Config("limit must be greater than zero".to_string()));
        }
        Ok(config)
    }
}
