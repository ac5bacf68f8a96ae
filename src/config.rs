//! Service configuration.
//!
//! Loaded from a TOML file with sane defaults for every field, so a bare
//! `acuimon.toml` — or none at all — still produces a working run against
//! the production API. Environment variables override the file for the
//! two values that differ between deployments.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Configuration structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub output: OutputConfig,
    pub wells: WellsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the hydromet platform.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the chart artifacts are written into. Created if absent;
    /// re-running overwrites prior artifacts.
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WellsConfig {
    /// Wells that get individual history and forecast charts. The map of
    /// classified wells always covers the whole population.
    pub featured: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> ApiConfig {
        ApiConfig {
            base_url: "https://hydromet4api.hidrofuturo.cl".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> OutputConfig {
        OutputConfig {
            dir: "outputs".to_string(),
        }
    }
}

impl Default for WellsConfig {
    fn default() -> WellsConfig {
        WellsConfig {
            featured: vec![
                "Pozo_104_E809_N774".to_string(), // L104
                "Pozo_3_E797_N645".to_string(),   // L3
                "Pozo_16_E752_N698".to_string(),  // L16
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            api: ApiConfig::default(),
            output: OutputConfig::default(),
            wells: WellsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file. A missing file yields the
    /// defaults; a present but invalid file is an error — better to stop
    /// than to run against the wrong endpoint.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config = if path.exists() {
            let text =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides, applied after the file.
    fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("ACUIMON_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(dir) = std::env::var("ACUIMON_OUTPUT_DIR") {
            self.output.dir = dir;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config file error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
