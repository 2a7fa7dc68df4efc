use crate::core::series::DateWindow;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

fn default_symbols() -> Vec<String> {
    vec!["META".to_string(), "AAPL".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: DEFAULT_YAHOO_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Instruments fetched when none are given on the command line.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    /// Issue history requests for all instruments at once.
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default = "default_true")]
    pub persist: bool,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            symbols: default_symbols(),
            start_date: None,
            end_date: None,
            concurrent: false,
            persist: true,
            data_path: None,
            providers: ProvidersConfig::default(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "xret", "xret").context("Could not determine project directories")
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Directory holding the saved series snapshot.
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        let base = match &self.data_path {
            Some(custom_path) => PathBuf::from(custom_path),
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        Ok(base.join("snapshot"))
    }

    pub fn yahoo(&self) -> YahooProviderConfig {
        self.providers.yahoo.clone().unwrap_or_default()
    }

    pub fn yahoo_timeout(&self) -> Duration {
        Duration::from_secs(self.yahoo().timeout_secs)
    }

    /// Resolves the request window. Explicit bounds win over the configured
    /// ones; "today" is taken once, here.
    pub fn window(&self, start: Option<&str>, end: Option<&str>) -> Result<DateWindow> {
        DateWindow::resolve_from_today(
            start.or(self.start_date.as_deref()),
            end.or(self.end_date.as_deref()),
        )
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
