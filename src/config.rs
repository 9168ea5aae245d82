//! TOML configuration for runview.
//!
//! Every section has defaults, so an empty file (or no file) is valid.
//! Lookup order: explicit path, `RUNVIEW_CONFIG`, `./runview.toml`,
//! compiled-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compare::{CompareMode, CompareOptions, DEFAULT_SENTINEL};

pub const CONFIG_ENV: &str = "RUNVIEW_CONFIG";
pub const LOCAL_CONFIG: &str = "runview.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration file.
    ///
    /// An explicitly requested file must load; the fallbacks only warn.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "RUNVIEW_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Static viewer front-end, served under `/www` when set.
    pub www_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            www_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Where run files are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Local directory of `*.json` run files.
    pub dir: PathBuf,
    /// HTTP index listing; takes precedence over `dir` when set.
    pub index_url: Option<String>,
    pub fetch_timeout_sec: u64,
}

impl ResultsConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_sec)
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            index_url: None,
            fetch_timeout_sec: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub mode: CompareMode,
    /// Placeholder for fields of a test missing from one run.
    pub sentinel: String,
}

impl CompareConfig {
    pub fn options(&self) -> CompareOptions {
        CompareOptions {
            mode: self.mode,
            sentinel: self.sentinel.clone(),
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            mode: CompareMode::StatusGated,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
