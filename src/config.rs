//! Configuration loading
//!
//! Reads an optional `config.toml` stored next to the database. Every field
//! has a default, so a missing file is the same as an empty one.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub resolutions: ResolutionConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Rules for the shared date span of regular tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Length of a freshly started cycle when no end date is given.
    #[serde(default = "default_length_days")]
    pub default_length_days: u32,

    /// Reject new tasks whose end date differs from the active cycle's end.
    #[serde(default = "default_true")]
    pub enforce_end_date: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            default_length_days: default_length_days(),
            enforce_end_date: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Year resolutions are tracked for. Defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default = "default_lock_month")]
    pub lock_month: u32,

    #[serde(default = "default_lock_day")]
    pub lock_day: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            year: None,
            lock_month: default_lock_month(),
            lock_day: default_lock_day(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// How many sprints the efficiency chart shows.
    #[serde(default = "default_recent_sprints")]
    pub recent_sprints: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            recent_sprints: default_recent_sprints(),
        }
    }
}

fn default_length_days() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_lock_month() -> u32 {
    1
}

fn default_lock_day() -> u32 {
    3
}

fn default_recent_sprints() -> usize {
    7
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads the configuration file, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let s = fs::read_to_string(&path)?;
        let config = Self::from_toml(&s)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Returns the directory taskpro keeps its files in.
///
/// `~/.local/share/taskpro` on Linux, `./` if no data directory is known.
pub fn data_dir() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("taskpro");
    if !p.exists() {
        let _ = fs::create_dir_all(&p);
    }
    p
}

/// Returns the path to the SQLite database.
///
/// The path is determined in the following order:
/// 1. `TASKPRO_DB` environment variable.
/// 2. `taskpro.db` inside [`data_dir`].
pub fn db_path() -> PathBuf {
    std::env::var("TASKPRO_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = data_dir();
        p.push("taskpro.db");
        p
    })
}

/// Returns the path to `config.toml`.
///
/// `TASKPRO_CONFIG` wins; otherwise the file sits next to the database.
pub fn config_path() -> PathBuf {
    std::env::var("TASKPRO_CONFIG").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = db_path();
        p.pop();
        p.push("config.toml");
        p
    })
}
