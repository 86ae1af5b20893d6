//! Repository and engine configuration file support.
//!
//! Reads `repository.toml`, which selects the storage backend and carries
//! the dispatcher's workday defaults for the schedule optimizer.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;

use super::repository::RepositoryError;
use crate::services::optimizer::DayConstraints;

/// Repository configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// Workday defaults used when the caller supplies no constraints of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_work_start")]
    pub work_start: String,
    #[serde(default = "default_work_end")]
    pub work_end: String,
    #[serde(default = "default_travel_buffer_minutes")]
    pub travel_buffer_minutes: u32,
    #[serde(default = "default_travel_speed_kmh")]
    pub travel_speed_kmh: f64,
}

fn default_work_start() -> String {
    "08:00".to_string()
}

fn default_work_end() -> String {
    "18:00".to_string()
}

fn default_travel_buffer_minutes() -> u32 {
    15
}

fn default_travel_speed_kmh() -> f64 {
    40.0
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            work_start: default_work_start(),
            work_end: default_work_end(),
            travel_buffer_minutes: default_travel_buffer_minutes(),
            travel_speed_kmh: default_travel_speed_kmh(),
        }
    }
}

impl EngineSettings {
    /// Materialize the workday defaults as optimizer constraints.
    pub fn day_constraints(&self) -> Result<DayConstraints, RepositoryError> {
        let work_start = parse_time(&self.work_start)?;
        let work_end = parse_time(&self.work_end)?;
        Ok(DayConstraints {
            work_start,
            work_end,
            travel_buffer_minutes: self.travel_buffer_minutes,
            travel_speed_kmh: self.travel_speed_kmh,
        })
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, RepositoryError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| {
            RepositoryError::configuration(format!("Invalid time of day {:?}: {}", value, e))
        })
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: RepositoryConfig = toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches for `repository.toml` in:
    /// 1. Current directory
    /// 2. `config/` directory
    /// 3. Parent directory
    pub fn from_default_locations() -> Result<Self, RepositoryError> {
        for candidate in Self::default_locations() {
            if candidate.exists() {
                return Self::from_file(candidate);
            }
        }
        Err(RepositoryError::configuration(
            "repository.toml not found in any default location",
        ))
    }

    fn default_locations() -> Vec<PathBuf> {
        vec![
            PathBuf::from("repository.toml"),
            PathBuf::from("config/repository.toml"),
            PathBuf::from("../repository.toml"),
        ]
    }
}
