//! Configuration file and environment overrides.
//!
//! Settings live in `~/.station-gantt/config.json`. Every field has a default,
//! so a missing file or a partial one is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GanttError, Result};

pub const API_URL_ENV: &str = "STATION_API_URL";
pub const API_TOKEN_ENV: &str = "STATION_API_TOKEN";

/// Calendar settings written into the project header of the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCalendar {
    #[serde(rename = "calendar")]
    pub name: String,
    pub hours_per_day: u32,
    pub days_per_week: u32,
    pub days_per_month: u32,
}

impl Default for ProjectCalendar {
    fn default() -> Self {
        ProjectCalendar {
            name: "general".to_string(),
            hours_per_day: 24,
            days_per_week: 5,
            days_per_month: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub tasks_path: String,
    pub login_path: String,
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub calendar: ProjectCalendar,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: "http://localhost:8080".to_string(),
            tasks_path: "/api/gantt/tasks".to_string(),
            login_path: "/api/login".to_string(),
            timeout_secs: 30,
            calendar: ProjectCalendar::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| GanttError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| GanttError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
    }

    /// Join the base URL with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// `$HOME/.station-gantt`, falling back to the current directory.
pub fn default_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".station-gantt")
}
