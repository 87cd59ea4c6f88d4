use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::schedule::{OnboardingCalendar, DEFAULT_MAX_SEARCH_DAYS};

pub const ENV_BIND: &str = "SCHEDULER_BIND";
pub const ENV_PORT: &str = "SCHEDULER_PORT";
pub const ENV_MAX_SEARCH_DAYS: &str = "SCHEDULER_MAX_SEARCH_DAYS";
pub const ENV_CALENDAR: &str = "SCHEDULER_CALENDAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_search_days: u32,
    pub calendar_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
            calendar_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values keep their
    /// default and are logged.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(bind) = value(ENV_BIND) {
            config.bind_address = bind;
        }
        if let Some(raw) = value(ENV_PORT) {
            match raw.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(key = ENV_PORT, value = %raw, "ignoring invalid port"),
            }
        }
        if let Some(raw) = value(ENV_MAX_SEARCH_DAYS) {
            match raw.parse::<u32>() {
                Ok(days) if days > 0 => config.max_search_days = days,
                _ => warn!(key = ENV_MAX_SEARCH_DAYS, value = %raw, "ignoring invalid search limit"),
            }
        }
        config.calendar_file = value(ENV_CALENDAR).map(PathBuf::from);
        config
    }

    /// The office-hours policy: the configured JSON file, or the built-in one
    pub fn calendar(&self) -> Result<OnboardingCalendar> {
        match &self.calendar_file {
            Some(path) => OnboardingCalendar::from_json_file(path),
            None => Ok(OnboardingCalendar::default()),
        }
    }
}
