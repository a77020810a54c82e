use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND: &str = "_SWS_SAVEALLSELWITHTIME";

pub const POLL_MS_ENV: &str = "REAPER_PANEL_POLL_MS";
pub const DEFAULT_COMMAND_ENV: &str = "REAPER_PANEL_DEFAULT_COMMAND";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got {value:?}")]
    InvalidPollInterval { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    EmptyCommand { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Command id dispatched by the panel's button.
    pub default_command: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_command: DEFAULT_COMMAND.to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(POLL_MS_ENV) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidPollInterval {
                    var: POLL_MS_ENV,
                    value: raw.clone(),
                })?;
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(DEFAULT_COMMAND_ENV) {
            let cmd = raw.trim();
            if cmd.is_empty() {
                return Err(ConfigError::EmptyCommand {
                    var: DEFAULT_COMMAND_ENV,
                });
            }
            config.default_command = cmd.to_string();
        }

        Ok(config)
    }
}
