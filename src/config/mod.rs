use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::services::fit_model::{FitConfig, DEFAULT_XI};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9001;
pub const DEFAULT_RESULTS_PATH: &str = "data/results.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub results_path: PathBuf,
    pub fit_enabled: bool,
    pub decay_xi: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            fit_enabled: true,
            decay_xi: DEFAULT_XI,
        }
    }
}

impl Settings {
    /// Reads `GOALMODEL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let decay_xi = parse_or(&lookup, "GOALMODEL_DECAY_XI", defaults.decay_xi)?;
        if !(decay_xi.is_finite() && decay_xi >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "GOALMODEL_DECAY_XI",
                value: decay_xi.to_string(),
            });
        }

        Ok(Self {
            host: lookup("GOALMODEL_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "GOALMODEL_PORT", defaults.port)?,
            results_path: lookup("GOALMODEL_RESULTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_path),
            fit_enabled: match lookup("GOALMODEL_FIT_ENABLED") {
                Some(value) => parse_flag("GOALMODEL_FIT_ENABLED", &value)?,
                None => defaults.fit_enabled,
            },
            decay_xi,
        })
    }

    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            xi: self.decay_xi,
            ..FitConfig::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
