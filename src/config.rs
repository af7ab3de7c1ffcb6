// Simulation Configuration Module
// Handles the YAML settings file and validation of the run limits.

use crate::gateway::FaultConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bot configuration as read from the settings file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub faults: FaultsConfig,
    /// Seed for the random source; a fresh one is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the limits and return the bounds for a run.
    ///
    /// Nothing touches the gateway before this succeeds.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        let limits = &self.limits;
        if limits.number_of_users <= 0 {
            return Err(ConfigError::Validation(format!(
                "number_of_users must be positive, got {}",
                limits.number_of_users
            )));
        }
        if limits.max_posts_per_user < 0 {
            return Err(ConfigError::Validation(format!(
                "max_posts_per_user must not be negative, got {}",
                limits.max_posts_per_user
            )));
        }
        if limits.max_likes_per_user < 0 {
            return Err(ConfigError::Validation(format!(
                "max_likes_per_user must not be negative, got {}",
                limits.max_likes_per_user
            )));
        }
        for (name, rate) in [
            (
                "registration_failure_rate",
                self.faults.registration_failure_rate,
            ),
            ("publish_failure_rate", self.faults.publish_failure_rate),
            ("like_failure_rate", self.faults.like_failure_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        if !self.settings.offline_mode && self.settings.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "base_url is required unless offline_mode is set".to_string(),
            ));
        }

        Ok(SimulationConfig {
            user_count: limits.number_of_users as usize,
            max_posts_per_user: limits.max_posts_per_user as usize,
            max_likes_per_user: limits.max_likes_per_user as usize,
        })
    }

    /// Per-call timeout for gateway requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.request_timeout_ms)
    }

    /// Create a fault injection config for the offline gateway
    pub fn fault_config(&self) -> FaultConfig {
        FaultConfig::new()
            .with_registration_failure_rate(self.faults.registration_failure_rate)
            .with_publish_failure_rate(self.faults.publish_failure_rate)
            .with_like_failure_rate(self.faults.like_failure_rate)
    }
}

/// Validated bounds for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub user_count: usize,
    pub max_posts_per_user: usize,
    pub max_likes_per_user: usize,
}

impl SimulationConfig {
    pub fn new(user_count: usize, max_posts_per_user: usize, max_likes_per_user: usize) -> Self {
        Self {
            user_count,
            max_posts_per_user,
            max_likes_per_user,
        }
    }
}

/// Service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Use the in-memory gateway instead of calling the service
    #[serde(default)]
    pub offline_mode: bool,
    /// Base URL of the service API, including the trailing slash
    #[serde(default)]
    pub base_url: String,
    /// Password shared by all synthetic users
    #[serde(default = "default_password")]
    pub password: String,
    /// Email sent with every sign-up
    #[serde(default = "default_email")]
    pub email: String,
    /// Milliseconds before a gateway call is treated as failed
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_password() -> String {
    "socialsim-password".to_string()
}

fn default_email() -> String {
    "socialsim@example.com".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            offline_mode: false,
            base_url: String::new(),
            password: default_password(),
            email: default_email(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Run limits. Signed so that negative values can be reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_number_of_users")]
    pub number_of_users: i64,
    #[serde(default = "default_max_posts")]
    pub max_posts_per_user: i64,
    #[serde(default = "default_max_likes")]
    pub max_likes_per_user: i64,
}

fn default_number_of_users() -> i64 {
    5
}

fn default_max_posts() -> i64 {
    3
}

fn default_max_likes() -> i64 {
    4
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            number_of_users: default_number_of_users(),
            max_posts_per_user: default_max_posts(),
            max_likes_per_user: default_max_likes(),
        }
    }
}

/// Post content configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentConfig {
    /// Path to a JSON dictionary (word -> definition). Embedded one if unset.
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
}

/// Fault injection rates for the offline gateway (0.0-1.0)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FaultsConfig {
    #[serde(default)]
    pub registration_failure_rate: f64,
    #[serde(default)]
    pub publish_failure_rate: f64,
    #[serde(default)]
    pub like_failure_rate: f64,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}
