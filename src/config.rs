//! Configuration management for connect-sim
//!
//! Configuration is read from YAML, then the `FORDSIM_*` environment variables
//! are layered on top. Every section falls back to its defaults, so an empty
//! file (or no file at all) yields a working simulator.

use crate::error::{Result, SimError};
use crate::schedule::MatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for every configured lifetime (ten years)
pub const MAX_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing and matching behavior of the simulation engine
    pub simulator: SimulatorConfig,

    /// Client credentials and pre-shared secrets
    pub auth: AuthConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Simulation engine timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Lifetime of issued access tokens
    pub access_token_timeout_secs: u64,

    /// Lifetime of the authorization code from startup
    pub code_timeout_secs: u64,

    /// Age after which a command can no longer be polled
    pub command_timeout_secs: u64,

    /// How long a new command reports PENDINGRESPONSE
    pub command_pending_ms: u64,

    /// Which catalog entry wins when several chargers are near the vehicle
    pub schedule_match: MatchPolicy,
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Prefix a valid Application-Id header must start with
    pub application_id: String,

    /// Prefix a valid client_id must start with
    pub client_id_prefix: String,

    /// Prefix a valid client_secret must start with
    pub client_secret_prefix: String,

    /// Fixed authorization code; generated at startup when absent
    pub code: Option<String>,

    /// Access token issued at startup in addition to OAuth-issued ones
    pub token: Option<String>,

    /// Reject vehicle API calls lacking a valid Application-Id
    pub require_application_id: bool,
}

/// Web server binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,

    /// Directory holding `full-image.png` and `thumbnail.png`
    pub images_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Log file path (or directory) for the rolling appender
    pub file: String,

    /// Also log to stdout when file logging is active
    pub console_output: bool,

    /// Emit JSON lines instead of plain text
    pub json_format: bool,

    /// Number of rotated files to keep
    pub backup_count: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            access_token_timeout_secs: 1200,
            code_timeout_secs: 1200,
            command_timeout_secs: 120,
            command_pending_ms: 4000,
            schedule_match: MatchPolicy::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            application_id: "afdc085b".to_string(),
            client_id_prefix: "3".to_string(),
            client_secret_prefix: "T".to_string(),
            code: None,
            token: None,
            require_application_id: true,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            images_dir: "images".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/var/log/connect-sim/connect-sim.log".to_string(),
            console_output: true,
            json_format: false,
            backup_count: 5,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = ["connect_sim.yaml", "/etc/connect-sim/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply `FORDSIM_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `FORDSIM_*` overrides using `lookup` to read variables
    ///
    /// `FORDSIM_TIMEOUT` sets both the access-token and the authorization-code
    /// lifetime. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("FORDSIM_HTTPPORT") {
            self.web.port = parse_number("FORDSIM_HTTPPORT", &port)?;
        }
        if let Some(code) = get("FORDSIM_CODE") {
            self.auth.code = Some(code);
        }
        if let Some(token) = get("FORDSIM_TOKEN") {
            self.auth.token = Some(token);
        }
        if let Some(timeout) = get("FORDSIM_TIMEOUT") {
            let secs: u64 = parse_number("FORDSIM_TIMEOUT", &timeout)?;
            self.simulator.access_token_timeout_secs = secs;
            self.simulator.code_timeout_secs = secs;
        }
        if let Some(timeout) = get("FORDSIM_CMDTIMEOUT") {
            self.simulator.command_timeout_secs = parse_number("FORDSIM_CMDTIMEOUT", &timeout)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulator;
        for (field, secs) in [
            ("simulator.access_token_timeout_secs", sim.access_token_timeout_secs),
            ("simulator.code_timeout_secs", sim.code_timeout_secs),
            ("simulator.command_timeout_secs", sim.command_timeout_secs),
        ] {
            if secs == 0 {
                return Err(SimError::validation(field, "Must be greater than 0"));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(SimError::validation(
                    field,
                    format!("Must be at most {} seconds", MAX_TIMEOUT_SECS),
                ));
            }
        }

        if sim.command_pending_ms > MAX_TIMEOUT_SECS * 1000 {
            return Err(SimError::validation(
                "simulator.command_pending_ms",
                format!("Must be at most {} milliseconds", MAX_TIMEOUT_SECS * 1000),
            ));
        }

        if self.web.port == 0 {
            return Err(SimError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        if self.auth.application_id.is_empty() {
            return Err(SimError::validation(
                "auth.application_id",
                "Application id cannot be empty",
            ));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SimError::validation(key, format!("'{}' is not a valid number", raw)))
}
