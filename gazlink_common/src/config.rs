//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all gazlink applications.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gazlink_common::config::{BridgeConfig, ConfigLoader, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BridgeConfig::load(Path::new("bridge.toml"))?;
//!     config.validate()?;
//!     println!("Robot: {}", config.robot.name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consts::{
    DEFAULT_CONNECT_BACKOFF_SECS, DEFAULT_CONTACT_SENSORS, DEFAULT_MAX_CONNECT_ATTEMPTS,
    DEFAULT_SHM_DIR, DEFAULT_SOCKET_DIR, DEFAULT_WORLD_NAME,
};
use crate::identity::{IdentityError, RobotIdentity};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<IdentityError> for ConfigError {
    fn from(err: IdentityError) -> Self {
        ConfigError::ValidationError(err.to_string())
    }
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// `[robot]` section: identity of the robot/world pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotSection {
    /// Robot name as defined in the simulator world file.
    pub name: String,

    /// World name as defined in the simulator world file.
    #[serde(default = "default_world_name")]
    pub world: String,

    /// Total number of joints in the robot.
    pub joints: usize,

    /// Total number of contact sensors on the robot.
    #[serde(default = "default_contact_sensors")]
    pub contact_sensors: usize,
}

fn default_world_name() -> String {
    DEFAULT_WORLD_NAME.to_string()
}

const fn default_contact_sensors() -> usize {
    DEFAULT_CONTACT_SENSORS
}

/// `[connection]` section: transport paths and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSection {
    /// Maximum socket connection attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff between connection attempts, in seconds.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Directory holding the simulator command sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Directory holding the shared memory backing files.
    #[serde(default = "default_shm_dir")]
    pub shm_dir: PathBuf,
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_CONNECT_ATTEMPTS
}

const fn default_backoff_secs() -> u64 {
    DEFAULT_CONNECT_BACKOFF_SECS
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_DIR)
}

fn default_shm_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SHM_DIR)
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            socket_dir: default_socket_dir(),
            shm_dir: default_shm_dir(),
        }
    }
}

/// Top-level bridge configuration.
///
/// # TOML Example
///
/// ```toml
/// log_level = "debug"
///
/// [robot]
/// name = "bear"
/// joints = 10
/// contact_sensors = 4
///
/// [connection]
/// max_attempts = 10
/// backoff_secs = 3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Robot identity section.
    pub robot: RobotSection,

    /// Connection section.
    #[serde(default)]
    pub connection: ConnectionSection,
}

impl BridgeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the identity parameters are
    /// invalid or the retry policy is degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity()?;
        if self.connection.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "connection.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the validated [`RobotIdentity`] from the `[robot]` section.
    pub fn identity(&self) -> Result<RobotIdentity, ConfigError> {
        Ok(RobotIdentity::with_details(
            self.robot.name.clone(),
            self.robot.world.clone(),
            self.robot.joints,
            self.robot.contact_sensors,
        )?)
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Returns `ConfigError::ValidationError` if semantic validation fails
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
