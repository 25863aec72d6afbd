//! # Host Configuration
//!
//! Loaded once at startup from a TOML file. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! strategy = "spinning"
//! timing = "synced"
//! max_width = 1024
//! max_height = 768
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ABSOLUTE_MAX_HEIGHT, ABSOLUTE_MAX_WIDTH, DEFAULT_INPUT_CAPACITY, DEFAULT_MAX_HEIGHT,
    DEFAULT_MAX_WIDTH, ENGINE_THREAD_NAME,
};

/// How a parked side waits for its turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SyncStrategy {
    /// Sleep on a condition variable. Cheap on CPU, slower to wake.
    #[default]
    Blocking = 0,
    /// Busy-wait on an atomic flag. Burns a core, wakes in nanoseconds.
    Spinning = 1,
}

impl SyncStrategy {
    /// Decodes the `repr(u8)` value. Unknown values decode as `None`.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Blocking),
            1 => Some(Self::Spinning),
            _ => None,
        }
    }

    /// The other strategy.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Blocking => Self::Spinning,
            Self::Spinning => Self::Blocking,
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => f.write_str("blocking"),
            Self::Spinning => f.write_str("spinning"),
        }
    }
}

/// Whose clock paces frame delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// The host clock. One shared buffer, every completed frame is presented.
    Synced,
    /// The engine's own timing. Double buffered, the host may see duplicates.
    #[default]
    Unsynced,
}

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has fields of the wrong type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but make no sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for one engine session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TandemConfig {
    /// Initial handoff strategy.
    pub strategy: SyncStrategy,
    /// Frame timing mode.
    pub timing: TimingMode,
    /// Largest frame width the engine may request.
    pub max_width: u32,
    /// Largest frame height the engine may request.
    pub max_height: u32,
    /// Capacity of the host -> engine input queue.
    pub input_capacity: usize,
    /// Name given to the engine thread.
    pub engine_thread_name: String,
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            strategy: SyncStrategy::Blocking,
            timing: TimingMode::Unsynced,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            input_capacity: DEFAULT_INPUT_CAPACITY,
            engine_thread_name: ENGINE_THREAD_NAME.to_owned(),
        }
    }
}

impl TandemConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`TandemConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_width > ABSOLUTE_MAX_WIDTH {
            return Err(ConfigError::Invalid(format!(
                "max_width must be in 1..={ABSOLUTE_MAX_WIDTH}, got {}",
                self.max_width
            )));
        }
        if self.max_height == 0 || self.max_height > ABSOLUTE_MAX_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "max_height must be in 1..={ABSOLUTE_MAX_HEIGHT}, got {}",
                self.max_height
            )));
        }
        if self.input_capacity == 0 {
            return Err(ConfigError::Invalid("input_capacity must be non-zero".to_owned()));
        }
        if self.engine_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid("engine_thread_name must not be empty".to_owned()));
        }
        Ok(())
    }
}
