//! Engine configuration, stored as JSON5.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../package-content/tide_config.json5");

/// Largest accepted `FlowSearchRadius`.
pub const MAX_SEARCH_RADIUS: u32 = 16;

/// Errors raised while loading or checking a [`LiquidConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or the default could not be written.
    #[error("config file {path}: {source}")]
    Io {
        /// The file involved.
        path: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON5 or has wrongly typed values.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json5::Error),
    /// A value is outside its allowed range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Tunables for the liquid engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LiquidConfig {
    /// Whether a flowing cell between two sources becomes a source.
    pub infinite_source_enabled: bool,
    /// Seconds between ticks.
    pub tick_interval_seconds: f64,
    /// Dirty positions resolved per tick.
    pub max_updates_per_tick: usize,
    /// Upper bound on pending dirty positions.
    pub max_queue_size: usize,
    /// Radius of the downhill search.
    pub flow_search_radius: u32,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            infinite_source_enabled: true,
            tick_interval_seconds: 0.25,
            max_updates_per_tick: 200,
            max_queue_size: 50_000,
            flow_search_radius: 4,
        }
    }
}

impl LiquidConfig {
    /// Reads the config at `path`, or writes the bundled default there and
    /// returns the defaults if the file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };

        if path.exists() {
            let text = fs::read_to_string(path).map_err(io_err)?;
            let config = Self::from_json5(&text)?;
            log::debug!("Loaded liquid config from {}", path.display());
            Ok(config)
        } else {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            fs::write(path, DEFAULT_CONFIG).map_err(io_err)?;
            log::info!("Wrote default liquid config to {}", path.display());
            Ok(Self::default())
        }
    }

    /// Parses and validates a JSON5 document. Missing keys take their defaults.
    pub fn from_json5(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_interval_seconds.is_finite() || self.tick_interval_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "TickIntervalSeconds must be a positive number",
            ));
        }
        if self.max_updates_per_tick == 0 {
            return Err(ConfigError::Invalid("MaxUpdatesPerTick must be at least 1"));
        }
        if self.max_queue_size < self.max_updates_per_tick {
            return Err(ConfigError::Invalid(
                "MaxQueueSize must be at least MaxUpdatesPerTick",
            ));
        }
        if self.flow_search_radius > MAX_SEARCH_RADIUS {
            return Err(ConfigError::Invalid("FlowSearchRadius must be at most 16"));
        }
        Ok(())
    }

    /// The tick interval as a [`Duration`].
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_seconds)
    }
}
