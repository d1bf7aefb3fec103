//! Configuration loading for Tether.
//!
//! ```toml
//! [snapshot]
//! enabled = true
//! max_history = 10
//! history_char_budget = 6000
//! max_summary_display = 1200
//! nudge_after_read_turns = 5
//!
//! [access]
//! enforce_read_before_write = true
//! ```
//!
//! Every field is optional. The label and summary caps are not configurable.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tether_context::SnapshotLimits;
use thiserror::Error;

/// Read-only tool batches in a row before the session suggests a restore.
pub const DEFAULT_NUDGE_AFTER_READ_TURNS: usize = 5;

// Default value function for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value {field} = {value}: must be positive")]
    Invalid { field: &'static str, value: i64 },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TetherConfig {
    pub snapshot: Option<SnapshotConfig>,
    pub access: Option<AccessConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotConfig {
    /// Register the snapshot tool and inject history into the system prompt.
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub max_history: Option<i64>,
    pub history_char_budget: Option<i64>,
    pub max_summary_display: Option<i64>,
    pub nudge_after_read_turns: Option<i64>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history: None,
            history_char_budget: None,
            max_summary_display: None,
            nudge_after_read_turns: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessConfig {
    /// Refuse writes to existing files that were not read first.
    #[serde(default = "default_true")]
    pub enforce_read_before_write: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            enforce_read_before_write: true,
        }
    }
}

/// Validated settings a session is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub snapshot_enabled: bool,
    pub limits: SnapshotLimits,
    pub nudge_after_read_turns: usize,
    pub enforce_read_before_write: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            snapshot_enabled: true,
            limits: SnapshotLimits::default(),
            nudge_after_read_turns: DEFAULT_NUDGE_AFTER_READ_TURNS,
            enforce_read_before_write: true,
        }
    }
}

impl TetherConfig {
    /// Load `~/.tether/config.toml`. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read config");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to parse config");
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Apply configured overrides on top of the defaults.
    pub fn resolve(&self) -> Result<SessionSettings, ConfigError> {
        let mut settings = SessionSettings::default();

        if let Some(snapshot) = &self.snapshot {
            settings.snapshot_enabled = snapshot.enabled;
            if let Some(value) = snapshot.max_history {
                settings.limits.max_history = positive("snapshot.max_history", value)?;
            }
            if let Some(value) = snapshot.history_char_budget {
                settings.limits.history_char_budget =
                    positive("snapshot.history_char_budget", value)?;
            }
            if let Some(value) = snapshot.max_summary_display {
                settings.limits.max_summary_display =
                    positive("snapshot.max_summary_display", value)?;
            }
            if let Some(value) = snapshot.nudge_after_read_turns {
                settings.nudge_after_read_turns =
                    positive("snapshot.nudge_after_read_turns", value)?;
            }
        }
        if let Some(access) = &self.access {
            settings.enforce_read_before_write = access.enforce_read_before_write;
        }

        Ok(settings)
    }
}

fn positive(field: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or(ConfigError::Invalid { field, value })
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tether").join("config.toml"))
}
