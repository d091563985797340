use std::env;
use std::time::Duration;

use exam_core::CountdownConfig;
use exam_core::timer::DEFAULT_WARNING_AT_SECS;

/// Namespace prefix for locally stored keys.
pub const DEFAULT_STORAGE_PREFIX: &str = "matura_";

/// Runtime settings for exam sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often in-progress answers are written to the draft cache.
    pub autosave_interval: Duration,
    /// Wall time per countdown tick.
    pub tick_interval: Duration,
    /// Remaining seconds at which the "time is running out" notice fires.
    pub warning_at_secs: u64,
    pub storage_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            warning_at_secs: DEFAULT_WARNING_AT_SECS,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `EXAM_AUTOSAVE_SECS`, `EXAM_WARNING_AT_SECS` and
    /// `EXAM_STORAGE_PREFIX`. Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            autosave_interval: env::var("EXAM_AUTOSAVE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(default.autosave_interval, Duration::from_secs),
            tick_interval: default.tick_interval,
            warning_at_secs: env::var("EXAM_WARNING_AT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.warning_at_secs),
            storage_prefix: env::var("EXAM_STORAGE_PREFIX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.storage_prefix),
        }
    }

    #[must_use]
    pub fn countdown(&self) -> CountdownConfig {
        CountdownConfig::default().with_warning_at(self.warning_at_secs)
    }
}
