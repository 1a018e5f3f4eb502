//! Runtime configuration.

use std::time::Duration;

/// Configuration shared by writers, the listener registry and stores.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix of temporary identifiers given to appended records.
    pub temp_id_prefix: String,

    /// Whether explicit transactions fold their notifications into a batch
    /// event delivered at commit or rollback.
    pub batch_events: bool,

    /// Lock duration used when a caller does not pick one.
    pub default_lock_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_id_prefix: "new".to_string(),
            batch_events: true,
            default_lock_duration: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the temporary identifier prefix.
    #[must_use]
    pub fn temp_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_id_prefix = prefix.into();
        self
    }

    /// Sets whether explicit transactions batch their notifications.
    #[must_use]
    pub const fn batch_events(mut self, value: bool) -> Self {
        self.batch_events = value;
        self
    }

    /// Sets the default lock duration.
    #[must_use]
    pub const fn default_lock_duration(mut self, duration: Duration) -> Self {
        self.default_lock_duration = duration;
        self
    }
}
