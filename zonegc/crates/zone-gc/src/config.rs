//! Configuration Module - Runtime Tuning Parameters
//!
//! Manages configuration for a zone GC runtime: event logging, safepoint
//! timing and the zone registry bound. The zone query surface itself has no
//! tunables.

/// Main configuration for a zone GC runtime
///
/// # Examples
///
/// ```rust
/// use zone_gc::GcConfig;
///
/// // Use default configuration
/// let config = GcConfig::default();
///
/// // Log events as JSON and wait longer for mutators
/// let config = GcConfig {
///     verbose: true,
///     json_events: true,
///     safepoint_timeout_ms: 5_000,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Emit every recorded GC event through the `log` facade
    ///
    /// Default: false
    pub verbose: bool,

    /// Render emitted events as JSON instead of human-readable text
    ///
    /// Default: false
    pub json_events: bool,

    /// Number of events kept in the runtime's event history
    ///
    /// Oldest events are dropped first. 0 disables retention.
    /// Default: 1024
    pub event_history: usize,

    /// How long the collection driver waits for registered mutators to reach
    /// a safepoint before giving up on a transition
    ///
    /// Default: 1000ms
    pub safepoint_timeout_ms: u64,

    /// Maximum number of live zones per runtime
    ///
    /// Default: 4096
    pub max_zones: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            // Logging
            verbose: false,
            json_events: false,
            event_history: 1024,

            // Safepoints
            safepoint_timeout_ms: 1000,

            // Registry
            max_zones: 4096,
        }
    }
}

impl GcConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zone_gc::GcConfig;
    ///
    /// let config = GcConfig {
    ///     max_zones: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_zones == 0 {
            return Err(ConfigError::InvalidZoneLimit(
                "max_zones must be > 0".to_string(),
            ));
        }

        if self.max_zones > u32::MAX as usize {
            return Err(ConfigError::InvalidZoneLimit(format!(
                "max_zones must be <= {}",
                u32::MAX
            )));
        }

        if self.safepoint_timeout_ms == 0 {
            return Err(ConfigError::InvalidSafepointTimeout(
                "safepoint_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.event_history > MAX_EVENT_HISTORY {
            return Err(ConfigError::InvalidEventHistory(format!(
                "event_history must be <= {}",
                MAX_EVENT_HISTORY
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - ZONEGC_VERBOSE
    /// - ZONEGC_JSON_EVENTS
    /// - ZONEGC_EVENT_HISTORY
    /// - ZONEGC_SAFEPOINT_TIMEOUT_MS
    /// - ZONEGC_MAX_ZONES
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("ZONEGC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        if let Some(val) = lookup("ZONEGC_JSON_EVENTS") {
            config.json_events = parse_flag(&val);
        }

        if let Some(val) = lookup("ZONEGC_EVENT_HISTORY") {
            if let Ok(n) = val.parse::<usize>() {
                config.event_history = n;
            }
        }

        if let Some(val) = lookup("ZONEGC_SAFEPOINT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.safepoint_timeout_ms = ms;
            }
        }

        if let Some(val) = lookup("ZONEGC_MAX_ZONES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_zones = n;
            }
        }

        config
    }

    pub fn safepoint_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.safepoint_timeout_ms)
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid zone limit: {0}")]
    InvalidZoneLimit(String),

    #[error("Invalid safepoint timeout: {0}")]
    InvalidSafepointTimeout(String),

    #[error("Invalid event history: {0}")]
    InvalidEventHistory(String),
}

const MAX_EVENT_HISTORY: usize = 1 << 20;

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = GcConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.verbose);
        assert_eq!(config.safepoint_timeout_ms, 1000);
    }

    #[test]
    fn test_invalid_safepoint_timeout() {
        let config = GcConfig {
            safepoint_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSafepointTimeout(_))
        ));
    }

    #[test]
    fn test_invalid_event_history() {
        let config = GcConfig {
            event_history: MAX_EVENT_HISTORY + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ZONEGC_VERBOSE", "TRUE"),
            ("ZONEGC_JSON_EVENTS", "1"),
            ("ZONEGC_EVENT_HISTORY", "16"),
            ("ZONEGC_SAFEPOINT_TIMEOUT_MS", "not-a-number"),
            ("ZONEGC_MAX_ZONES", "8"),
        ]
        .into_iter()
        .collect();

        let config = GcConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!(config.verbose);
        assert!(config.json_events);
        assert_eq!(config.event_history, 16);
        assert_eq!(config.safepoint_timeout_ms, 1000);
        assert_eq!(config.max_zones, 8);
    }
}
