//! Engine configuration.

use crate::error::ConfigError;
use std::time::Duration;

/// Default live-feed endpoint of the decision engine.
pub const DEFAULT_FEED_URL: &str = "ws://localhost:8000/ws";

/// Upper bound on waypoints per geodesic path.
pub const MAX_PATH_POINTS: usize = 10_000;

/// Configuration for a visualization session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Live feed endpoint (default: ws://localhost:8000/ws)
    pub feed_url: String,

    /// How long a route stays visible after ingestion (default: 3000ms)
    pub visibility_window: Duration,

    /// Fixed delay before reconnecting a dropped feed (default: 3000ms)
    pub reconnect_delay: Duration,

    /// Period of the re-projection tick (default: 1000ms)
    pub tick_interval: Duration,

    /// Waypoints per geodesic path (default: 100)
    pub path_points: usize,

    /// Physically drop routes older than this (default: None = keep forever)
    pub retention: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            visibility_window: Duration::from_millis(3000),
            reconnect_delay: Duration::from_millis(3000),
            tick_interval: Duration::from_millis(1000),
            path_points: 100,
            retention: None,
        }
    }
}

impl EngineConfig {
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    pub fn with_visibility_window(mut self, window: Duration) -> Self {
        self.visibility_window = window;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_path_points(mut self, points: usize) -> Self {
        self.path_points = points;
        self
    }

    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    /// Checks the invariants the session relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::InvalidDuration("reconnect_delay"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidDuration("tick_interval"));
        }
        if self.path_points < 2 {
            return Err(ConfigError::TooFewPathPoints(self.path_points));
        }
        if self.path_points > MAX_PATH_POINTS {
            return Err(ConfigError::TooManyPathPoints {
                points: self.path_points,
                max: MAX_PATH_POINTS,
            });
        }
        if let Some(retention) = self.retention {
            if retention < self.visibility_window {
                return Err(ConfigError::RetentionBelowWindow {
                    retention_ms: retention.as_millis(),
                    window_ms: self.visibility_window.as_millis(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.feed_url, "ws://localhost:8000/ws");
        assert_eq!(config.visibility_window, Duration::from_millis(3000));
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.tick_interval, Duration::from_millis(1000));
        assert_eq!(config.path_points, 100);
        assert_eq!(config.retention, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timers_rejected() {
        let config = EngineConfig::default().with_tick_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidDuration("tick_interval")));

        let config = EngineConfig::default().with_reconnect_delay(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidDuration("reconnect_delay")));
    }

    #[test]
    fn test_retention_must_cover_window() {
        let config = EngineConfig::default().with_retention(Some(Duration::from_millis(1000)));
        assert!(matches!(config.validate(), Err(ConfigError::RetentionBelowWindow { .. })));

        let config = EngineConfig::default().with_retention(Some(Duration::from_secs(60)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_path_points_bounds() {
        let config = EngineConfig::default().with_path_points(1);
        assert_eq!(config.validate(), Err(ConfigError::TooFewPathPoints(1)));

        let config = EngineConfig::default().with_path_points(MAX_PATH_POINTS);
        assert!(config.validate().is_ok());

        let config = EngineConfig::default().with_path_points(usize::MAX);
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyPathPoints { points: usize::MAX, max: MAX_PATH_POINTS })
        );
    }
}
