//! Capture and playback settings
//!
//! These are the `[capture]` and `[playback]` tables of `config.toml`.
//! Every field has a default, so a partial file (or none at all) is valid.
//!
//! # Main Types
//!
//! - [`CaptureSettings`] - Move filtering and the stop hot-key
//! - [`PlaybackSettings`] - Speed, loop count and timing granularity

use crate::error::{MacroError, Result};
use crate::keys::{KeySymbol, NamedKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default move threshold in pixels
pub const DEFAULT_MOVEMENT_THRESHOLD: u32 = 5;

/// Default delay between playback loops in milliseconds
pub const DEFAULT_LOOP_SETTLE_MS: u64 = 100;

/// Default bound on a single playback wait in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Settings for the capture engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Minimum pointer travel (pixels) between recorded moves
    pub movement_threshold: u32,

    /// Whether pointer moves are recorded at all
    pub record_moves: bool,

    /// Key whose press ends a capture
    pub stop_key: KeySymbol,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            record_moves: true,
            stop_key: KeySymbol::Named(NamedKey::F9),
        }
    }
}

/// Settings for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Speed multiplier
    pub speed: f64,

    /// Number of loops
    pub loops: u32,

    /// Delay between loops in milliseconds
    pub loop_settle_ms: u64,

    /// Maximum time between stop/pause checks in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loops: 1,
            loop_settle_ms: DEFAULT_LOOP_SETTLE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PlaybackSettings {
    /// Check the settings can drive a playback run
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(MacroError::InvalidConfiguration(format!(
                "playback.speed must be a positive number, got {}",
                self.speed
            )));
        }
        if self.loops == 0 {
            return Err(MacroError::InvalidConfiguration(
                "playback.loops must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(MacroError::InvalidConfiguration(
                "playback.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Loop settle delay as a duration
    pub fn loop_settle(&self) -> Duration {
        Duration::from_millis(self.loop_settle_ms)
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.movement_threshold, 5);
        assert!(settings.record_moves);
        assert_eq!(settings.stop_key.to_string(), "Key.f9");
    }

    #[test]
    fn test_playback_validation() {
        assert!(PlaybackSettings::default().validate().is_ok());

        let bad_speed = PlaybackSettings {
            speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_speed.validate(),
            Err(MacroError::InvalidConfiguration(_))
        ));

        let nan_speed = PlaybackSettings {
            speed: f64::NAN,
            ..Default::default()
        };
        assert!(nan_speed.validate().is_err());

        let no_loops = PlaybackSettings {
            loops: 0,
            ..Default::default()
        };
        assert!(no_loops.validate().is_err());

        let no_poll = PlaybackSettings {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(no_poll.validate().is_err());
    }

    #[test]
    fn test_durations() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.loop_settle(), Duration::from_millis(100));
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
    }
}
