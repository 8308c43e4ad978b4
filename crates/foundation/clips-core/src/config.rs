//! Engine configuration
//!
//! Every field has a default, so an empty file (or no file) yields the
//! behaviour of the shipped app. Files are YAML or JSON, picked by extension.

use crate::{ClipsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the Clips feed engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    pub playback: PlaybackConfig,
    pub gesture: GestureConfig,
    pub viewport: ViewportConfig,
    pub engagement: EngagementConfig,
}

/// Load window around the active item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Items before the active one that may hold a session
    pub window_before: usize,
    /// Items after the active one that may hold a session (preload)
    pub window_after: usize,
}

impl PlaybackConfig {
    /// Maximum number of sessions alive at once
    pub fn window_size(&self) -> usize {
        self.window_before + 1 + self.window_after
    }
}

/// Tap / long-press timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub double_tap_window_ms: u64,
    pub fast_forward_rate: f32,
    pub rewind_tick_ms: u64,
    pub rewind_step_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: 300,
            fast_forward_rate: 2.0,
            rewind_tick_ms: 100,
            rewind_step_ms: 200,
        }
    }
}

impl GestureConfig {
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }

    pub fn rewind_tick(&self) -> Duration {
        Duration::from_millis(self.rewind_tick_ms)
    }

    pub fn rewind_step(&self) -> Duration {
        Duration::from_millis(self.rewind_step_ms)
    }
}

/// Scroll and swipe thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Fraction of an item that must be visible for it to become active
    pub active_visibility_threshold: f32,
    /// Leftward displacement (logical px) that opens the author profile
    pub profile_swipe_threshold: f32,
    /// Displacement before a drag is classified as horizontal or vertical
    pub swipe_capture_slop: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            active_visibility_threshold: 0.5,
            profile_swipe_threshold: 80.0,
            swipe_capture_slop: 10.0,
        }
    }
}

/// Optimistic engagement behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Revert like/dislike/hype when the remote write fails.
    /// Off in the shipped app: failures are only logged.
    pub rollback_on_failure: bool,
}

impl ClipsConfig {
    /// Parse YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: ClipsConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ClipsConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml`/`.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            other => {
                return Err(ClipsError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        tracing::debug!(path = %path.display(), "Loaded clips config");
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.viewport.active_visibility_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ClipsError::InvalidConfig(format!(
                "active_visibility_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.viewport.profile_swipe_threshold <= 0.0 {
            return Err(ClipsError::InvalidConfig(
                "profile_swipe_threshold must be positive".to_string(),
            ));
        }
        if self.viewport.swipe_capture_slop < 0.0 {
            return Err(ClipsError::InvalidConfig(
                "swipe_capture_slop must not be negative".to_string(),
            ));
        }
        if self.gesture.double_tap_window_ms == 0 {
            return Err(ClipsError::InvalidConfig(
                "double_tap_window_ms must be non-zero".to_string(),
            ));
        }
        if self.gesture.rewind_tick_ms == 0 {
            return Err(ClipsError::InvalidConfig(
                "rewind_tick_ms must be non-zero".to_string(),
            ));
        }
        if !(self.gesture.fast_forward_rate > 1.0) {
            return Err(ClipsError::InvalidConfig(format!(
                "fast_forward_rate must be greater than 1, got {}",
                self.gesture.fast_forward_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_shipped_app() {
        let config = ClipsConfig::default();
        assert_eq!(config.playback.window_size(), 1);
        assert_eq!(config.gesture.double_tap_window(), Duration::from_millis(300));
        assert_eq!(config.gesture.fast_forward_rate, 2.0);
        assert_eq!(config.viewport.active_visibility_threshold, 0.5);
        assert_eq!(config.viewport.profile_swipe_threshold, 80.0);
        assert!(!config.engagement.rollback_on_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClipsConfig::from_yaml_str("playback:\n  window_after: 1\n").unwrap();
        assert_eq!(config.playback.window_after, 1);
        assert_eq!(config.playback.window_size(), 2);
        assert_eq!(config.gesture.rewind_tick_ms, 100);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = ClipsConfig::from_json_str(
            r#"{"viewport": {"active_visibility_threshold": 1.5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClipsError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("clips.yaml");
        std::fs::write(&yaml, "engagement:\n  rollback_on_failure: true\n").unwrap();
        assert!(ClipsConfig::load(&yaml).unwrap().engagement.rollback_on_failure);

        let json = dir.path().join("clips.json");
        std::fs::write(&json, r#"{"gesture": {"double_tap_window_ms": 250}}"#).unwrap();
        assert_eq!(ClipsConfig::load(&json).unwrap().gesture.double_tap_window_ms, 250);

        let toml = dir.path().join("clips.toml");
        std::fs::write(&toml, "").unwrap();
        assert!(matches!(
            ClipsConfig::load(&toml),
            Err(ClipsError::UnsupportedFormat(_))
        ));
    }
}
