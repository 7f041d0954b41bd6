//! Player configuration for twindeck
//!
//! Stored as YAML in the user's config directory.
//! Default location: ~/.config/twindeck/config.yaml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use twindeck_core::audio::AudioConfig;
use twindeck_core::engine::DeckSettings;

/// Config file name inside the twindeck config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device, buffer size and sample rate
    pub audio: AudioConfig,
    /// Position display refresh
    pub poller: PollerConfig,
    /// Settings applied to both decks at start-up
    pub deck: DeckSettings,
}

/// Position poller section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    twindeck_core::config::default_config_path(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twindeck_core::audio::BufferSize;
    use twindeck_core::config::{load_config, save_config};

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.poller.interval(), Duration::from_millis(500));
        assert_eq!(config.deck, DeckSettings::default());
        assert_eq!(config.audio.buffer_size, BufferSize::Default);
        assert!(default_config_path().ends_with("twindeck/config.yaml"));
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "poller:\n  interval_ms: 250\ndeck:\n  room_size: 0.8\n";
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.poller.interval_ms, 250);
        assert_eq!(config.deck.room_size, 0.8);
        assert_eq!(config.deck.gain, 1.0);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let poller = PollerConfig { interval_ms: 0 };
        assert_eq!(poller.interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = PlayerConfig::default();
        config.audio = config.audio.with_buffer_frames(256);
        config.deck.looping = true;

        save_config(&config, &path).unwrap();
        let loaded: PlayerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
