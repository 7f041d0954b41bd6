//! YAML load/save for configuration types

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load a configuration from a YAML file
///
/// A missing file yields `T::default()`. An unreadable or malformed file also
/// yields the default, with a warning, so a bad edit never stops start-up.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("No config at {:?}, using defaults", path);
        return T::default();
    }

    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))
        .and_then(|contents| {
            serde_yaml::from_str::<T>(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", path))
        });

    match parsed {
        Ok(config) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("{:#}, using defaults", e);
            T::default()
        }
    }
}

/// Save a configuration as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct DeckDefaults {
        gain: f64,
        looping: bool,
    }

    impl Default for DeckDefaults {
        fn default() -> Self {
            Self { gain: 1.0, looping: false }
        }
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config: DeckDefaults = load_config(&dir.path().join("absent.yaml"));
        assert_eq!(config, DeckDefaults::default());
    }

    #[test]
    fn test_save_creates_dirs_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = DeckDefaults { gain: 0.5, looping: true };

        save_config(&config, &path).unwrap();
        let loaded: DeckDefaults = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "gain: [not a number").unwrap();

        let config: DeckDefaults = load_config(&path);
        assert_eq!(config, DeckDefaults::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "looping: true\n").unwrap();

        let config: DeckDefaults = load_config(&path);
        assert!(config.looping);
        assert_eq!(config.gain, 1.0);
    }
}
