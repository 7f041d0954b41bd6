//! Standard locations for twindeck configuration files

use std::path::PathBuf;

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "twindeck";

/// Get the config directory
///
/// Returns `<config_dir>/twindeck` (e.g. `~/.config/twindeck` on Linux),
/// or `./twindeck` when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Path of a file inside the config directory
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_app_name() {
        assert!(default_config_dir().ends_with(APP_DIR_NAME));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("config.yaml");
        assert!(path.ends_with("twindeck/config.yaml"));
    }
}
