//! Configuration file helpers
//!
//! - Generic YAML config loading/saving for any serde type
//! - The per-user config location (`<config_dir>/twindeck/`)
//!
//! # Usage
//!
//! ```ignore
//! use twindeck_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path("config.yaml");
//! let config: PlayerConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, APP_DIR_NAME};
