//! Configuration with hierarchical layering.
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────┐
//! │  1. Environment Variables (CONS_*)      │
//! ├─────────────────────────────────────────┤
//! │  2. Project Config (.cons/config.toml)  │
//! ├─────────────────────────────────────────┤
//! │  3. Global Config (~/.cons/config.toml) │
//! ├─────────────────────────────────────────┤
//! │  4. Default Values                      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `CONS_MODULE_NAME` | `module_name` | String |
//! | `CONS_TITLE_CAPACITY` | `title_capacity` | usize |
//! | `CONS_WIDTH` | `console.width` | i16 |
//! | `CONS_HEIGHT` | `console.height` | i16 |
//!
//! # Example Configuration
//!
//! ```toml
//! module_name = "cons"
//! title_capacity = 512
//!
//! [flags]
//! HIGHLIGHT = 0x1E
//!
//! [console]
//! width = 120
//! height = 40
//! mouse_buttons = 3
//! code_page = 65001
//! title = "scripted"
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{ConsConfig, MIN_TITLE_CAPACITY};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".cons")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".cons";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
