//! Configuration loader.
//!
//! # Load Order
//!
//! 1. Default values
//! 2. Global config (`~/.cons/config.toml`)
//! 3. Project config (`.cons/config.toml`)
//! 4. Environment variables (`CONS_*`)
//!
//! Each layer overrides the previous.

use super::{default_config_path, ConfigError, ConsConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Parses a numeric environment variable into a config field.
macro_rules! parse_env_num {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = parse_num(&val)
                .ok_or_else(|| ConfigError::invalid_env_var($var, "expected integer"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use cons_core::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/project")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), cons_core::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file path (defaults to ~/.cons/config.toml).
    global_config_path: Option<PathBuf>,

    /// Project root directory.
    project_root: Option<PathBuf>,

    skip_env: bool,
    skip_global: bool,
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config will be loaded from `<project_root>/.cons/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be read or
    /// parsed, or an environment variable is malformed. Missing files are
    /// ignored.
    pub fn load(&self) -> Result<ConsConfig, ConfigError> {
        let mut config = ConsConfig::default();

        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);

            if let Some(global_config) = load_file(&global_path)? {
                debug!(path = %global_path.display(), "Loaded global config");
                config.merge(&global_config);
            }
        }

        if !self.skip_project {
            if let Some(ref project_root) = self.project_root {
                let path = project_root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE);
                if let Some(project_config) = load_file(&path)? {
                    debug!(path = %path.display(), "Loaded project config");
                    config.merge(&project_config);
                }
            }
        }

        if !self.skip_env {
            apply_env_vars(&mut config)?;
        }

        Ok(config)
    }
}

/// Loads a config file, returning None if it doesn't exist.
fn load_file(path: &Path) -> Result<Option<ConsConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config = ConsConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(Some(config))
}

fn apply_env_vars(config: &mut ConsConfig) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var("CONS_MODULE_NAME") {
        if val.is_empty() {
            return Err(ConfigError::invalid_env_var("CONS_MODULE_NAME", "must not be empty"));
        }
        config.module_name = val;
    }
    parse_env_num!(config.title_capacity, "CONS_TITLE_CAPACITY");
    parse_env_num!(config.console.width, "CONS_WIDTH");
    parse_env_num!(config.console.height, "CONS_HEIGHT");
    Ok(())
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer.
fn parse_num<T: FromStr + TryFrom<i64>>(s: &str) -> Option<T> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok().and_then(|v| T::try_from(v).ok()),
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, ConsConfig::default());
    }

    #[test]
    fn load_global_config() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(
            temp.path(),
            r#"
module_name = "console"

[console]
width = 132
"#,
        );

        let config = ConfigLoader::new()
            .with_global_config(&path)
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.module_name, "console");
        assert_eq!(config.console.width, 132);
    }

    #[test]
    fn load_project_overrides_global() {
        let global_temp = TempDir::new().unwrap();
        let project_temp = TempDir::new().unwrap();
        let cons_dir = project_temp.path().join(".cons");
        std::fs::create_dir_all(&cons_dir).unwrap();

        let global_path = create_config_file(
            global_temp.path(),
            r#"
module_name = "global"

[flags]
SHARED = 1
GLOBAL_ONLY = 2
"#,
        );
        create_config_file(
            &cons_dir,
            r#"
module_name = "project"

[flags]
SHARED = 10
"#,
        );

        let config = ConfigLoader::new()
            .with_global_config(&global_path)
            .with_project_root(project_temp.path())
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.module_name, "project");
        assert_eq!(config.flags.get("SHARED"), Some(&10));
        assert_eq!(config.flags.get("GLOBAL_ONLY"), Some(&2));
    }

    #[test]
    fn missing_config_files_ok() {
        let config = ConfigLoader::new()
            .with_global_config("/nonexistent/path/config.toml")
            .with_project_root("/nonexistent/project")
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, ConsConfig::default());
    }

    #[test]
    fn malformed_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "module_name = [");

        let err = ConfigLoader::new()
            .with_global_config(&path)
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn parse_num_values() {
        assert_eq!(parse_num::<i16>("120"), Some(120));
        assert_eq!(parse_num::<i16>(" 0x50 "), Some(80));
        assert_eq!(parse_num::<usize>("-1"), None);
        assert_eq!(parse_num::<i16>("70000"), None);
        assert_eq!(parse_num::<i16>("wide"), None);
    }

    #[test]
    fn env_var_override() {
        // Mutates process env; the variables are unique to this test.
        std::env::set_var("CONS_WIDTH", "100");
        std::env::set_var("CONS_MODULE_NAME", "envcons");

        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .load()
            .unwrap();

        assert_eq!(config.console.width, 100);
        assert_eq!(config.module_name, "envcons");

        std::env::remove_var("CONS_WIDTH");
        std::env::remove_var("CONS_MODULE_NAME");
    }
}
