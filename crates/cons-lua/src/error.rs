//! Error types for the Lua binding.

use cons_core::config::ConfigError;
use thiserror::Error;

/// Errors from setting up or driving the binding from Rust.
///
/// Errors raised *inside* Lua calls (bad arguments, closed handles) travel
/// as [`mlua::Error`] and surface here as [`BindingError::Runtime`].
#[derive(Debug, Error)]
pub enum BindingError {
    /// Lua runtime error.
    #[error("lua error: {0}")]
    Runtime(#[from] mlua::Error),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Module name is empty or not a valid global name.
    #[error("invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// Script file not found.
    #[error("script not found: {0}")]
    ScriptNotFound(String),
}

impl cons_core::ErrorCode for BindingError {
    fn code(&self) -> &'static str {
        match self {
            Self::Runtime(_) => "BINDING_LUA_ERROR",
            Self::Config(_) => "BINDING_CONFIG_ERROR",
            Self::InvalidModuleName(_) => "BINDING_INVALID_MODULE_NAME",
            Self::ScriptNotFound(_) => "BINDING_SCRIPT_NOT_FOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ScriptNotFound(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cons_core::ErrorCode;

    #[test]
    fn codes() {
        assert_eq!(
            BindingError::InvalidModuleName(String::new()).code(),
            "BINDING_INVALID_MODULE_NAME"
        );
        assert!(BindingError::ScriptNotFound("x.lua".into()).is_recoverable());
        assert!(!BindingError::Runtime(mlua::Error::runtime("boom")).is_recoverable());
    }

    #[test]
    fn display_wraps_lua_error() {
        let err = BindingError::from(mlua::Error::runtime("boom"));
        assert!(err.to_string().contains("boom"));
    }
}
