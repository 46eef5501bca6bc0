//! Script loading.

use crate::error::BindingError;
use mlua::Lua;
use std::path::Path;

/// Runs a Lua script file in `lua`.
///
/// The chunk is named after the path so Lua error messages point at it.
///
/// # Errors
///
/// [`BindingError::ScriptNotFound`] if the file cannot be read,
/// [`BindingError::Runtime`] if the script raises.
pub fn run_file(lua: &Lua, path: &Path) -> Result<(), BindingError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| BindingError::ScriptNotFound(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "Running script");
    lua.load(&source)
        .set_name(format!("@{}", path.display()))
        .exec()?;
    Ok(())
}
