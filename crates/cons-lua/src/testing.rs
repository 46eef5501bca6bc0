//! Test harness for console scripts.
//!
//! [`ConsoleHarness`] pairs a Lua state carrying the registered module with
//! the [`VirtualConsole`] behind it, so tests can drive the binding from
//! Lua and inspect the console from Rust.
//!
//! # Example
//!
//! ```
//! use cons_lua::testing::ConsoleHarness;
//!
//! let harness = ConsoleHarness::new().expect("harness init");
//! harness
//!     .exec("cons.GetStdHandle('STD_OUTPUT_HANDLE'):WriteConsole('hi')")
//!     .expect("write");
//! assert!(harness.console().snapshot().lines[0].starts_with("hi"));
//!
//! let err = harness.error_of("cons.GetStdHandle('NOPE')").expect("raises");
//! assert!(err.contains("bad argument #1 to 'GetStdHandle'"));
//! ```

use crate::error::BindingError;
use crate::module::ConsoleModule;
use cons_core::{FlagTable, VirtualConsole, VirtualConsoleConfig};
use mlua::{FromLuaMulti, Lua};
use std::path::Path;
use std::sync::Arc;

/// Lua state plus the virtual console it is bound to.
pub struct ConsoleHarness {
    lua: Lua,
    console: Arc<VirtualConsole>,
}

impl ConsoleHarness {
    /// Harness over a default 80x25 console.
    ///
    /// # Errors
    ///
    /// Returns an error if the module cannot be registered.
    pub fn new() -> Result<Self, BindingError> {
        Self::with_console(VirtualConsoleConfig::default())
    }

    /// Harness over a console with the given geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the module cannot be registered.
    pub fn with_console(config: VirtualConsoleConfig) -> Result<Self, BindingError> {
        Self::with_module(config, |module| module)
    }

    /// Harness with extra flags merged over the standard table.
    ///
    /// # Errors
    ///
    /// Returns an error if the module cannot be registered.
    pub fn with_flags(extra: &[(&str, i64)]) -> Result<Self, BindingError> {
        let entries = FlagTable::standard()
            .iter()
            .map(|(name, value)| (name.to_string(), value))
            .chain(extra.iter().map(|(name, value)| ((*name).to_string(), *value)))
            .collect::<Vec<_>>();
        Self::with_module(VirtualConsoleConfig::default(), |module| {
            module.with_flags(FlagTable::from_entries(entries))
        })
    }

    fn with_module(
        config: VirtualConsoleConfig,
        customize: impl FnOnce(ConsoleModule) -> ConsoleModule,
    ) -> Result<Self, BindingError> {
        let lua = Lua::new();
        let console = Arc::new(VirtualConsole::new(config));
        customize(ConsoleModule::new(console.clone())).register(&lua)?;
        Ok(Self { lua, console })
    }

    #[must_use]
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    #[must_use]
    pub fn console(&self) -> &Arc<VirtualConsole> {
        &self.console
    }

    /// Runs a chunk.
    ///
    /// # Errors
    ///
    /// Returns the Lua error the chunk raised.
    pub fn exec(&self, source: &str) -> Result<(), BindingError> {
        self.lua.load(source).exec()?;
        Ok(())
    }

    /// Evaluates a chunk and converts its results.
    ///
    /// # Errors
    ///
    /// Returns the Lua error the chunk raised or a conversion error.
    pub fn eval<R: FromLuaMulti>(&self, source: &str) -> Result<R, BindingError> {
        Ok(self.lua.load(source).eval()?)
    }

    /// Runs a script file.
    ///
    /// # Errors
    ///
    /// See [`crate::run_file`].
    pub fn run_file(&self, path: &Path) -> Result<(), BindingError> {
        crate::script::run_file(&self.lua, path)
    }

    /// Message of the error `source` raises, `None` if it runs cleanly.
    #[must_use]
    pub fn error_of(&self, source: &str) -> Option<String> {
        self.lua.load(source).exec().err().map(|e| e.to_string())
    }

    /// Runs a full collection cycle so unreferenced handles are finalized.
    ///
    /// # Errors
    ///
    /// Returns an error if a finalizer raises.
    pub fn collect_garbage(&self) -> Result<(), BindingError> {
        self.lua.gc_collect()?;
        self.lua.gc_collect()?;
        Ok(())
    }
}
