//! Module registration.
//!
//! [`ConsoleModule`] builds the module table and installs it as a global
//! and in `package.loaded`, so scripts can use either `cons.GetStdHandle`
//! or `local cons = require("cons")`.
//!
//! # Example
//!
//! ```
//! use cons_core::VirtualConsole;
//! use cons_lua::ConsoleModule;
//! use mlua::Lua;
//! use std::sync::Arc;
//!
//! let lua = Lua::new();
//! ConsoleModule::new(Arc::new(VirtualConsole::default()))
//!     .register(&lua)
//!     .expect("register");
//!
//! let mode: Option<i64> = lua
//!     .load("return cons.GetStdHandle('STD_OUTPUT_HANDLE'):GetConsoleMode()")
//!     .eval()
//!     .expect("eval");
//! assert!(mode.is_some());
//! ```

use crate::args::{check_bytes, check_integer, opt_integer, truthy};
use crate::binding::{soft, ConsoleBinding};
use crate::error::BindingError;
use crate::handle::LuaConsoleHandle;
use cons_core::config::{ConsConfig, MIN_TITLE_CAPACITY};
use cons_core::{ConsError, ConsoleApi, FlagTable, HANDLE_TYPE_NAME};
use mlua::{ExternalResult, Lua, Table, Value};
use std::sync::Arc;

/// Default global and `package.loaded` name.
pub const DEFAULT_MODULE_NAME: &str = "cons";

/// Upper bound for the `GetConsoleTitle` buffer.
pub const MAX_TITLE_CAPACITY: usize = 1 << 16;

/// Builder for the console module.
pub struct ConsoleModule {
    api: Arc<dyn ConsoleApi>,
    flags: Arc<FlagTable>,
    name: String,
    title_capacity: usize,
}

impl ConsoleModule {
    /// Module over `api` with the standard flag table.
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            flags: Arc::new(FlagTable::standard()),
            name: DEFAULT_MODULE_NAME.to_string(),
            title_capacity: MIN_TITLE_CAPACITY,
        }
    }

    /// Module configured from a loaded [`ConsConfig`].
    pub fn from_config(api: Arc<dyn ConsoleApi>, config: &ConsConfig) -> Self {
        Self::new(api)
            .with_flags(config.flag_table())
            .with_name(config.module_name.clone())
            .with_title_capacity(config.effective_title_capacity())
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FlagTable) -> Self {
        self.flags = Arc::new(flags);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_title_capacity(mut self, capacity: usize) -> Self {
        self.title_capacity = capacity;
        self
    }

    /// Builds the module table without installing it anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Runtime`] if a function cannot be created.
    pub fn create(&self, lua: &Lua) -> Result<Table, BindingError> {
        let binding = Arc::new(ConsoleBinding::new(
            self.api.clone(),
            self.flags.clone(),
            self.title_capacity,
        ));
        let module = lua.create_table()?;
        register_functions(lua, &module, &binding)?;
        Ok(module)
    }

    /// Builds the module table and installs it as a global and in
    /// `package.loaded`.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidModuleName`] if the name is not a Lua
    /// identifier, [`BindingError::Runtime`] on Lua failures.
    pub fn register(&self, lua: &Lua) -> Result<Table, BindingError> {
        if !is_identifier(&self.name) {
            return Err(BindingError::InvalidModuleName(self.name.clone()));
        }
        let module = self.create(lua)?;
        lua.globals().set(self.name.as_str(), module.clone())?;
        let loaded: Table = lua.globals().get::<Table>("package")?.get("loaded")?;
        loaded.set(self.name.as_str(), module.clone())?;
        tracing::debug!(module = %self.name, flags = self.flags.len(), "Registered console module");
        Ok(module)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn new_handle(lua: &Lua, handle: LuaConsoleHandle) -> mlua::Result<Value> {
    lua.create_userdata(handle).map(Value::UserData)
}

fn register_functions(lua: &Lua, module: &Table, binding: &Arc<ConsoleBinding>) -> mlua::Result<()> {
    // cons.GetFlags() -> fresh name→value table
    let b = binding.clone();
    module.set(
        "GetFlags",
        lua.create_function(move |lua, ()| {
            let flags = b.resolver.table();
            let table = lua.create_table_with_capacity(0, flags.len())?;
            for (name, value) in flags.iter() {
                table.set(name, value)?;
            }
            Ok(table)
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "GetStdHandle",
        lua.create_function(move |lua, std: Value| {
            const F: &str = "GetStdHandle";
            let std = b.resolver.check_flag(&std, F, 1).into_lua_err()? as u32;
            match soft(F, b.api.get_std_handle(std)) {
                Some(raw) => new_handle(lua, LuaConsoleHandle::borrowed(b.clone(), raw)),
                None => Ok(Value::Nil),
            }
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "SetStdHandle",
        lua.create_function(move |_, (std, handle): (Value, Value)| {
            const F: &str = "SetStdHandle";
            let std = b.resolver.check_flag(&std, F, 1).into_lua_err()? as u32;
            let expected = || {
                ConsError::bad_argument(
                    F,
                    2,
                    format!("{HANDLE_TYPE_NAME} expected, got {}", handle.type_name()),
                )
            };
            let raw = match &handle {
                Value::UserData(ud) => {
                    let handle = ud.borrow::<LuaConsoleHandle>().map_err(|_| expected()).into_lua_err()?;
                    handle.handle().validate().map_err(|e| e.at(F, 2)).into_lua_err()?
                }
                _ => return Err(expected()).into_lua_err(),
            };
            Ok(soft(F, b.api.set_std_handle(std, raw)).is_some())
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "CreateConsoleScreenBuffer",
        lua.create_function(move |lua, (access, share, flags): (Value, Value, Value)| {
            const F: &str = "CreateConsoleScreenBuffer";
            let access = b.resolver.check_flags(&access, F, 1).into_lua_err()? as u32;
            let share = b.resolver.check_flags(&share, F, 2).into_lua_err()? as u32;
            let flags = b.resolver.check_flags(&flags, F, 3).into_lua_err()? as u32;
            match soft(F, b.api.create_console_screen_buffer(access, share, flags)) {
                Some(raw) => new_handle(lua, LuaConsoleHandle::owned(b.clone(), raw)),
                None => Ok(Value::Nil),
            }
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "AllocConsole",
        lua.create_function(move |_, ()| Ok(soft("AllocConsole", b.api.alloc_console()).is_some()))?,
    )?;

    let b = binding.clone();
    module.set(
        "FreeConsole",
        lua.create_function(move |_, ()| Ok(soft("FreeConsole", b.api.free_console()).is_some()))?,
    )?;

    let b = binding.clone();
    module.set(
        "GetConsoleCP",
        lua.create_function(move |_, ()| Ok(b.api.get_console_cp()))?,
    )?;

    let b = binding.clone();
    module.set(
        "GetConsoleOutputCP",
        lua.create_function(move |_, ()| Ok(b.api.get_console_output_cp()))?,
    )?;

    let b = binding.clone();
    module.set(
        "SetConsoleCP",
        lua.create_function(move |_, cp: Value| {
            const F: &str = "SetConsoleCP";
            let cp = check_integer(&cp, F, 1).into_lua_err()? as u32;
            Ok(soft(F, b.api.set_console_cp(cp)).is_some())
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "SetConsoleOutputCP",
        lua.create_function(move |_, cp: Value| {
            const F: &str = "SetConsoleOutputCP";
            let cp = check_integer(&cp, F, 1).into_lua_err()? as u32;
            Ok(soft(F, b.api.set_console_output_cp(cp)).is_some())
        })?,
    )?;

    // cons.GetConsoleTitle([size]) -> string | nil
    let b = binding.clone();
    module.set(
        "GetConsoleTitle",
        lua.create_function(move |_, size: Value| {
            const F: &str = "GetConsoleTitle";
            let requested = opt_integer(&size, b.title_capacity as i64, F, 1).into_lua_err()?;
            let capacity = usize::try_from(requested)
                .unwrap_or(0)
                .clamp(MIN_TITLE_CAPACITY, MAX_TITLE_CAPACITY);
            Ok(soft(F, b.api.get_console_title(capacity)))
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "SetConsoleTitle",
        lua.create_function(move |_, title: Value| {
            const F: &str = "SetConsoleTitle";
            let title = check_bytes(&title, F, 1).into_lua_err()?;
            let title = String::from_utf8_lossy(&title);
            Ok(soft(F, b.api.set_console_title(&title)).is_some())
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "GetNumberOfConsoleMouseButtons",
        lua.create_function(move |_, ()| {
            Ok(soft(
                "GetNumberOfConsoleMouseButtons",
                b.api.get_number_of_console_mouse_buttons(),
            ))
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "GenerateConsoleCtrlEvent",
        lua.create_function(move |_, (event, group): (Value, Value)| {
            const F: &str = "GenerateConsoleCtrlEvent";
            let event = b.resolver.check_flag(&event, F, 1).into_lua_err()? as u32;
            let group = check_integer(&group, F, 2).into_lua_err()? as u32;
            Ok(soft(F, b.api.generate_console_ctrl_event(event, group)).is_some())
        })?,
    )?;

    let b = binding.clone();
    module.set(
        "SetConsoleCtrlHandler",
        lua.create_function(move |_, add: Value| {
            Ok(soft("SetConsoleCtrlHandler", b.api.set_console_ctrl_handler(truthy(&add))).is_some())
        })?,
    )?;

    // cons.log(level, msg)
    module.set(
        "log",
        lua.create_function(|_, (level, msg): (String, String)| {
            match level.to_lowercase().as_str() {
                "trace" => tracing::trace!("[lua] {}", msg),
                "debug" => tracing::debug!("[lua] {}", msg),
                "warn" => tracing::warn!("[lua] {}", msg),
                "error" => tracing::error!("[lua] {}", msg),
                _ => tracing::info!("[lua] {}", msg),
            }
            Ok(())
        })?,
    )?;

    Ok(())
}
