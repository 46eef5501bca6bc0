//! Lua binding for the console API.
//!
//! Registers a module table (`cons` by default) whose functions and handle
//! methods marshal Lua values to [`cons_core::ConsoleApi`] calls and back.
//!
//! # Architecture
//!
//! ```text
//! Lua script
//!   │  cons.GetStdHandle("STD_OUTPUT_HANDLE"):WriteConsole("hi")
//!   ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │ ConsoleModule          module table + package.loaded    │
//! │ LuaConsoleHandle       handle userdata and its methods  │
//! │   ├─ args              positional argument checks       │
//! │   ├─ FlagResolver      names / arrays → bitmask         │
//! │   ├─ RecordCodec       event tables ⇄ InputRecord       │
//! │   └─ table             flat <Group><Field> structures   │
//! └──────────────────────────┬──────────────────────────────┘
//!                            ▼
//!                Arc<dyn ConsoleApi> (e.g. VirtualConsole)
//! ```
//!
//! # Errors
//!
//! Malformed input raises a Lua error of the form
//! `bad argument #N to 'Function' (reason)` before the console is called.
//! A well-formed request the console declines returns `nil` (or `false`
//! for operations that report success as a boolean).
//!
//! # Example
//!
//! ```lua
//! local out = cons.GetStdHandle("STD_OUTPUT_HANDLE")
//! out:SetConsoleTextAttribute({ "FOREGROUND_GREEN", "FOREGROUND_INTENSITY" })
//! out:WriteConsole("ready\n")
//!
//! local buf = cons.CreateConsoleScreenBuffer(
//!     { "GENERIC_READ", "GENERIC_WRITE" }, 0, "CONSOLE_TEXTMODE_BUFFER")
//! buf:SetConsoleActiveScreenBuffer()
//! buf:close()
//! ```

mod args;
mod binding;
pub mod codec;
pub mod error;
pub mod handle;
pub mod module;
pub mod resolver;
pub mod script;
mod table;
pub mod testing;

pub use binding::ConsoleBinding;
pub use codec::RecordCodec;
pub use error::BindingError;
pub use handle::LuaConsoleHandle;
pub use module::{ConsoleModule, DEFAULT_MODULE_NAME};
pub use resolver::FlagResolver;
pub use script::run_file;
