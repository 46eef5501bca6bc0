//! Core types for the console bindings.
//!
//! This crate holds everything that does not depend on the scripting host:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    cons-lua (host binding)                   │
//! │   FlagResolver · RecordCodec · handle userdata · dispatch    │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │                    cons-core  ◄── HERE                        │
//! │  FlagTable       name → value table (immutable, shared)      │
//! │  ConsoleHandle   Owned / Borrowed native handle lifecycle    │
//! │  record::*       Coord, SmallRect, CharInfo, InputRecord     │
//! │  ConsoleApi      console capability (trait)                  │
//! │  VirtualConsole  in-memory ConsoleApi                        │
//! │  config          TOML + env layered configuration            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cons_core::{ConsoleApi, ConsoleHandle, VirtualConsole};
//! use std::sync::Arc;
//!
//! let console = Arc::new(VirtualConsole::default());
//! let raw = console.create_console_screen_buffer(0xC000_0000, 0x3, 1).unwrap();
//!
//! let mut buffer = ConsoleHandle::owned(console.clone(), raw);
//! assert!(buffer.validate().is_ok());
//!
//! buffer.close();
//! assert!(buffer.validate().is_err());
//! assert!(!console.is_live(raw));
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod flags;
pub mod handle;
pub mod record;
pub mod virtual_console;

pub use api::{ConsoleApi, RawHandle};
pub use error::{ConsError, ErrorCode, Result};
pub use flags::FlagTable;
pub use handle::{ConsoleHandle, Lifecycle, HANDLE_TYPE_NAME};
pub use record::{
    CharInfo, ConsoleChar, Coord, CursorInfo, FocusEventRecord, InputRecord, KeyEventRecord,
    MenuEventRecord, MouseEventRecord, ScreenBufferInfo, SmallRect, WindowBufferSizeRecord,
};
pub use virtual_console::{ConsoleStats, ScreenSnapshot, VirtualConsole, VirtualConsoleConfig};
