//! Symbolic flag table.
//!
//! Maps console constant names (`"STD_OUTPUT_HANDLE"`, `"FOREGROUND_RED"`,
//! ...) to their integer values. The table is built once at startup and
//! shared read-only behind an `Arc`; nothing in the binding mutates it.
//!
//! # Example
//!
//! ```
//! use cons_core::FlagTable;
//!
//! let flags = FlagTable::standard();
//! assert_eq!(flags.get("KEY_EVENT"), Some(0x1));
//! assert_eq!(flags.get("NOT_A_FLAG"), None);
//! ```

use std::collections::BTreeMap;

/// Standard console constants.
const STANDARD_FLAGS: &[(&str, i64)] = &[
    // Standard device handles
    ("STD_INPUT_HANDLE", -10),
    ("STD_OUTPUT_HANDLE", -11),
    ("STD_ERROR_HANDLE", -12),
    // Input record event types
    ("KEY_EVENT", 0x0001),
    ("MOUSE_EVENT", 0x0002),
    ("WINDOW_BUFFER_SIZE_EVENT", 0x0004),
    ("MENU_EVENT", 0x0008),
    ("FOCUS_EVENT", 0x0010),
    // Input modes
    ("ENABLE_PROCESSED_INPUT", 0x0001),
    ("ENABLE_LINE_INPUT", 0x0002),
    ("ENABLE_ECHO_INPUT", 0x0004),
    ("ENABLE_WINDOW_INPUT", 0x0008),
    ("ENABLE_MOUSE_INPUT", 0x0010),
    ("ENABLE_INSERT_MODE", 0x0020),
    ("ENABLE_QUICK_EDIT_MODE", 0x0040),
    ("ENABLE_EXTENDED_FLAGS", 0x0080),
    ("ENABLE_AUTO_POSITION", 0x0100),
    ("ENABLE_VIRTUAL_TERMINAL_INPUT", 0x0200),
    // Output modes
    ("ENABLE_PROCESSED_OUTPUT", 0x0001),
    ("ENABLE_WRAP_AT_EOL_OUTPUT", 0x0002),
    ("ENABLE_VIRTUAL_TERMINAL_PROCESSING", 0x0004),
    ("DISABLE_NEWLINE_AUTO_RETURN", 0x0008),
    ("ENABLE_LVB_GRID_WORLDWIDE", 0x0010),
    // Screen buffer creation
    ("GENERIC_READ", 0x8000_0000),
    ("GENERIC_WRITE", 0x4000_0000),
    ("FILE_SHARE_READ", 0x0001),
    ("FILE_SHARE_WRITE", 0x0002),
    ("CONSOLE_TEXTMODE_BUFFER", 0x0001),
    // Ctrl events
    ("CTRL_C_EVENT", 0),
    ("CTRL_BREAK_EVENT", 1),
    // Character attributes
    ("FOREGROUND_BLUE", 0x0001),
    ("FOREGROUND_GREEN", 0x0002),
    ("FOREGROUND_RED", 0x0004),
    ("FOREGROUND_INTENSITY", 0x0008),
    ("BACKGROUND_BLUE", 0x0010),
    ("BACKGROUND_GREEN", 0x0020),
    ("BACKGROUND_RED", 0x0040),
    ("BACKGROUND_INTENSITY", 0x0080),
    ("COMMON_LVB_LEADING_BYTE", 0x0100),
    ("COMMON_LVB_TRAILING_BYTE", 0x0200),
    ("COMMON_LVB_GRID_HORIZONTAL", 0x0400),
    ("COMMON_LVB_GRID_LVERTICAL", 0x0800),
    ("COMMON_LVB_GRID_RVERTICAL", 0x1000),
    ("COMMON_LVB_REVERSE_VIDEO", 0x4000),
    ("COMMON_LVB_UNDERSCORE", 0x8000),
    // Control key state
    ("RIGHT_ALT_PRESSED", 0x0001),
    ("LEFT_ALT_PRESSED", 0x0002),
    ("RIGHT_CTRL_PRESSED", 0x0004),
    ("LEFT_CTRL_PRESSED", 0x0008),
    ("SHIFT_PRESSED", 0x0010),
    ("NUMLOCK_ON", 0x0020),
    ("SCROLLLOCK_ON", 0x0040),
    ("CAPSLOCK_ON", 0x0080),
    ("ENHANCED_KEY", 0x0100),
    // Mouse button state
    ("FROM_LEFT_1ST_BUTTON_PRESSED", 0x0001),
    ("RIGHTMOST_BUTTON_PRESSED", 0x0002),
    ("FROM_LEFT_2ND_BUTTON_PRESSED", 0x0004),
    ("FROM_LEFT_3RD_BUTTON_PRESSED", 0x0008),
    ("FROM_LEFT_4TH_BUTTON_PRESSED", 0x0010),
    // Mouse event flags
    ("MOUSE_MOVED", 0x0001),
    ("DOUBLE_CLICK", 0x0002),
    ("MOUSE_WHEELED", 0x0004),
    ("MOUSE_HWHEELED", 0x0008),
];

/// Immutable name → value lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
    entries: BTreeMap<String, i64>,
}

impl FlagTable {
    /// Creates an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the table of standard console constants.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_FLAGS.iter().map(|(k, v)| ((*k).to_string(), *v)))
    }

    /// Creates a table from arbitrary entries. Later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns a copy of this table with `extra` entries merged over it.
    #[must_use]
    pub fn with_overrides<'a>(mut self, extra: impl IntoIterator<Item = (&'a String, &'a i64)>) -> Self {
        for (name, value) in extra {
            self.entries.insert(name.clone(), *value);
        }
        self
    }

    /// Looks up a flag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.entries.get(name).copied()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
