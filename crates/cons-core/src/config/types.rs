//! Configuration types.

use crate::flags::FlagTable;
use crate::virtual_console::VirtualConsoleConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest title buffer handed to `GetConsoleTitle`.
pub const MIN_TITLE_CAPACITY: usize = 512;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsConfig {
    /// Name the Lua module registers under (global and `package.loaded`).
    pub module_name: String,

    /// Default title buffer size for `GetConsoleTitle`.
    pub title_capacity: usize,

    /// Extra flag names merged over the standard table.
    pub flags: BTreeMap<String, i64>,

    /// Virtual console geometry.
    pub console: VirtualConsoleConfig,
}

impl Default for ConsConfig {
    fn default() -> Self {
        Self {
            module_name: "cons".to_string(),
            title_capacity: MIN_TITLE_CAPACITY,
            flags: BTreeMap::new(),
            console: VirtualConsoleConfig::default(),
        }
    }
}

impl ConsConfig {
    /// Parses from TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error on malformed input.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Title buffer size with the minimum applied.
    #[must_use]
    pub fn effective_title_capacity(&self) -> usize {
        self.title_capacity.max(MIN_TITLE_CAPACITY)
    }

    /// Standard flag table with `[flags]` merged over it.
    #[must_use]
    pub fn flag_table(&self) -> FlagTable {
        FlagTable::standard().with_overrides(&self.flags)
    }

    /// Merges another config into this one.
    ///
    /// Fields of `other` that still hold their default value do not
    /// override; `[flags]` entries are unioned with `other` winning.
    pub fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.module_name != default.module_name {
            self.module_name.clone_from(&other.module_name);
        }
        if other.title_capacity != default.title_capacity {
            self.title_capacity = other.title_capacity;
        }
        for (name, value) in &other.flags {
            self.flags.insert(name.clone(), *value);
        }

        let console = VirtualConsoleConfig::default();
        if other.console.width != console.width {
            self.console.width = other.console.width;
        }
        if other.console.height != console.height {
            self.console.height = other.console.height;
        }
        if other.console.mouse_buttons != console.mouse_buttons {
            self.console.mouse_buttons = other.console.mouse_buttons;
        }
        if other.console.code_page != console.code_page {
            self.console.code_page = other.console.code_page;
        }
        if other.console.title != console.title {
            self.console.title.clone_from(&other.console.title);
        }
    }
}
