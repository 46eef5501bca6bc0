//! Native console records.
//!
//! Fixed-layout structures the console API reads and writes: coordinates,
//! rectangles, character cells, cursor/screen-buffer info and the
//! [`InputRecord`] event union.
//!
//! The native `INPUT_RECORD` stores the key character in a union where the
//! wide and narrow forms alias the same storage. Here the character is a
//! [`ConsoleChar`] carrying its own width tag, so a record holds exactly one
//! representation and cannot silently reinterpret the other.

use serde::Serialize;

/// `EventType` tag of a key event.
pub const KEY_EVENT: u16 = 0x0001;
/// `EventType` tag of a mouse event.
pub const MOUSE_EVENT: u16 = 0x0002;
/// `EventType` tag of a window buffer size event.
pub const WINDOW_BUFFER_SIZE_EVENT: u16 = 0x0004;
/// `EventType` tag of a menu event.
pub const MENU_EVENT: u16 = 0x0008;
/// `EventType` tag of a focus event.
pub const FOCUS_EVENT: u16 = 0x0010;

/// Column/row position in a screen buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangle in screen buffer cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SmallRect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

impl SmallRect {
    #[must_use]
    pub const fn new(left: i16, top: i16, right: i16, bottom: i16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in cells, zero when `right < left`.
    #[must_use]
    pub fn width(&self) -> usize {
        usize::try_from(i32::from(self.right) - i32::from(self.left) + 1).unwrap_or(0)
    }

    /// Height in cells, zero when `bottom < top`.
    #[must_use]
    pub fn height(&self) -> usize {
        usize::try_from(i32::from(self.bottom) - i32::from(self.top) + 1).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A character with an explicit width tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConsoleChar {
    /// UTF-16 code unit (`UnicodeChar`).
    Wide(u16),
    /// Single byte in the console code page (`AsciiChar`).
    Narrow(u8),
}

impl ConsoleChar {
    /// Numeric value regardless of width.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Wide(c) => c,
            Self::Narrow(c) => u16::from(c),
        }
    }

    /// Byte form, truncating wide characters.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Wide(c) => c as u8,
            Self::Narrow(c) => c,
        }
    }
}

impl Default for ConsoleChar {
    fn default() -> Self {
        Self::Narrow(0)
    }
}

/// Screen buffer cell (`CHAR_INFO`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CharInfo {
    pub ch: ConsoleChar,
    pub attributes: u16,
}

impl CharInfo {
    #[must_use]
    pub const fn new(ch: ConsoleChar, attributes: u16) -> Self {
        Self { ch, attributes }
    }
}

/// Cursor size (percent of cell) and visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorInfo {
    pub size: u32,
    pub visible: bool,
}

impl Default for CursorInfo {
    fn default() -> Self {
        Self {
            size: 25,
            visible: true,
        }
    }
}

/// `CONSOLE_SCREEN_BUFFER_INFO`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScreenBufferInfo {
    pub size: Coord,
    pub cursor_position: Coord,
    pub attributes: u16,
    pub window: SmallRect,
    pub maximum_window_size: Coord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventRecord {
    pub key_down: bool,
    pub repeat_count: u16,
    pub virtual_key_code: u16,
    pub virtual_scan_code: u16,
    pub ch: ConsoleChar,
    pub control_key_state: u32,
}

impl Default for KeyEventRecord {
    fn default() -> Self {
        Self {
            key_down: false,
            repeat_count: 1,
            virtual_key_code: 0,
            virtual_scan_code: 0,
            ch: ConsoleChar::default(),
            control_key_state: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseEventRecord {
    pub position: Coord,
    pub button_state: u32,
    pub control_key_state: u32,
    pub event_flags: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowBufferSizeRecord {
    pub size: Coord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuEventRecord {
    pub command_id: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusEventRecord {
    pub set_focus: bool,
}

/// One console input event (`INPUT_RECORD`).
///
/// `Other` carries an event type the binding has no variant for. Such
/// records only ever come from the console side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRecord {
    Key(KeyEventRecord),
    Mouse(MouseEventRecord),
    WindowBufferSize(WindowBufferSizeRecord),
    Menu(MenuEventRecord),
    Focus(FocusEventRecord),
    Other(u16),
}

impl InputRecord {
    /// Native `EventType` tag.
    #[must_use]
    pub fn event_type(&self) -> u16 {
        match self {
            Self::Key(_) => KEY_EVENT,
            Self::Mouse(_) => MOUSE_EVENT,
            Self::WindowBufferSize(_) => WINDOW_BUFFER_SIZE_EVENT,
            Self::Menu(_) => MENU_EVENT,
            Self::Focus(_) => FOCUS_EVENT,
            Self::Other(tag) => *tag,
        }
    }

    /// Symbolic name of the event type, `None` for [`InputRecord::Other`].
    #[must_use]
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            Self::Key(_) => Some("KEY_EVENT"),
            Self::Mouse(_) => Some("MOUSE_EVENT"),
            Self::WindowBufferSize(_) => Some("WINDOW_BUFFER_SIZE_EVENT"),
            Self::Menu(_) => Some("MENU_EVENT"),
            Self::Focus(_) => Some("FOCUS_EVENT"),
            Self::Other(_) => None,
        }
    }

    /// Zeroed record of the given event type.
    ///
    /// Returns `None` for tags that have no variant.
    #[must_use]
    pub fn zeroed(event_type: u16) -> Option<Self> {
        match event_type {
            KEY_EVENT => Some(Self::Key(KeyEventRecord {
                repeat_count: 0,
                ..KeyEventRecord::default()
            })),
            MOUSE_EVENT => Some(Self::Mouse(MouseEventRecord::default())),
            WINDOW_BUFFER_SIZE_EVENT => Some(Self::WindowBufferSize(WindowBufferSizeRecord::default())),
            MENU_EVENT => Some(Self::Menu(MenuEventRecord::default())),
            FOCUS_EVENT => Some(Self::Focus(FocusEventRecord::default())),
            _ => None,
        }
    }
}

/// Staging slot for reads: event type 0, no payload.
impl Default for InputRecord {
    fn default() -> Self {
        Self::Other(0)
    }
}
