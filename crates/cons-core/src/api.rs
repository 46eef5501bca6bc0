//! The console API capability.
//!
//! [`ConsoleApi`] is the seam between the binding and whatever actually
//! implements the console: a native backend, or the in-memory
//! [`VirtualConsole`](crate::VirtualConsole). Every method is a direct
//! blocking call. An `Err` means the console declined a well-formed request;
//! argument validation happens before any method here is reached.

use crate::record::{CharInfo, Coord, CursorInfo, InputRecord, ScreenBufferInfo, SmallRect};
use std::fmt;
use std::io;

/// Opaque native handle value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub isize);

impl RawHandle {
    /// The `INVALID_HANDLE_VALUE` sentinel.
    pub const INVALID: Self = Self(-1);

    #[must_use]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({self})")
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pointer-style identity, e.g. 0x0000000000000010
        write!(f, "{:#018x}", self.0 as usize)
    }
}

/// Console operations the binding calls through.
///
/// Counts and sizes use the native widths (`u32` for DWORD, `u16` for
/// WORD); the binding truncates host integers the same way a C caller
/// would.
pub trait ConsoleApi: Send + Sync {
    // --- handles ------------------------------------------------------------

    fn get_std_handle(&self, std_handle: u32) -> io::Result<RawHandle>;
    fn set_std_handle(&self, std_handle: u32, handle: RawHandle) -> io::Result<()>;
    fn create_console_screen_buffer(
        &self,
        desired_access: u32,
        share_mode: u32,
        flags: u32,
    ) -> io::Result<RawHandle>;
    fn close_handle(&self, handle: RawHandle) -> io::Result<()>;

    // --- process console ----------------------------------------------------

    fn alloc_console(&self) -> io::Result<()>;
    fn free_console(&self) -> io::Result<()>;
    fn get_console_cp(&self) -> u32;
    fn get_console_output_cp(&self) -> u32;
    fn set_console_cp(&self, code_page: u32) -> io::Result<()>;
    fn set_console_output_cp(&self, code_page: u32) -> io::Result<()>;
    /// Returns the title, truncated to `capacity - 1` bytes.
    fn get_console_title(&self, capacity: usize) -> io::Result<String>;
    fn set_console_title(&self, title: &str) -> io::Result<()>;
    fn get_number_of_console_mouse_buttons(&self) -> io::Result<u32>;
    fn generate_console_ctrl_event(&self, ctrl_event: u32, process_group_id: u32) -> io::Result<()>;
    fn set_console_ctrl_handler(&self, add: bool) -> io::Result<()>;

    // --- modes, cursor, geometry --------------------------------------------

    fn get_console_mode(&self, handle: RawHandle) -> io::Result<u32>;
    fn set_console_mode(&self, handle: RawHandle, mode: u32) -> io::Result<()>;
    fn get_console_cursor_info(&self, handle: RawHandle) -> io::Result<CursorInfo>;
    fn set_console_cursor_info(&self, handle: RawHandle, info: CursorInfo) -> io::Result<()>;
    fn set_console_cursor_position(&self, handle: RawHandle, position: Coord) -> io::Result<()>;
    fn get_console_screen_buffer_info(&self, handle: RawHandle) -> io::Result<ScreenBufferInfo>;
    fn get_largest_console_window_size(&self, handle: RawHandle) -> Coord;
    fn set_console_screen_buffer_size(&self, handle: RawHandle, size: Coord) -> io::Result<()>;
    fn set_console_text_attribute(&self, handle: RawHandle, attributes: u16) -> io::Result<()>;
    fn set_console_active_screen_buffer(&self, handle: RawHandle) -> io::Result<()>;
    fn set_console_window_info(
        &self,
        handle: RawHandle,
        absolute: bool,
        window: SmallRect,
    ) -> io::Result<()>;

    // --- input --------------------------------------------------------------

    fn flush_console_input_buffer(&self, handle: RawHandle) -> io::Result<()>;
    fn get_number_of_console_input_events(&self, handle: RawHandle) -> io::Result<u32>;
    /// Fills the front of `buffer`, returning how many records were read.
    fn read_console_input(&self, handle: RawHandle, buffer: &mut [InputRecord]) -> io::Result<usize>;
    /// Like [`read_console_input`](Self::read_console_input) but leaves the
    /// records queued.
    fn peek_console_input(&self, handle: RawHandle, buffer: &mut [InputRecord]) -> io::Result<usize>;
    fn write_console_input(&self, handle: RawHandle, records: &[InputRecord]) -> io::Result<usize>;
    /// Reads up to `buffer.len()` bytes of console text.
    fn read_console(&self, handle: RawHandle, buffer: &mut [u8]) -> io::Result<usize>;

    // --- output -------------------------------------------------------------

    fn write_console(&self, handle: RawHandle, text: &[u8]) -> io::Result<usize>;
    /// Copies a `buffer_size` block of `cells`, starting at `buffer_coord`,
    /// into `region`. On success `region` holds the rectangle actually
    /// written.
    fn write_console_output(
        &self,
        handle: RawHandle,
        cells: &[CharInfo],
        buffer_size: Coord,
        buffer_coord: Coord,
        region: &mut SmallRect,
    ) -> io::Result<()>;
    /// Reverse of [`write_console_output`](Self::write_console_output).
    fn read_console_output(
        &self,
        handle: RawHandle,
        cells: &mut [CharInfo],
        buffer_size: Coord,
        buffer_coord: Coord,
        region: &mut SmallRect,
    ) -> io::Result<()>;
    fn fill_console_output_attribute(
        &self,
        handle: RawHandle,
        attribute: u16,
        length: u32,
        coord: Coord,
    ) -> io::Result<u32>;
    fn fill_console_output_character(
        &self,
        handle: RawHandle,
        ch: u8,
        length: u32,
        coord: Coord,
    ) -> io::Result<u32>;
    fn read_console_output_attribute(
        &self,
        handle: RawHandle,
        buffer: &mut [u16],
        coord: Coord,
    ) -> io::Result<usize>;
    fn read_console_output_character(
        &self,
        handle: RawHandle,
        buffer: &mut [u8],
        coord: Coord,
    ) -> io::Result<usize>;
    fn write_console_output_attribute(
        &self,
        handle: RawHandle,
        attributes: &[u16],
        coord: Coord,
    ) -> io::Result<u32>;
    fn write_console_output_character(
        &self,
        handle: RawHandle,
        text: &[u8],
        coord: Coord,
    ) -> io::Result<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel() {
        assert!(RawHandle::INVALID.is_invalid());
        assert!(!RawHandle(0x10).is_invalid());
    }

    #[test]
    fn display_is_pointer_like() {
        assert_eq!(RawHandle(0x10).to_string(), "0x0000000000000010");
    }
}
