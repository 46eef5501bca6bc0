//! In-memory console backend.
//!
//! [`VirtualConsole`] implements [`ConsoleApi`] without an OS console: an
//! input queue, a set of screen buffers (character grid, cursor, attributes,
//! mode, window) and the process-wide console state (title, code pages,
//! std handle table). It is what the CLI runs scripts against and what the
//! tests drive.
//!
//! # Handles
//!
//! ```text
//! STD_INPUT_HANDLE  ──► Input queue
//! STD_OUTPUT_HANDLE ─┐
//! STD_ERROR_HANDLE  ─┴► primary ScreenBuffer (active unless switched)
//! CreateConsoleScreenBuffer ──► new ScreenBuffer (removed on CloseHandle)
//! ```
//!
//! Requests the real console would refuse (unknown or closed handle,
//! coordinates outside the buffer, a region that clips to nothing) fail
//! with [`io::ErrorKind::InvalidInput`].
//!
//! Reads never block: an empty input queue yields zero records.

use crate::api::{ConsoleApi, RawHandle};
use crate::record::{
    CharInfo, ConsoleChar, Coord, CursorInfo, InputRecord, ScreenBufferInfo, SmallRect,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::io;

const STD_INPUT_HANDLE: u32 = -10i32 as u32;
const STD_OUTPUT_HANDLE: u32 = -11i32 as u32;
const STD_ERROR_HANDLE: u32 = -12i32 as u32;

const CONSOLE_TEXTMODE_BUFFER: u32 = 0x0001;
const ENABLE_PROCESSED_OUTPUT: u32 = 0x0001;
const ENABLE_WRAP_AT_EOL_OUTPUT: u32 = 0x0002;

const DEFAULT_INPUT_MODE: u32 = 0x01F7;
const DEFAULT_OUTPUT_MODE: u32 = ENABLE_PROCESSED_OUTPUT | ENABLE_WRAP_AT_EOL_OUTPUT;
const DEFAULT_ATTRIBUTES: u16 = 0x0007;

/// Largest window the virtual display can show.
const LARGEST_WINDOW: Coord = Coord::new(200, 75);

/// Upper bound on cells per screen buffer.
const MAX_CELLS: usize = 1 << 22;

/// Geometry and identity of a fresh virtual console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VirtualConsoleConfig {
    /// Columns of the primary screen buffer.
    pub width: i16,
    /// Rows of the primary screen buffer.
    pub height: i16,
    /// Reported number of mouse buttons.
    pub mouse_buttons: u32,
    /// Initial input and output code page.
    pub code_page: u32,
    /// Initial console title.
    pub title: String,
}

impl Default for VirtualConsoleConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 25,
            mouse_buttons: 3,
            code_page: 437,
            title: String::new(),
        }
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleStats {
    /// Successful `CloseHandle` calls.
    pub handles_closed: usize,
    /// Handles currently open.
    pub live_handles: usize,
    /// Input records waiting in the queue.
    pub queued_input: usize,
}

/// Serializable view of the active screen buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenSnapshot {
    pub title: String,
    pub width: i16,
    pub height: i16,
    pub cursor: Coord,
    pub attributes: u16,
    /// One string per row, NUL cells rendered as spaces.
    pub lines: Vec<String>,
}

type BufferId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Input,
    Screen(BufferId),
}

#[derive(Debug, Clone)]
struct ScreenBuffer {
    size: Coord,
    cells: Vec<CharInfo>,
    cursor: Coord,
    cursor_info: CursorInfo,
    attributes: u16,
    mode: u32,
    window: SmallRect,
}

impl ScreenBuffer {
    fn new(size: Coord) -> Self {
        let blank = CharInfo::new(ConsoleChar::Narrow(b' '), DEFAULT_ATTRIBUTES);
        Self {
            size,
            cells: vec![blank; cell_count(size)],
            cursor: Coord::default(),
            cursor_info: CursorInfo::default(),
            attributes: DEFAULT_ATTRIBUTES,
            mode: DEFAULT_OUTPUT_MODE,
            window: SmallRect::new(
                0,
                0,
                size.x.min(LARGEST_WINDOW.x) - 1,
                size.y.min(LARGEST_WINDOW.y) - 1,
            ),
        }
    }

    fn contains(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.size.x && c.y < self.size.y
    }

    fn index(&self, c: Coord) -> usize {
        c.y as usize * self.size.x as usize + c.x as usize
    }

    /// Linear cell range starting at `start`, clamped to the buffer end.
    fn linear_range(&self, start: Coord, length: usize) -> io::Result<std::ops::Range<usize>> {
        if !self.contains(start) {
            return Err(invalid("coordinate outside screen buffer"));
        }
        let from = self.index(start);
        let to = from.saturating_add(length).min(self.cells.len());
        Ok(from..to)
    }

    fn resize(&mut self, size: Coord) {
        let blank = CharInfo::new(ConsoleChar::Narrow(b' '), self.attributes);
        let mut cells = vec![blank; cell_count(size)];
        let rows = self.size.y.min(size.y) as usize;
        let cols = self.size.x.min(size.x) as usize;
        for y in 0..rows {
            let src = y * self.size.x as usize;
            let dst = y * size.x as usize;
            cells[dst..dst + cols].copy_from_slice(&self.cells[src..src + cols]);
        }
        self.cells = cells;
        self.size = size;
        self.cursor.x = self.cursor.x.min(size.x - 1);
        self.cursor.y = self.cursor.y.min(size.y - 1);
        self.window.right = self.window.right.min(size.x - 1);
        self.window.bottom = self.window.bottom.min(size.y - 1);
    }

    fn scroll_up(&mut self) {
        let width = self.size.x as usize;
        self.cells.drain(..width);
        let blank = CharInfo::new(ConsoleChar::Narrow(b' '), self.attributes);
        self.cells.extend(std::iter::repeat(blank).take(width));
    }

    fn new_line(&mut self) {
        self.cursor.x = 0;
        if self.cursor.y + 1 >= self.size.y {
            self.scroll_up();
        } else {
            self.cursor.y += 1;
        }
    }

    fn put(&mut self, byte: u8) {
        let processed = self.mode & ENABLE_PROCESSED_OUTPUT != 0;
        if processed {
            match byte {
                b'\n' => return self.new_line(),
                b'\r' => {
                    self.cursor.x = 0;
                    return;
                }
                0x08 => {
                    self.cursor.x = (self.cursor.x - 1).max(0);
                    return;
                }
                0x07 => return,
                _ => {}
            }
        }
        let idx = self.index(self.cursor);
        self.cells[idx] = CharInfo::new(ConsoleChar::Narrow(byte), self.attributes);
        if self.cursor.x + 1 < self.size.x {
            self.cursor.x += 1;
        } else if self.mode & ENABLE_WRAP_AT_EOL_OUTPUT != 0 {
            self.new_line();
        }
    }

    /// Clips `region` to the buffer and to the `buffer_size` block that
    /// starts at `buffer_coord`.
    fn clip(&self, region: SmallRect, buffer_size: Coord, buffer_coord: Coord) -> io::Result<SmallRect> {
        if buffer_size.x <= 0 || buffer_size.y <= 0 {
            return Err(invalid("empty source buffer"));
        }
        if buffer_coord.x < 0
            || buffer_coord.y < 0
            || buffer_coord.x >= buffer_size.x
            || buffer_coord.y >= buffer_size.y
        {
            return Err(invalid("buffer coordinate outside source buffer"));
        }
        let left = region.left.max(0);
        let top = region.top.max(0);
        let src_cols = i32::from(buffer_size.x - buffer_coord.x);
        let src_rows = i32::from(buffer_size.y - buffer_coord.y);
        let right = i32::from(region.right)
            .min(i32::from(self.size.x) - 1)
            .min(i32::from(left) + src_cols - 1);
        let bottom = i32::from(region.bottom)
            .min(i32::from(self.size.y) - 1)
            .min(i32::from(top) + src_rows - 1);
        let clipped = SmallRect::new(left, top, right as i16, bottom as i16);
        if clipped.is_empty() || left >= self.size.x || top >= self.size.y {
            return Err(invalid("region outside screen buffer"));
        }
        Ok(clipped)
    }
}

#[derive(Debug)]
struct State {
    next_handle: isize,
    next_buffer: BufferId,
    handles: HashMap<RawHandle, Target>,
    buffers: HashMap<BufferId, ScreenBuffer>,
    std_handles: HashMap<u32, RawHandle>,
    primary: BufferId,
    active: BufferId,
    input: VecDeque<InputRecord>,
    input_mode: u32,
    title: String,
    input_cp: u32,
    output_cp: u32,
    attached: bool,
    ignore_ctrl_c: bool,
    ctrl_events: Vec<(u32, u32)>,
    handles_closed: usize,
}

impl State {
    fn open(&mut self, target: Target) -> RawHandle {
        let raw = RawHandle(self.next_handle);
        self.next_handle += 4;
        self.handles.insert(raw, target);
        raw
    }

    fn new_buffer(&mut self, size: Coord) -> BufferId {
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.buffers.insert(id, ScreenBuffer::new(size));
        id
    }

    fn target(&self, handle: RawHandle) -> io::Result<Target> {
        self.handles
            .get(&handle)
            .copied()
            .ok_or_else(|| invalid("invalid handle"))
    }

    fn screen(&mut self, handle: RawHandle) -> io::Result<&mut ScreenBuffer> {
        match self.target(handle)? {
            Target::Screen(id) => self
                .buffers
                .get_mut(&id)
                .ok_or_else(|| invalid("screen buffer released")),
            Target::Input => Err(invalid("not a screen buffer handle")),
        }
    }

    fn input_queue(&mut self, handle: RawHandle) -> io::Result<&mut VecDeque<InputRecord>> {
        match self.target(handle)? {
            Target::Input => Ok(&mut self.input),
            Target::Screen(_) => Err(invalid("not an input handle")),
        }
    }
}

/// In-memory [`ConsoleApi`] implementation.
#[derive(Debug)]
pub struct VirtualConsole {
    config: VirtualConsoleConfig,
    state: Mutex<State>,
}

impl VirtualConsole {
    /// Creates a console with one input queue and one primary screen buffer.
    #[must_use]
    pub fn new(config: VirtualConsoleConfig) -> Self {
        let size = Coord::new(config.width.max(1), config.height.max(1));
        let mut state = State {
            next_handle: 0x10,
            next_buffer: 0,
            handles: HashMap::new(),
            buffers: HashMap::new(),
            std_handles: HashMap::new(),
            primary: 0,
            active: 0,
            input: VecDeque::new(),
            input_mode: DEFAULT_INPUT_MODE,
            title: config.title.clone(),
            input_cp: config.code_page,
            output_cp: config.code_page,
            attached: true,
            ignore_ctrl_c: false,
            ctrl_events: Vec::new(),
            handles_closed: 0,
        };
        let primary = state.new_buffer(size);
        state.primary = primary;
        state.active = primary;

        let input = state.open(Target::Input);
        let output = state.open(Target::Screen(primary));
        let error = state.open(Target::Screen(primary));
        state.std_handles.insert(STD_INPUT_HANDLE, input);
        state.std_handles.insert(STD_OUTPUT_HANDLE, output);
        state.std_handles.insert(STD_ERROR_HANDLE, error);

        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Whether `handle` is currently open.
    #[must_use]
    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.state.lock().handles.contains_key(&handle)
    }

    #[must_use]
    pub fn stats(&self) -> ConsoleStats {
        let state = self.state.lock();
        ConsoleStats {
            handles_closed: state.handles_closed,
            live_handles: state.handles.len(),
            queued_input: state.input.len(),
        }
    }

    /// Ctrl events generated so far, as `(event, process_group)` pairs.
    #[must_use]
    pub fn ctrl_events(&self) -> Vec<(u32, u32)> {
        self.state.lock().ctrl_events.clone()
    }

    /// Snapshot of the active screen buffer.
    #[must_use]
    pub fn snapshot(&self) -> ScreenSnapshot {
        let state = self.state.lock();
        let title = state.title.clone();
        let Some(buffer) = state.buffers.get(&state.active) else {
            return ScreenSnapshot {
                title,
                width: 0,
                height: 0,
                cursor: Coord::default(),
                attributes: 0,
                lines: Vec::new(),
            };
        };
        let lines = buffer
            .cells
            .chunks(buffer.size.x as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.ch.code() {
                        0 => ' ',
                        code => char::from_u32(u32::from(code)).unwrap_or('?'),
                    })
                    .collect::<String>()
            })
            .collect();
        ScreenSnapshot {
            title,
            width: buffer.size.x,
            height: buffer.size.y,
            cursor: buffer.cursor,
            attributes: buffer.attributes,
            lines,
        }
    }
}

impl Default for VirtualConsole {
    fn default() -> Self {
        Self::new(VirtualConsoleConfig::default())
    }
}

impl ConsoleApi for VirtualConsole {
    fn get_std_handle(&self, std_handle: u32) -> io::Result<RawHandle> {
        self.state
            .lock()
            .std_handles
            .get(&std_handle)
            .copied()
            .ok_or_else(|| invalid("unknown standard device"))
    }

    fn set_std_handle(&self, std_handle: u32, handle: RawHandle) -> io::Result<()> {
        let mut state = self.state.lock();
        state.target(handle)?;
        match state.std_handles.get_mut(&std_handle) {
            Some(slot) => {
                *slot = handle;
                Ok(())
            }
            None => Err(invalid("unknown standard device")),
        }
    }

    fn create_console_screen_buffer(
        &self,
        _desired_access: u32,
        _share_mode: u32,
        flags: u32,
    ) -> io::Result<RawHandle> {
        if flags != CONSOLE_TEXTMODE_BUFFER {
            return Err(invalid("unsupported screen buffer type"));
        }
        let mut state = self.state.lock();
        let size = state
            .buffers
            .get(&state.primary)
            .map_or(Coord::new(self.config.width, self.config.height), |b| b.size);
        let id = state.new_buffer(size);
        Ok(state.open(Target::Screen(id)))
    }

    fn close_handle(&self, handle: RawHandle) -> io::Result<()> {
        let mut state = self.state.lock();
        let target = state
            .handles
            .remove(&handle)
            .ok_or_else(|| invalid("invalid handle"))?;
        state.handles_closed += 1;
        if let Target::Screen(id) = target {
            let referenced = state.handles.values().any(|t| *t == Target::Screen(id));
            if !referenced && id != state.primary {
                state.buffers.remove(&id);
                if state.active == id {
                    state.active = state.primary;
                }
            }
        }
        Ok(())
    }

    fn alloc_console(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.attached {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "process already has a console",
            ));
        }
        state.attached = true;
        Ok(())
    }

    fn free_console(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.attached {
            return Err(invalid("process has no console"));
        }
        state.attached = false;
        Ok(())
    }

    fn get_console_cp(&self) -> u32 {
        self.state.lock().input_cp
    }

    fn get_console_output_cp(&self) -> u32 {
        self.state.lock().output_cp
    }

    fn set_console_cp(&self, code_page: u32) -> io::Result<()> {
        if code_page == 0 {
            return Err(invalid("invalid code page"));
        }
        self.state.lock().input_cp = code_page;
        Ok(())
    }

    fn set_console_output_cp(&self, code_page: u32) -> io::Result<()> {
        if code_page == 0 {
            return Err(invalid("invalid code page"));
        }
        self.state.lock().output_cp = code_page;
        Ok(())
    }

    fn get_console_title(&self, capacity: usize) -> io::Result<String> {
        if capacity == 0 {
            return Err(invalid("empty title buffer"));
        }
        let state = self.state.lock();
        let mut end = state.title.len().min(capacity - 1);
        while !state.title.is_char_boundary(end) {
            end -= 1;
        }
        Ok(state.title[..end].to_string())
    }

    fn set_console_title(&self, title: &str) -> io::Result<()> {
        self.state.lock().title = title.to_string();
        Ok(())
    }

    fn get_number_of_console_mouse_buttons(&self) -> io::Result<u32> {
        Ok(self.config.mouse_buttons)
    }

    fn generate_console_ctrl_event(&self, ctrl_event: u32, process_group_id: u32) -> io::Result<()> {
        if ctrl_event > 1 {
            return Err(invalid("unknown ctrl event"));
        }
        self.state
            .lock()
            .ctrl_events
            .push((ctrl_event, process_group_id));
        Ok(())
    }

    fn set_console_ctrl_handler(&self, add: bool) -> io::Result<()> {
        self.state.lock().ignore_ctrl_c = add;
        Ok(())
    }

    fn get_console_mode(&self, handle: RawHandle) -> io::Result<u32> {
        let mut state = self.state.lock();
        match state.target(handle)? {
            Target::Input => Ok(state.input_mode),
            Target::Screen(_) => Ok(state.screen(handle)?.mode),
        }
    }

    fn set_console_mode(&self, handle: RawHandle, mode: u32) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.target(handle)? {
            Target::Input => state.input_mode = mode,
            Target::Screen(_) => state.screen(handle)?.mode = mode,
        }
        Ok(())
    }

    fn get_console_cursor_info(&self, handle: RawHandle) -> io::Result<CursorInfo> {
        Ok(self.state.lock().screen(handle)?.cursor_info)
    }

    fn set_console_cursor_info(&self, handle: RawHandle, info: CursorInfo) -> io::Result<()> {
        if !(1..=100).contains(&info.size) {
            return Err(invalid("cursor size must be between 1 and 100"));
        }
        self.state.lock().screen(handle)?.cursor_info = info;
        Ok(())
    }

    fn set_console_cursor_position(&self, handle: RawHandle, position: Coord) -> io::Result<()> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        if !buffer.contains(position) {
            return Err(invalid("cursor position outside screen buffer"));
        }
        buffer.cursor = position;
        Ok(())
    }

    fn get_console_screen_buffer_info(&self, handle: RawHandle) -> io::Result<ScreenBufferInfo> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        Ok(ScreenBufferInfo {
            size: buffer.size,
            cursor_position: buffer.cursor,
            attributes: buffer.attributes,
            window: buffer.window,
            maximum_window_size: Coord::new(
                buffer.size.x.min(LARGEST_WINDOW.x),
                buffer.size.y.min(LARGEST_WINDOW.y),
            ),
        })
    }

    fn get_largest_console_window_size(&self, handle: RawHandle) -> Coord {
        match self.state.lock().screen(handle) {
            Ok(_) => LARGEST_WINDOW,
            Err(_) => Coord::default(),
        }
    }

    fn set_console_screen_buffer_size(&self, handle: RawHandle, size: Coord) -> io::Result<()> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let window = buffer.window;
        if size.x < window.right - window.left + 1 || size.y < window.bottom - window.top + 1 {
            return Err(invalid("buffer smaller than window"));
        }
        if cell_count(size) > MAX_CELLS {
            return Err(invalid("screen buffer too large"));
        }
        buffer.resize(size);
        Ok(())
    }

    fn set_console_text_attribute(&self, handle: RawHandle, attributes: u16) -> io::Result<()> {
        self.state.lock().screen(handle)?.attributes = attributes;
        Ok(())
    }

    fn set_console_active_screen_buffer(&self, handle: RawHandle) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.target(handle)? {
            Target::Screen(id) => {
                state.active = id;
                Ok(())
            }
            Target::Input => Err(invalid("not a screen buffer handle")),
        }
    }

    fn set_console_window_info(
        &self,
        handle: RawHandle,
        absolute: bool,
        window: SmallRect,
    ) -> io::Result<()> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let target = if absolute {
            window
        } else {
            let cur = buffer.window;
            let shift =
                |base: i16, delta: i16| i16::try_from(i32::from(base) + i32::from(delta)).ok();
            match (
                shift(cur.left, window.left),
                shift(cur.top, window.top),
                shift(cur.right, window.right),
                shift(cur.bottom, window.bottom),
            ) {
                (Some(left), Some(top), Some(right), Some(bottom)) => {
                    SmallRect::new(left, top, right, bottom)
                }
                _ => return Err(invalid("window does not fit the screen buffer")),
            }
        };
        let fits = !target.is_empty()
            && buffer.contains(Coord::new(target.left, target.top))
            && buffer.contains(Coord::new(target.right, target.bottom))
            && target.width() <= LARGEST_WINDOW.x as usize
            && target.height() <= LARGEST_WINDOW.y as usize;
        if !fits {
            return Err(invalid("window does not fit the screen buffer"));
        }
        buffer.window = target;
        Ok(())
    }

    fn flush_console_input_buffer(&self, handle: RawHandle) -> io::Result<()> {
        self.state.lock().input_queue(handle)?.clear();
        Ok(())
    }

    fn get_number_of_console_input_events(&self, handle: RawHandle) -> io::Result<u32> {
        let mut state = self.state.lock();
        Ok(state.input_queue(handle)?.len() as u32)
    }

    fn read_console_input(&self, handle: RawHandle, buffer: &mut [InputRecord]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let queue = state.input_queue(handle)?;
        let n = buffer.len().min(queue.len());
        for (slot, record) in buffer.iter_mut().zip(queue.drain(..n)) {
            *slot = record;
        }
        Ok(n)
    }

    fn peek_console_input(&self, handle: RawHandle, buffer: &mut [InputRecord]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let queue = state.input_queue(handle)?;
        let n = buffer.len().min(queue.len());
        for (slot, record) in buffer.iter_mut().zip(queue.iter()) {
            *slot = *record;
        }
        Ok(n)
    }

    fn write_console_input(&self, handle: RawHandle, records: &[InputRecord]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.input_queue(handle)?.extend(records.iter().copied());
        Ok(records.len())
    }

    fn read_console(&self, handle: RawHandle, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let queue = state.input_queue(handle)?;
        let mut n = 0;
        while n < buffer.len() {
            let Some(record) = queue.pop_front() else {
                break;
            };
            // Only key-down events with a character produce text.
            let InputRecord::Key(key) = record else {
                continue;
            };
            let byte = key.ch.as_byte();
            if !key.key_down || byte == 0 {
                continue;
            }
            for _ in 0..key.repeat_count.max(1) {
                if n == buffer.len() {
                    break;
                }
                buffer[n] = byte;
                n += 1;
            }
        }
        Ok(n)
    }

    fn write_console(&self, handle: RawHandle, text: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        for &byte in text {
            buffer.put(byte);
        }
        Ok(text.len())
    }

    fn write_console_output(
        &self,
        handle: RawHandle,
        cells: &[CharInfo],
        buffer_size: Coord,
        buffer_coord: Coord,
        region: &mut SmallRect,
    ) -> io::Result<()> {
        if cells.len() < cell_count(buffer_size) {
            return Err(invalid("source buffer smaller than buffer size"));
        }
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let clipped = buffer.clip(*region, buffer_size, buffer_coord)?;
        for row in 0..clipped.height() {
            for col in 0..clipped.width() {
                let src = (buffer_coord.y as usize + row) * buffer_size.x as usize
                    + buffer_coord.x as usize
                    + col;
                let dst = buffer.index(Coord::new(clipped.left + col as i16, clipped.top + row as i16));
                buffer.cells[dst] = cells[src];
            }
        }
        *region = clipped;
        Ok(())
    }

    fn read_console_output(
        &self,
        handle: RawHandle,
        cells: &mut [CharInfo],
        buffer_size: Coord,
        buffer_coord: Coord,
        region: &mut SmallRect,
    ) -> io::Result<()> {
        if cells.len() < cell_count(buffer_size) {
            return Err(invalid("destination buffer smaller than buffer size"));
        }
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let clipped = buffer.clip(*region, buffer_size, buffer_coord)?;
        for row in 0..clipped.height() {
            for col in 0..clipped.width() {
                let dst = (buffer_coord.y as usize + row) * buffer_size.x as usize
                    + buffer_coord.x as usize
                    + col;
                let src = buffer.index(Coord::new(clipped.left + col as i16, clipped.top + row as i16));
                cells[dst] = buffer.cells[src];
            }
        }
        *region = clipped;
        Ok(())
    }

    fn fill_console_output_attribute(
        &self,
        handle: RawHandle,
        attribute: u16,
        length: u32,
        coord: Coord,
    ) -> io::Result<u32> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, length as usize)?;
        let n = range.len();
        for cell in &mut buffer.cells[range] {
            cell.attributes = attribute;
        }
        Ok(n as u32)
    }

    fn fill_console_output_character(
        &self,
        handle: RawHandle,
        ch: u8,
        length: u32,
        coord: Coord,
    ) -> io::Result<u32> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, length as usize)?;
        let n = range.len();
        for cell in &mut buffer.cells[range] {
            cell.ch = ConsoleChar::Narrow(ch);
        }
        Ok(n as u32)
    }

    fn read_console_output_attribute(
        &self,
        handle: RawHandle,
        out: &mut [u16],
        coord: Coord,
    ) -> io::Result<usize> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, out.len())?;
        let n = range.len();
        for (slot, cell) in out.iter_mut().zip(&buffer.cells[range]) {
            *slot = cell.attributes;
        }
        Ok(n)
    }

    fn read_console_output_character(
        &self,
        handle: RawHandle,
        out: &mut [u8],
        coord: Coord,
    ) -> io::Result<usize> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, out.len())?;
        let n = range.len();
        for (slot, cell) in out.iter_mut().zip(&buffer.cells[range]) {
            *slot = cell.ch.as_byte();
        }
        Ok(n)
    }

    fn write_console_output_attribute(
        &self,
        handle: RawHandle,
        attributes: &[u16],
        coord: Coord,
    ) -> io::Result<u32> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, attributes.len())?;
        let n = range.len();
        for (cell, attr) in buffer.cells[range].iter_mut().zip(attributes) {
            cell.attributes = *attr;
        }
        Ok(n as u32)
    }

    fn write_console_output_character(
        &self,
        handle: RawHandle,
        text: &[u8],
        coord: Coord,
    ) -> io::Result<u32> {
        let mut state = self.state.lock();
        let buffer = state.screen(handle)?;
        let range = buffer.linear_range(coord, text.len())?;
        let n = range.len();
        for (cell, byte) in buffer.cells[range].iter_mut().zip(text) {
            cell.ch = ConsoleChar::Narrow(*byte);
        }
        Ok(n as u32)
    }
}

fn cell_count(size: Coord) -> usize {
    size.x.max(0) as usize * size.y.max(0) as usize
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}
