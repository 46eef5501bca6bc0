//! Console handle lifecycle.
//!
//! A [`ConsoleHandle`] pairs a native handle value with a [`Lifecycle`] tag:
//!
//! | Lifecycle | Obtained from | Released by this crate |
//! |-----------|---------------|------------------------|
//! | `Borrowed` | `GetStdHandle` | never |
//! | `Owned` | `CreateConsoleScreenBuffer` | exactly once |
//!
//! An owned handle is released on [`ConsoleHandle::close`] or, failing
//! that, when the wrapper is dropped. After release the wrapper holds
//! [`RawHandle::INVALID`] and [`ConsoleHandle::validate`] rejects it.
//! The wrapper is not `Clone`, so a native handle has a single owner.

use crate::api::{ConsoleApi, RawHandle};
use crate::error::{ConsError, Result};
use std::fmt;
use std::sync::Arc;

/// Type name used in diagnostics.
pub const HANDLE_TYPE_NAME: &str = "StandardConsoleHandle";

/// Who is responsible for closing the native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Allocated by this layer; closed here.
    Owned,
    /// Process-wide handle; never closed here.
    Borrowed,
}

/// Native console handle with ownership tracking.
pub struct ConsoleHandle {
    raw: RawHandle,
    lifecycle: Lifecycle,
    api: Arc<dyn ConsoleApi>,
}

impl ConsoleHandle {
    /// Wraps a handle whose lifetime is managed elsewhere.
    pub fn borrowed(api: Arc<dyn ConsoleApi>, raw: RawHandle) -> Self {
        Self {
            raw,
            lifecycle: Lifecycle::Borrowed,
            api,
        }
    }

    /// Wraps a handle this layer must close.
    pub fn owned(api: Arc<dyn ConsoleApi>, raw: RawHandle) -> Self {
        Self {
            raw,
            lifecycle: Lifecycle::Owned,
            api,
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Current native value, possibly the invalid sentinel.
    #[must_use]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.raw.is_invalid()
    }

    /// Returns the native value of a live handle.
    ///
    /// # Errors
    ///
    /// [`ConsError::ClosedHandle`] if the handle holds the invalid sentinel.
    pub fn validate(&self) -> Result<RawHandle> {
        if self.raw.is_invalid() {
            return Err(ConsError::ClosedHandle);
        }
        Ok(self.raw)
    }

    /// Releases an owned handle. No-op for borrowed or already closed
    /// handles.
    pub fn close(&mut self) {
        self.release("close");
    }

    /// `<TypeName> (<native value>)`.
    ///
    /// A closed handle renders the invalid sentinel rather than failing.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{HANDLE_TYPE_NAME} ({})", self.raw)
    }

    fn release(&mut self, reason: &'static str) {
        if self.lifecycle != Lifecycle::Owned || self.raw.is_invalid() {
            return;
        }
        let raw = std::mem::replace(&mut self.raw, RawHandle::INVALID);
        match self.api.close_handle(raw) {
            Ok(()) => tracing::debug!(handle = %raw, reason, "Released console screen buffer"),
            Err(e) => tracing::warn!(handle = %raw, reason, error = %e, "CloseHandle failed"),
        }
    }
}

impl Drop for ConsoleHandle {
    fn drop(&mut self) {
        self.release("finalize");
    }
}

impl fmt::Display for ConsoleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for ConsoleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleHandle")
            .field("raw", &self.raw)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_console::{VirtualConsole, VirtualConsoleConfig};

    const STD_OUTPUT_HANDLE: u32 = -11i32 as u32;

    fn console() -> Arc<VirtualConsole> {
        Arc::new(VirtualConsole::new(VirtualConsoleConfig::default()))
    }

    fn new_buffer(console: &Arc<VirtualConsole>) -> ConsoleHandle {
        let raw = console
            .create_console_screen_buffer(0xC000_0000, 0x3, 1)
            .expect("create buffer");
        ConsoleHandle::owned(console.clone(), raw)
    }

    #[test]
    fn validate_live_handle() {
        let console = console();
        let handle = new_buffer(&console);
        assert_eq!(handle.validate().ok(), Some(handle.raw()));
        assert_eq!(handle.lifecycle(), Lifecycle::Owned);
    }

    #[test]
    fn close_owned_invalidates_and_releases_once() {
        let console = console();
        let mut handle = new_buffer(&console);
        let raw = handle.raw();

        handle.close();
        assert!(handle.is_closed());
        assert_eq!(handle.validate(), Err(ConsError::ClosedHandle));
        assert!(!console.is_live(raw));

        handle.close();
        assert!(handle.is_closed());
        assert_eq!(console.stats().handles_closed, 1);
    }

    #[test]
    fn close_borrowed_keeps_native_value() {
        let console = console();
        let raw = console.get_std_handle(STD_OUTPUT_HANDLE).expect("std handle");
        let mut handle = ConsoleHandle::borrowed(console.clone(), raw);

        handle.close();
        handle.close();
        assert_eq!(handle.raw(), raw);
        assert!(handle.validate().is_ok());
        assert_eq!(console.stats().handles_closed, 0);
    }

    #[test]
    fn drop_releases_owned() {
        let console = console();
        let raw = {
            let handle = new_buffer(&console);
            handle.raw()
        };
        assert!(!console.is_live(raw));
        assert_eq!(console.stats().handles_closed, 1);
    }

    #[test]
    fn drop_after_close_does_not_release_twice() {
        let console = console();
        {
            let mut handle = new_buffer(&console);
            handle.close();
        }
        assert_eq!(console.stats().handles_closed, 1);
    }

    #[test]
    fn drop_borrowed_never_releases() {
        let console = console();
        let raw = console.get_std_handle(STD_OUTPUT_HANDLE).expect("std handle");
        drop(ConsoleHandle::borrowed(console.clone(), raw));
        assert!(console.is_live(raw));
        assert_eq!(console.stats().handles_closed, 0);
    }

    #[test]
    fn describe_embeds_type_and_value() {
        let console = console();
        let raw = RawHandle(0x20);
        let handle = ConsoleHandle::borrowed(console, raw);
        assert_eq!(
            handle.describe(),
            "StandardConsoleHandle (0x0000000000000020)"
        );
        assert_eq!(handle.to_string(), handle.describe());
    }
}
