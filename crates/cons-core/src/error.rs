//! Error types shared by the console binding crates.
//!
//! # Error classes
//!
//! The binding distinguishes two classes of failure:
//!
//! - **Fatal input errors** ([`ConsError`]): the caller passed something
//!   malformed (wrong shape, unknown flag, closed handle). These are raised
//!   to the host immediately and the console API is never reached.
//! - **Operation failures** (`std::io::Error` from [`ConsoleApi`]): the
//!   console declined a well-formed request. The dispatch layer reports
//!   these as an absent result (`nil` / `false`) instead of raising.
//!
//! [`ConsoleApi`]: crate::ConsoleApi

use thiserror::Error;

/// Machine-readable error code interface.
///
/// Codes are UPPER_SNAKE_CASE and stable once published.
///
/// # Example
///
/// ```
/// use cons_core::{ConsError, ErrorCode};
///
/// let err = ConsError::ClosedHandle;
/// assert_eq!(err.code(), "CONS_CLOSED_HANDLE");
/// assert!(!err.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Whether retrying or caller action may make the operation succeed.
    fn is_recoverable(&self) -> bool;
}

/// Fatal input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsError {
    /// An argument had the wrong shape or value.
    #[error("bad argument #{position} to '{function}' ({reason})")]
    BadArgument {
        /// Function or method the argument was passed to.
        function: String,
        /// 1-based argument position.
        position: usize,
        /// Short description of what is wrong.
        reason: String,
    },

    /// A symbolic flag name is not present in the flag table.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// The handle was already closed.
    #[error("access to closed handle")]
    ClosedHandle,
}

impl ConsError {
    /// Creates a bad argument error.
    pub fn bad_argument(
        function: impl Into<String>,
        position: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::BadArgument {
            function: function.into(),
            position,
            reason: reason.into(),
        }
    }

    /// Attaches call-site context to a context-free error.
    ///
    /// [`ConsError::UnknownFlag`] and [`ConsError::ClosedHandle`] become
    /// [`ConsError::BadArgument`] at `position`; an existing
    /// `BadArgument` is returned unchanged.
    #[must_use]
    pub fn at(self, function: &str, position: usize) -> Self {
        match self {
            Self::BadArgument { .. } => self,
            Self::UnknownFlag(_) => Self::bad_argument(function, position, "invalid flag"),
            Self::ClosedHandle => Self::bad_argument(function, position, "access to closed handle"),
        }
    }
}

impl ErrorCode for ConsError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadArgument { .. } => "CONS_BAD_ARGUMENT",
            Self::UnknownFlag(_) => "CONS_UNKNOWN_FLAG",
            Self::ClosedHandle => "CONS_CLOSED_HANDLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Result alias for fatal-input-checked operations.
pub type Result<T> = std::result::Result<T, ConsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_argument_display() {
        let err = ConsError::bad_argument("ReadConsoleInput", 2, "invalid number of records");
        assert_eq!(
            err.to_string(),
            "bad argument #2 to 'ReadConsoleInput' (invalid number of records)"
        );
    }

    #[test]
    fn at_wraps_context_free_errors() {
        let err = ConsError::ClosedHandle.at("GetConsoleMode", 1);
        assert_eq!(
            err.to_string(),
            "bad argument #1 to 'GetConsoleMode' (access to closed handle)"
        );

        let err = ConsError::UnknownFlag("BOGUS".into()).at("GetStdHandle", 1);
        assert!(err.to_string().contains("invalid flag"));
    }

    #[test]
    fn at_keeps_existing_position() {
        let err = ConsError::bad_argument("WriteConsoleInput", 2, "empty array");
        assert_eq!(err.clone().at("Other", 5), err);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            ConsError::bad_argument("f", 1, "x").code(),
            "CONS_BAD_ARGUMENT"
        );
        assert_eq!(ConsError::UnknownFlag("X".into()).code(), "CONS_UNKNOWN_FLAG");
        assert!(!ConsError::ClosedHandle.is_recoverable());
    }
}
