//! Error classification shared by every kiln crate.
//!
//! Each crate owns its own `thiserror` enum; this module only defines how a
//! fatal error is classified so the command layer can pick an exit code and
//! diagnostic verbosity without knowing every concrete error type.

/// How a fatal error should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A user-facing failure: print the message and exit non-zero.
    Abort,
    /// Exit non-zero without printing anything (the cause was already reported).
    SilentAbort,
    /// A defect in kiln itself: print the message with a request to report it.
    Bug,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Abort | ErrorKind::SilentAbort => 1,
            ErrorKind::Bug => 2,
        }
    }
}

/// Implemented by every kiln error type.
pub trait FatalError: std::error::Error {
    /// Returns the classification of this error.
    fn kind(&self) -> ErrorKind;
}

/// Result alias for operations that can only fail because of a kiln defect.
pub type KilnResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in kiln, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl FatalError for InternalError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Bug
    }
}
