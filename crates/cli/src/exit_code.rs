//! Process exit codes
//!
//! Scripts branch on these numbers, so a value never changes meaning once
//! released.

use nav_core::Error;

/// Outcome class a command reports to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments, a malformed remote path or an invalid profile
    UsageError = 2,
    /// Timeouts and dropped connections; retrying may succeed
    NetworkError = 3,
    /// Rejected credentials or a denied request
    AuthError = 4,
    /// Missing profile, bucket or object
    NotFound = 5,
    /// Something already exists where a command would create it
    Conflict = 6,
    /// Ctrl-C, or a transfer cancelled at a conflict prompt
    Interrupted = 130,
}

impl ExitCode {
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Code a command exits with after failing on `error`
    pub fn from_error(error: &Error) -> Self {
        match error.exit_code() {
            2 => Self::UsageError,
            3 => Self::NetworkError,
            4 => Self::AuthError,
            5 => Self::NotFound,
            6 => Self::Conflict,
            130 => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}
