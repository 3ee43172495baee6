// ABOUTME: Error type for AT command execution, derived from a completed Response
// ABOUTME: Lets driver code use `?` on command results instead of inspecting result codes

use thiserror::Error;

/// Failure of a single AT command
///
/// Transport conditions (`Io`, `IoBroken`) and protocol conditions
/// (`Timeout`, `Error`, `Cme`, `Cms`) are kept apart so callers can decide
/// whether the channel itself is still usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtError {
    /// No terminator arrived before the deadline
    #[error("AT command timeout")]
    Timeout,

    /// Plain `ERROR` or another error terminator without a numeric code
    #[error("AT command failed: {status}")]
    Error { status: String },

    /// `+CME ERROR: <n>`
    #[error("+CME ERROR: {0}")]
    Cme(i32),

    /// `+CMS ERROR: <n>`
    #[error("+CMS ERROR: {0}")]
    Cms(i32),

    /// Write to the transport failed or was short
    #[error("AT channel I/O error")]
    Io,

    /// Transport is gone; the channel is stopped
    #[error("AT channel is broken")]
    IoBroken,
}

pub type AtResult<T> = Result<T, AtError>;
