//! Byte-level link to the modem's AT port.
//!
//! The [`Transport`] trait abstracts over the physical device so the AT
//! channel can run against a real serial port ([`SerialTransport`]) or a
//! scripted mock in tests. Implementations are shared between the reader
//! thread and command callers, so every method takes `&self`.

pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

pub use serial::{SerialConfig, SerialTransport};

use std::io;
use std::time::Duration;

/// Outcome of a bounded read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n` bytes were placed at the start of the buffer
    Data(usize),
    /// Nothing arrived before the timeout
    WouldBlock,
    /// [`Transport::interrupt`] was called
    Interrupted,
    /// The device is gone; no further reads will succeed
    Broken,
}

pub trait Transport: Send + Sync {
    /// Read whatever is available, waiting at most `timeout` for the first byte.
    ///
    /// Signal interruptions of the underlying syscall are retried internally
    /// and never reported.
    fn read_chunk(&self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadStatus>;

    /// Write `data`, giving up after `timeout`.
    ///
    /// Returns the number of bytes written; a short count means the deadline
    /// passed first.
    fn write(&self, data: &[u8], timeout: Duration) -> io::Result<usize>;

    /// Unblock a read in progress. If no read is in progress the next one
    /// returns [`ReadStatus::Interrupted`] immediately.
    fn interrupt(&self);
}
