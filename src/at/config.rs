// ABOUTME: Tunables for the AT channel: command deadlines, reader buffer sizes and traffic logging
// ABOUTME: Built with chained `with_*` setters on top of sensible defaults

use std::time::Duration;

/// Configuration for an [`AtChannel`](super::AtChannel)
///
/// # Example
///
/// ```rust
/// use usbmodem::at::ChannelConfig;
/// use std::time::Duration;
///
/// let config = ChannelConfig::default()
///     .with_default_timeout(Duration::from_secs(5))
///     .with_verbose(true);
/// assert_eq!(config.read_chunk, 256);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Deadline for commands without an explicit or resolved timeout
    /// (default: 10 seconds)
    pub default_timeout: Duration,

    /// How long a single reader poll may block (default: 30 seconds)
    ///
    /// Stopping the channel interrupts the poll, so this only bounds how
    /// often the reader re-checks its state on an idle line.
    pub read_timeout: Duration,

    /// Bytes requested from the transport per read (default: 256)
    pub read_chunk: usize,

    /// Longest line kept while waiting for CRLF (default: 8 KiB).
    /// Longer garbage is dropped.
    pub max_line_length: usize,

    /// Log every command, response line and unsolicited line (default: false)
    pub verbose: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            read_chunk: 256,
            max_line_length: 8 * 1024,
            verbose: false,
        }
    }
}

impl ChannelConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
