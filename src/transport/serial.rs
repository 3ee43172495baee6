// ABOUTME: Transport implementation for USB / UART serial devices on top of the serialport crate
// ABOUTME: Reads are sliced into short polls so an interrupt request is honoured promptly

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::debug;

use super::{ReadStatus, Transport};

/// Serial port settings. Framing is always 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device node, e.g. `/dev/ttyUSB2`
    pub path: String,
    /// Baud rate (default: 115200)
    pub baud_rate: u32,
    /// Longest single blocking read; bounds how late an interrupt is noticed
    /// (default: 100 ms)
    pub poll_interval: Duration,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: 115_200,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// An open serial device with independent read and write handles
pub struct SerialTransport {
    reader: Mutex<Box<dyn SerialPort>>,
    writer: Mutex<Box<dyn SerialPort>>,
    interrupted: AtomicBool,
    poll_interval: Duration,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> io::Result<Self> {
        let reader = serialport::new(&config.path, config.baud_rate)
            .timeout(config.poll_interval)
            .open()?;
        let writer = reader.try_clone()?;

        debug!("Opened {} at {} baud", config.path, config.baud_rate);

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            interrupted: AtomicBool::new(false),
            poll_interval: config.poll_interval,
        })
    }

    fn lock(port: &Mutex<Box<dyn SerialPort>>) -> MutexGuard<'_, Box<dyn SerialPort>> {
        port.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SerialTransport {
    fn read_chunk(&self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadStatus> {
        let deadline = Instant::now() + timeout;
        let mut port = Self::lock(&self.reader);

        loop {
            if self.interrupted.swap(false, Ordering::AcqRel) {
                return Ok(ReadStatus::Interrupted);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(ReadStatus::WouldBlock);
            }
            port.set_timeout(remaining.min(self.poll_interval))?;

            match port.read(buf) {
                Ok(0) => return Ok(ReadStatus::Broken),
                Ok(n) => return Ok(ReadStatus::Data(n)),
                Err(e) => match e.kind() {
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof => return Ok(ReadStatus::Broken),
                    _ => return Err(e),
                },
            }
        }
    }

    fn write(&self, data: &[u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut port = Self::lock(&self.writer);
        let mut written = 0;

        while written < data.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining)?;

            match port.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }

        port.flush()?;
        Ok(written)
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}
