// ABOUTME: Scripted in-memory transport for exercising the AT channel without hardware
// ABOUTME: Records every write and can answer commands automatically or on demand

use std::collections::VecDeque;
use std::io;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{ReadStatus, Transport};

#[derive(Default)]
struct MockState {
    incoming: VecDeque<u8>,
    /// Command text (without CR) mapped to the bytes queued when it is written
    replies: Vec<(String, Vec<u8>)>,
    sent: Vec<String>,
    broken: bool,
    interrupted: bool,
    fail_writes: bool,
    short_writes: bool,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    state: Mutex<MockState>,
    readable: Condvar,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue bytes for the reader as if the modem sent them
    pub(crate) fn push(&self, data: &str) {
        self.lock().incoming.extend(data.as_bytes());
        self.readable.notify_all();
    }

    /// Answer `command` with `reply` whenever it is written.
    /// Replies registered for the same command are used first-in first-out.
    pub(crate) fn respond(&self, command: &str, reply: &str) {
        self.lock()
            .replies
            .push((command.to_string(), reply.as_bytes().to_vec()));
    }

    /// Make the device disappear
    pub(crate) fn break_link(&self) {
        self.lock().broken = true;
        self.readable.notify_all();
    }

    pub(crate) fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    pub(crate) fn short_writes(&self) {
        self.lock().short_writes = true;
    }

    /// Commands written so far, without the trailing CR
    pub(crate) fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }
}

impl Transport for MockTransport {
    fn read_chunk(&self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if state.interrupted {
                state.interrupted = false;
                return Ok(ReadStatus::Interrupted);
            }
            if !state.incoming.is_empty() {
                let n = buf.len().min(state.incoming.len());
                for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
                    *slot = byte;
                }
                return Ok(ReadStatus::Data(n));
            }
            if state.broken {
                return Ok(ReadStatus::Broken);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(ReadStatus::WouldBlock);
            }
            state = self.readable.wait_timeout(state, deadline - now).unwrap().0;
        }
    }

    fn write(&self, data: &[u8], _timeout: Duration) -> io::Result<usize> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(io::Error::other("mock write failure"));
        }
        if state.short_writes {
            return Ok(data.len() / 2);
        }

        let text = String::from_utf8_lossy(data);
        let command = text.trim_end_matches('\r').to_string();
        if let Some(pos) = state.replies.iter().position(|(cmd, _)| *cmd == command) {
            let (_, reply) = state.replies.remove(pos);
            state.incoming.extend(reply);
            self.readable.notify_all();
        }
        state.sent.push(command);

        Ok(data.len())
    }

    fn interrupt(&self) {
        self.lock().interrupted = true;
        self.readable.notify_all();
    }
}
