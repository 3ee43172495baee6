// ABOUTME: AT command channel: one serialized command slot plus a background reader thread
// ABOUTME: Classifies every received line as a terminator, response data or an unsolicited result code

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tracing::{debug, error, warn};

use super::config::ChannelConfig;
use super::response::{Response, ResultCode};
use super::semaphore::Semaphore;
use super::unsolicited::{UnsolicitedHandler, UnsolicitedRegistry};
use crate::transport::{ReadStatus, Transport};

/// How the lines following a command are attributed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultKind {
    /// Lines starting with the prefix are data, everything else is unsolicited
    #[default]
    Default,
    /// A prefixed line opens a data entry; plain lines continue the previous one
    Multiline,
    /// Prefixed lines or lines starting with a digit are data
    Numeric,
    /// Only a terminator is expected
    NoResponse,
    /// Every line is data and is also dispatched as unsolicited
    NoPrefix,
    /// `ATD` / `AT+CGDATA`: `CONNECT` succeeds, `NO CARRIER` and friends fail
    Dial,
}

/// Picks a timeout for a command from its text, e.g. longer ones for `AT+CFUN`
pub type TimeoutResolver = Arc<dyn Fn(&str) -> Option<Duration> + Send + Sync>;

/// Called once from the reader thread when the transport goes away
pub type IoBrokenHandler = Arc<dyn Fn() + Send + Sync>;

/// Called after any failed command with its result and the time it was issued
pub type ErrorHandler = Arc<dyn Fn(ResultCode, Instant) + Send + Sync>;

#[derive(Default)]
struct Hooks {
    timeout_resolver: Option<TimeoutResolver>,
    io_broken: Option<IoBrokenHandler>,
    any_error: Option<ErrorHandler>,
}

struct Pending {
    kind: ResultKind,
    prefix: String,
    response: Response,
}

/// Hand-off point between the command caller and the reader thread.
///
/// The caller moves a fresh response in as `Pending`; the reader fills it and
/// moves it to `Done` before posting the completion semaphore.
#[derive(Default)]
enum Slot {
    #[default]
    Idle,
    Pending(Pending),
    Done(Response),
}

/// What to do with a line received while a command is outstanding
#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Complete(ResultCode),
    Data,
    DataAndUnsolicited,
    Continuation,
    /// Stray text before the first data entry of a multiline reply
    Discard,
    Unsolicited,
}

struct Shared {
    transport: Arc<dyn Transport>,
    config: ChannelConfig,
    command_lock: Mutex<()>,
    slot: Mutex<Slot>,
    done: Semaphore,
    stopped: AtomicBool,
    busy: AtomicBool,
    unsolicited: UnsolicitedRegistry,
    hooks: RwLock<Hooks>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// AT command channel bound to one transport
///
/// Commands from any number of threads are executed one at a time. Lines that
/// do not belong to the outstanding command are handed to the unsolicited
/// handlers on the reader thread, so handlers must not block for long. A
/// handler that needs to issue a command should schedule it (see
/// [`Scheduler`](crate::scheduler::Scheduler)) instead of calling the channel
/// directly, because the reader cannot complete a command while it is busy
/// running the handler.
///
/// ```no_run
/// use std::sync::Arc;
/// use usbmodem::at::{AtChannel, ChannelConfig};
/// use usbmodem::transport::{SerialConfig, SerialTransport};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB2"))?;
/// let channel = AtChannel::new(Arc::new(transport), ChannelConfig::default());
/// channel.on_unsolicited("+CREG", |line| println!("registration: {line}"));
/// channel.start()?;
///
/// let response = channel.send_command("AT+CSQ", "+CSQ").into_result()?;
/// println!("{}", response.data());
/// # Ok(())
/// # }
/// ```
pub struct AtChannel {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl AtChannel {
    pub fn new(transport: Arc<dyn Transport>, config: ChannelConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                command_lock: Mutex::new(()),
                slot: Mutex::new(Slot::Idle),
                done: Semaphore::new(),
                stopped: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                unsolicited: UnsolicitedRegistry::new(),
                hooks: RwLock::new(Hooks::default()),
            }),
            reader: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    /// Spawn the reader thread. Calling it on a running channel does nothing.
    pub fn start(&self) -> io::Result<()> {
        let mut reader = lock(&self.reader);
        if reader.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        self.shared.stopped.store(false, Ordering::Release);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("at-reader".to_string())
            .spawn(move || shared.read_loop())?;
        *reader = Some(handle);

        debug!("AT channel started");
        Ok(())
    }

    /// Stop the reader thread and fail any outstanding command with `IoBroken`.
    ///
    /// Safe to call from an unsolicited or broken-transport handler; the reader
    /// thread is then left to exit on its own instead of being joined.
    pub fn stop(&self) {
        self.shared.shut_down();
        self.shared.transport.interrupt();

        let handle = lock(&self.reader).take();
        if let Some(handle) = handle
            && handle.thread().id() != thread::current().id()
            && handle.join().is_err()
        {
            error!("AT reader thread panicked");
        }

        debug!("AT channel stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.shared.stopped.load(Ordering::Acquire)
            && lock(&self.reader)
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// A command is currently being executed
    pub fn busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Run one command and wait for its result.
    ///
    /// `timeout` overrides the resolver and the configured default.
    pub fn send(
        &self,
        kind: ResultKind,
        cmd: &str,
        prefix: &str,
        timeout: Option<Duration>,
    ) -> Response {
        self.shared.execute(kind, cmd, prefix, timeout)
    }

    pub fn send_command(&self, cmd: &str, prefix: &str) -> Response {
        self.send(ResultKind::Default, cmd, prefix, None)
    }

    pub fn send_command_no_prefix(&self, cmd: &str) -> Response {
        self.send(ResultKind::NoPrefix, cmd, "", None)
    }

    pub fn send_command_multiline(&self, cmd: &str, prefix: &str) -> Response {
        self.send(ResultKind::Multiline, cmd, prefix, None)
    }

    pub fn send_command_numeric(&self, cmd: &str) -> Response {
        self.send(ResultKind::Numeric, cmd, "", None)
    }

    /// Numeric reply that some firmwares prefix, e.g. `AT+CGSN` answering
    /// either `35...` or `+CGSN: 35...`
    pub fn send_command_numeric_or_with_prefix(&self, cmd: &str, prefix: &str) -> Response {
        self.send(ResultKind::Numeric, cmd, prefix, None)
    }

    pub fn send_command_no_response(&self, cmd: &str) -> ResultCode {
        self.send(ResultKind::NoResponse, cmd, "", None).error
    }

    pub fn send_command_dial(&self, cmd: &str) -> Response {
        self.send(ResultKind::Dial, cmd, "", None)
    }

    /// The modem knows `cmd`: it answered `OK` or a `+CME`/`+CMS` error
    /// rather than a bare `ERROR`.
    pub fn check_command_exists(&self, cmd: &str) -> bool {
        let response = self.send(ResultKind::NoResponse, cmd, "", None);
        match response.error {
            ResultCode::Success => true,
            ResultCode::Error => {
                response.status.starts_with("+CME ERROR") || response.status.starts_with("+CMS ERROR")
            }
            _ => false,
        }
    }

    /// Handle unsolicited `<prefix>: ...` lines
    pub fn on_unsolicited<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared
            .unsolicited
            .register(format!("{prefix}:"), Arc::new(handler));
    }

    /// Handle lines starting with `prefix` exactly, e.g. `RING`
    pub fn on_unsolicited_raw<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let handler: UnsolicitedHandler = Arc::new(handler);
        self.shared.unsolicited.register(prefix, handler);
    }

    pub fn reset_unsolicited_handlers(&self) {
        self.shared.unsolicited.clear();
    }

    pub fn set_timeout_resolver<F>(&self, resolver: F)
    where
        F: Fn(&str) -> Option<Duration> + Send + Sync + 'static,
    {
        self.shared.hooks_mut().timeout_resolver = Some(Arc::new(resolver));
    }

    pub fn on_io_broken<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.hooks_mut().io_broken = Some(Arc::new(handler));
    }

    pub fn on_any_error<F>(&self, handler: F)
    where
        F: Fn(ResultCode, Instant) + Send + Sync + 'static,
    {
        self.shared.hooks_mut().any_error = Some(Arc::new(handler));
    }
}

impl Drop for AtChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AtChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtChannel")
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .field("busy", &self.busy())
            .field("unsolicited", &self.shared.unsolicited)
            .finish()
    }
}

impl Shared {
    fn hooks(&self) -> std::sync::RwLockReadGuard<'_, Hooks> {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn hooks_mut(&self) -> std::sync::RwLockWriteGuard<'_, Hooks> {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_timeout(&self, cmd: &str, timeout: Option<Duration>) -> Duration {
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            return timeout;
        }
        let resolver = self.hooks().timeout_resolver.clone();
        resolver
            .and_then(|resolve| resolve(cmd))
            .filter(|t| !t.is_zero())
            .unwrap_or(self.config.default_timeout)
    }

    fn execute(
        &self,
        kind: ResultKind,
        cmd: &str,
        prefix: &str,
        timeout: Option<Duration>,
    ) -> Response {
        let kind = match kind {
            ResultKind::Default | ResultKind::Multiline if prefix.is_empty() => {
                ResultKind::NoResponse
            }
            kind => kind,
        };

        let guard = lock(&self.command_lock);

        if self.stopped.load(Ordering::Acquire) {
            error!("AT command '{cmd}' rejected: channel is stopped");
            return Response::with_error(ResultCode::IoBroken);
        }

        let timeout = self.resolve_timeout(cmd, timeout);
        let start = Instant::now();

        {
            // The reader may have seen the transport break since the check above
            let mut slot = lock(&self.slot);
            if self.stopped.load(Ordering::Acquire) {
                error!("AT command '{cmd}' rejected: channel is stopped");
                return Response::with_error(ResultCode::IoBroken);
            }
            *slot = Slot::Pending(Pending {
                kind,
                prefix: prefix.to_string(),
                response: Response::default(),
            });
        }
        self.busy.store(true, Ordering::Release);

        if self.config.verbose {
            debug!("AT >> {cmd}");
        }

        let frame = format!("{cmd}\r");
        let response = match self.transport.write(frame.as_bytes(), timeout) {
            Ok(n) if n == frame.len() => self.wait_response(cmd, start, timeout),
            Ok(n) => {
                error!("AT command '{cmd}' short write: {n} of {} bytes", frame.len());
                self.abandon_pending(ResultCode::IoError)
            }
            Err(e) => {
                error!("AT command '{cmd}' write failed: {e}");
                self.abandon_pending(ResultCode::IoError)
            }
        };

        if self.config.verbose {
            for line in &response.lines {
                debug!("AT << {line}");
            }
            if !response.status.is_empty() {
                debug!("AT << {}", response.status);
            }
        }
        if response.error == ResultCode::Error {
            error!("AT command '{cmd}' failed: {}", response.status);
        }

        self.busy.store(false, Ordering::Release);
        drop(guard);

        if response.error != ResultCode::Success {
            let handler = self.hooks().any_error.clone();
            if let Some(handler) = handler {
                handler(response.error, start);
            }
        }

        response
    }

    fn wait_response(&self, cmd: &str, start: Instant, timeout: Duration) -> Response {
        let remaining = timeout.saturating_sub(start.elapsed());
        let signalled = self.done.wait(remaining);

        let mut slot = lock(&self.slot);
        match std::mem::take(&mut *slot) {
            Slot::Done(response) => {
                // Completed between the wait expiring and taking the slot
                if !signalled {
                    self.done.try_wait();
                }
                response
            }
            Slot::Pending(pending) => {
                error!("AT command '{cmd}' timeout after {timeout:?}");
                let mut response = pending.response;
                response.error = ResultCode::Timeout;
                response
            }
            Slot::Idle => Response::with_error(ResultCode::IoBroken),
        }
    }

    fn abandon_pending(&self, error: ResultCode) -> Response {
        let mut slot = lock(&self.slot);
        match std::mem::take(&mut *slot) {
            Slot::Pending(pending) => {
                let mut response = pending.response;
                response.error = error;
                response
            }
            Slot::Done(response) => {
                self.done.try_wait();
                response
            }
            Slot::Idle => Response::with_error(error),
        }
    }

    /// Refuse further commands and fail the outstanding one with `IoBroken`.
    ///
    /// The flag is set under the slot lock so `execute` never installs a
    /// command after this point.
    fn shut_down(&self) {
        let mut slot = lock(&self.slot);
        self.stopped.store(true, Ordering::Release);
        self.finish(&mut slot, ResultCode::IoBroken, "");
    }

    /// Finish the outstanding command, if any, and wake its caller
    fn finish(&self, slot: &mut Slot, error: ResultCode, status: &str) {
        if let Slot::Pending(pending) = std::mem::take(slot) {
            let mut response = pending.response;
            response.error = error;
            response.status = status.to_string();
            *slot = Slot::Done(response);
            self.done.post();
        }
    }

    fn read_loop(&self) {
        let mut chunk = vec![0u8; self.config.read_chunk.max(1)];
        let mut line = BytesMut::with_capacity(self.config.read_chunk);

        while !self.stopped.load(Ordering::Acquire) {
            match self.transport.read_chunk(&mut chunk, self.config.read_timeout) {
                Ok(ReadStatus::Data(n)) => {
                    for &byte in &chunk[..n] {
                        line.put_u8(byte);
                        if line.ends_with(b"\r\n") {
                            line.truncate(line.len() - 2);
                            if !line.is_empty() {
                                let text = String::from_utf8_lossy(&line).into_owned();
                                self.handle_line(&text);
                            }
                            line.clear();
                        } else if line.len() > self.config.max_line_length {
                            warn!(
                                "AT line exceeds {} bytes, discarding",
                                self.config.max_line_length
                            );
                            line.clear();
                        }
                    }
                }
                Ok(ReadStatus::WouldBlock) | Ok(ReadStatus::Interrupted) => continue,
                Ok(ReadStatus::Broken) => {
                    self.handle_broken();
                    break;
                }
                Err(e) => {
                    error!("AT channel read error: {e}");
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }

    fn handle_broken(&self) {
        error!("AT channel transport is broken");
        self.shut_down();

        let handler = self.hooks().io_broken.clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    fn handle_line(&self, line: &str) {
        let dispatch = {
            let mut slot = lock(&self.slot);
            let action = match &*slot {
                Slot::Pending(pending) => classify(pending, line),
                _ => LineAction::Unsolicited,
            };

            match action {
                LineAction::Complete(result) => {
                    self.finish(&mut slot, result, line);
                    false
                }
                LineAction::Data | LineAction::DataAndUnsolicited => {
                    if let Slot::Pending(pending) = &mut *slot {
                        pending.response.lines.push(line.to_string());
                    }
                    action == LineAction::DataAndUnsolicited
                }
                LineAction::Continuation => {
                    if let Slot::Pending(pending) = &mut *slot
                        && let Some(last) = pending.response.lines.last_mut()
                    {
                        last.push_str("\r\n");
                        last.push_str(line);
                    }
                    false
                }
                LineAction::Discard => false,
                LineAction::Unsolicited => true,
            }
        };

        if dispatch {
            if self.config.verbose {
                debug!("AT -- {line}");
            }
            self.unsolicited.dispatch(line);
        }
    }
}

fn is_success_line(line: &str, kind: ResultKind) -> bool {
    line.starts_with("OK") || (kind == ResultKind::Dial && line.starts_with("CONNECT"))
}

fn is_error_line(line: &str, kind: ResultKind) -> bool {
    if line.starts_with("ERROR") || line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR")
    {
        return true;
    }
    kind == ResultKind::Dial
        && ["NO CARRIER", "NO ANSWER", "NO DIALTONE"]
            .iter()
            .any(|terminator| line.starts_with(terminator))
}

fn classify(pending: &Pending, line: &str) -> LineAction {
    if is_success_line(line, pending.kind) {
        return LineAction::Complete(ResultCode::Success);
    }
    if is_error_line(line, pending.kind) {
        return LineAction::Complete(ResultCode::Error);
    }

    let prefixed = !pending.prefix.is_empty() && line.starts_with(&pending.prefix);
    match pending.kind {
        ResultKind::Default if prefixed => LineAction::Data,
        ResultKind::NoPrefix => LineAction::DataAndUnsolicited,
        ResultKind::Numeric if prefixed || line.starts_with(|c: char| c.is_ascii_digit()) => {
            LineAction::Data
        }
        ResultKind::Multiline if prefixed => LineAction::Data,
        ResultKind::Multiline if pending.response.lines.is_empty() => LineAction::Discard,
        ResultKind::Multiline if !line.starts_with(['+', '*', '^']) => LineAction::Continuation,
        _ => LineAction::Unsolicited,
    }
}
