// ABOUTME: Delayed-callback scheduler backed by a private tokio runtime
// ABOUTME: Passed to components that need "run this shortly", e.g. a follow-up command from a URC handler

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle for a scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

type Timers = Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>;

fn lock(timers: &Timers) -> MutexGuard<'_, HashMap<TimerId, JoinHandle<()>>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot timers whose callbacks run on tokio's blocking pool.
///
/// Callbacks may block, so they are free to call
/// [`AtChannel::send_command`](crate::at::AtChannel::send_command).
///
/// ```rust
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use usbmodem::scheduler::Scheduler;
///
/// let scheduler = Scheduler::new().unwrap();
/// let (tx, rx) = mpsc::channel();
/// scheduler.set_timeout(Duration::from_millis(10), move || tx.send("fired").unwrap());
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("fired"));
/// ```
pub struct Scheduler {
    runtime: Option<Runtime>,
    timers: Timers,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("modem-scheduler")
            .enable_time()
            .build()?;

        Ok(Self {
            runtime: Some(runtime),
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }

    /// Run `callback` once after `delay`
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let Some(runtime) = &self.runtime else {
            return id;
        };

        // Held across spawn so the task cannot finish before it is registered
        let mut timers = lock(&self.timers);
        let registry = self.timers.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if lock(&registry).remove(&id).is_none() {
                return;
            }
            if let Err(e) = tokio::task::spawn_blocking(callback).await {
                error!("Scheduled callback {id} failed: {e}");
            }
        });
        timers.insert(id, handle);

        debug!("Scheduled {id} in {delay:?}");
        id
    }

    /// Cancel a timer that has not fired yet. Returns `false` if it already
    /// fired or was cancelled before.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        match lock(&self.timers).remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Timers that have not fired yet
    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // The last handle may be dropped from inside one of our own callbacks
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
