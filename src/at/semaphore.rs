// ABOUTME: Counting semaphore with a bounded wait, used to park a command's caller until completion
// ABOUTME: Built on Mutex + Condvar; spurious wake-ups are absorbed inside `wait`

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release one permit and wake one waiter
    pub fn post(&self) {
        let mut permits = self.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Take a permit, blocking for at most `timeout`.
    ///
    /// Returns `false` if the deadline passed first.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.lock();

        while *permits == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            permits = self
                .available
                .wait_timeout(permits, deadline - now)
                .expect("semaphore state corrupted")
                .0;
        }

        *permits -= 1;
        true
    }

    /// Take a permit if one is available right now
    pub fn try_wait(&self) -> bool {
        let mut permits = self.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// A poisoned lock means a panic while the count was being changed.
    /// The count can no longer be trusted, so this is fatal.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().expect("semaphore state corrupted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_times_out_without_post() {
        let sem = Semaphore::new();
        let start = Instant::now();
        assert!(!sem.wait(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn post_before_wait_is_kept() {
        let sem = Semaphore::new();
        sem.post();
        sem.post();
        assert!(sem.wait(Duration::ZERO));
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn post_wakes_waiter() {
        let sem = Arc::new(Semaphore::new());
        let waiter = {
            let sem = sem.clone();
            thread::spawn(move || sem.wait(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        sem.post();
        assert!(waiter.join().unwrap());
    }
}
