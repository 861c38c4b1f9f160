use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{Error, Result};

/// One-way latch with interruptible waits.
///
/// Used both as the process-wide readiness flag that background loops wait
/// on before touching shared state, and as the stop signal that wakes a loop
/// sleeping between cycles.
#[derive(Debug, Default)]
pub struct Signal {
    set: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latch and wake every waiter.
    pub fn set(&self) {
        *self.set.lock() = true;
        self.condvar.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Wait until the latch is set or the timeout elapses.
    ///
    /// Returns `true` if the latch is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut set = self.set.lock();
        if !*set {
            self.condvar.wait_while_for(&mut set, |set| !*set, timeout);
        }
        *set
    }

    /// Wait for the latch with a bounded number of attempts.
    pub fn wait_ready(&self, policy: StartupPolicy) -> Result<()> {
        self.wait_ready_while(policy, || true).map(|_| ())
    }

    /// Like [`Signal::wait_ready`], but gives up early once `keep_waiting`
    /// returns false. Returns `Ok(false)` when abandoned.
    pub fn wait_ready_while(
        &self,
        policy: StartupPolicy,
        mut keep_waiting: impl FnMut() -> bool,
    ) -> Result<bool> {
        for attempt in 1..=policy.max_attempts {
            if !keep_waiting() {
                return Ok(false);
            }
            if self.wait_timeout(policy.interval) {
                return Ok(true);
            }
            debug!(
                "Waiting for readiness (attempt {}/{})",
                attempt, policy.max_attempts
            );
        }
        Err(Error::StartupTimeout {
            attempts: policy.max_attempts,
        })
    }
}

/// Bounded readiness retries at loop startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_initial_state() {
        let signal = Signal::new();
        assert!(!signal.is_set());
        signal.set();
        assert!(signal.is_set());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let signal = Signal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_interrupted() {
        let signal = Arc::new(Signal::new());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let set = waiter.wait_timeout(Duration::from_secs(10));
            (set, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.set();

        let (set, elapsed) = handle.join().unwrap();
        assert!(set);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_ready_times_out() {
        let signal = Signal::new();
        let policy = StartupPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(5),
        };
        assert!(matches!(
            signal.wait_ready(policy),
            Err(Error::StartupTimeout { attempts: 3 })
        ));
    }

    #[test]
    fn test_wait_ready_abandoned() {
        let signal = Signal::new();
        let mut polls = 0;
        let ready = signal
            .wait_ready_while(StartupPolicy::default(), || {
                polls += 1;
                polls < 3
            })
            .unwrap();
        assert!(!ready);
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_wait_ready_already_set() {
        let signal = Signal::new();
        signal.set();
        let start = Instant::now();
        signal.wait_ready(StartupPolicy::default()).unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
