use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use strum::{Display, FromRepr};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::sync::{Signal, StartupPolicy};

/// How long `Drop` waits for a loop to observe its stop flag
pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of a background loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum LoopState {
    Uninitialized,
    /// Waiting for the readiness signal
    Attaching,
    Running,
    Stopped,
}

/// Startup and pacing parameters shared by every background loop
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    pub startup: StartupPolicy,
    /// Pause between cycles; zero yields the scheduler instead of sleeping
    pub cadence: Duration,
}

/// A named thread running one polling loop.
///
/// The loop waits for `readiness`, then runs `cycle` until stopped. A panic
/// inside `cycle` is caught and ends the loop.
pub struct Worker {
    name: String,
    running: Arc<AtomicBool>,
    wake: Arc<Signal>,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Worker {
    pub fn spawn<F>(
        name: &str,
        readiness: Arc<Signal>,
        options: LoopOptions,
        mut cycle: F,
    ) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Signal::new());
        let state = Arc::new(AtomicU8::new(LoopState::Uninitialized as u8));

        let handle = {
            let name = name.to_string();
            let running = Arc::clone(&running);
            let wake = Arc::clone(&wake);
            let state = Arc::clone(&state);
            thread::Builder::new().name(name.clone()).spawn(move || {
                let set_state = |s: LoopState| state.store(s as u8, Ordering::Release);

                set_state(LoopState::Attaching);
                match readiness
                    .wait_ready_while(options.startup, || running.load(Ordering::Acquire))
                {
                    Ok(true) => {}
                    Ok(false) => {
                        set_state(LoopState::Stopped);
                        return;
                    }
                    Err(e) => {
                        error!("{}: {}", name, e);
                        set_state(LoopState::Stopped);
                        return;
                    }
                }

                set_state(LoopState::Running);
                info!("{} running", name);

                while running.load(Ordering::Acquire) {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&mut cycle)) {
                        error!("{} panicked: {}", name, panic_message(payload.as_ref()));
                        break;
                    }

                    if options.cadence.is_zero() {
                        thread::yield_now();
                    } else if wake.wait_timeout(options.cadence) {
                        break;
                    }
                }

                set_state(LoopState::Stopped);
                debug!("{} stopped", name);
            })?
        };

        Ok(Self {
            name: name.to_string(),
            running,
            wake,
            state,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_repr(self.state.load(Ordering::Acquire)).unwrap_or(LoopState::Stopped)
    }

    /// Clear the running flag and join, detaching the thread if it does not
    /// finish within `grace`.
    pub fn stop(&mut self, grace: Duration) {
        self.running.store(false, Ordering::Release);
        self.wake.set();

        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + grace;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("{} exited abnormally", self.name);
            }
        } else {
            warn!(
                "{} did not stop within {:?}, detaching thread",
                self.name, grace
            );
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop(DEFAULT_GRACE);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
