//! Periodic re-evaluation timers.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;
use ucon_kernel::Schedule;
use ucon_types::SessionKey;

struct TimerShared {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Lets a tick check whether its timer was cancelled meanwhile.
#[derive(Clone)]
pub(crate) struct CancelToken(Arc<TimerShared>);

impl CancelToken {
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.0.cancelled.lock()
    }
}

/// Runs a tick at a fixed rate on its own thread until cancelled.
///
/// The timer thread is detached: cancelling only stops future ticks, so a
/// tick may cancel its own timer.
pub(crate) struct ReevaluationTimer {
    shared: Arc<TimerShared>,
}

impl ReevaluationTimer {
    /// Starts a timer whose first tick fires after `initial_delay`.
    ///
    /// `tick` returns whether the timer should keep running.
    pub(crate) fn spawn<F>(
        key: &SessionKey,
        initial_delay: Duration,
        period: Duration,
        mut tick: F,
    ) -> io::Result<Self>
    where
        F: FnMut(&CancelToken) -> bool + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let shared = Arc::new(TimerShared {
            cancelled: Mutex::new(false),
            wake: Condvar::new(),
        });
        let token = CancelToken(Arc::clone(&shared));

        thread::Builder::new()
            .name(format!("ucon-reeval-{key}"))
            .spawn(move || {
                let mut deadline = Instant::now() + initial_delay;
                loop {
                    {
                        let mut cancelled = token.0.cancelled.lock();
                        while !*cancelled {
                            if token.0.wake.wait_until(&mut cancelled, deadline).timed_out() {
                                break;
                            }
                        }
                        if *cancelled {
                            break;
                        }
                    }
                    if !tick(&token) {
                        break;
                    }
                    deadline += period;
                    let now = Instant::now();
                    while deadline < now {
                        deadline += period;
                    }
                }
                trace!("re-evaluation timer stopped");
            })?;

        Ok(Self { shared })
    }
}

impl Schedule for ReevaluationTimer {
    fn cancel(&self) {
        let mut cancelled = self.shared.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.shared.wake.notify_all();
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.shared.cancelled.lock()
    }
}

impl Drop for ReevaluationTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
