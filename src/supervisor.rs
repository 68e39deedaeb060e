//! Periodic reconnection.
//!
//! While running, the supervisor calls [`Session::connect`] on every tick.
//! `connect` is a no-op unless the session is `Disconnected`, so ticks while
//! a connection is up or in progress cost nothing.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace, warn};

use crate::session::Session;

// ============================================================================
// ReconnectSupervisor
// ============================================================================

/// Reconnects a session at a fixed interval until stopped.
///
/// The task is aborted when the supervisor is dropped.
pub struct ReconnectSupervisor {
    session: Session,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ReconnectSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectSupervisor")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ReconnectSupervisor {
    /// Creates a stopped supervisor ticking at the session's configured
    /// reconnect interval.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let period = session.config().reconnect_interval;
        Self {
            session,
            period,
            task: Mutex::new(None),
        }
    }

    /// Starts ticking; the first tick is immediate. Does nothing if already
    /// running or if called outside a tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            trace!("Reconnect supervisor already running");
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("Reconnect supervisor needs a tokio runtime");
            return;
        };

        debug!(period = ?self.period, "Starting reconnect supervisor");
        let session = self.session.clone();
        let period = self.period;
        *task = Some(runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                session.connect();
            }
        }));
    }

    /// Stops ticking. Does not touch the session.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            debug!("Stopping reconnect supervisor");
            task.abort();
        }
    }

    /// Returns `true` while the ticking task is alive.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ReconnectSupervisor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
