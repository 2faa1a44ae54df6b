//! Cancellation of backend calls through SIGINT and SIGTERM.
//!
//! Sessions call [`CancellationFlag::enter()`] before each backend call. It fails if a signal
//! arrived already, and otherwise marks the call as in flight until the returned guard is dropped.
//! A signal arriving while a call is in flight is reported right away and ends the process with
//! exit code 1, as there is nothing to roll back: hooks only decide, git mutates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::iterator::Signals;

use crate::Error;

/// A cancellation flag that can be shared with signal handlers.
///
/// Clones share the same state.
#[derive(Debug, Default, Clone)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
    /// The backend call currently in flight, if any.
    in_flight: Arc<Mutex<Option<&'static str>>>,
}

impl CancellationFlag {
    /// Create a new cancellation flag in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for terminating signals on a background thread. Each one cancels this flag, and if
    /// a backend call is in flight, `on_interrupt` is called with its operation before the process
    /// exits with code 1.
    pub fn install_signal_handlers(&self, on_interrupt: impl Fn(&'static str) + Send + 'static) -> std::io::Result<()> {
        let mut signals = Signals::new(TERM_SIGNALS)?;
        let flag = self.clone();
        std::thread::Builder::new()
            .name("signals".into())
            .spawn(move || {
                for signal in signals.forever() {
                    tracing::debug!(signal, "received termination signal");
                    flag.cancel();
                    if let Some(operation) = flag.in_flight_operation() {
                        on_interrupt(operation);
                        std::process::exit(1);
                    }
                }
            })?;
        Ok(())
    }

    /// Signal cancellation. Once cancelled, the flag can't be reset.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self, operation: &'static str) -> Result<(), Error> {
        if self.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }
        Ok(())
    }

    /// Mark the start of the blocking `operation`, which ends when the returned guard is dropped.
    pub fn enter(&self, operation: &'static str) -> Result<InFlight<'_>, Error> {
        self.check(operation)?;
        *self.lock() = Some(operation);
        Ok(InFlight { flag: self })
    }

    /// Return `true` while a guard obtained by [`enter()`](Self::enter()) is alive.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight_operation().is_some()
    }

    /// The operation of the guard obtained by [`enter()`](Self::enter()), while it's alive.
    pub fn in_flight_operation(&self) -> Option<&'static str> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<&'static str>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A guard marking a backend call as in flight.
#[derive(Debug)]
pub struct InFlight<'a> {
    flag: &'a CancellationFlag,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.flag.lock() = None;
    }
}
