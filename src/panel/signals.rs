//! SIGTERM/SIGINT handling for the panel loop.
//!
//! Uses the `signal-hook` crate for safe registration. The loop polls the
//! flag every tick rather than blocking on signals.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Shutdown flag shared between the signal handler and the panel loop.
#[derive(Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create the flag and register SIGTERM/SIGINT.
    ///
    /// Registration is best-effort; failures are reported on stderr.
    pub fn new() -> Self {
        let signal = Self::unregistered();
        for (sig, name) in [(SIGTERM, "SIGTERM"), (SIGINT, "SIGINT")] {
            if let Err(e) = signal_hook::flag::register(sig, Arc::clone(&signal.flag)) {
                eprintln!("[SPK-SIGNAL] failed to register {name}: {e}");
            }
        }
        signal
    }

    /// A flag no OS signal can set; only [`Self::request`] does.
    pub fn unregistered() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones() {
        let signal = ShutdownSignal::unregistered();
        let clone = signal.clone();
        assert!(!clone.requested());
        signal.request();
        assert!(clone.requested());
    }
}
