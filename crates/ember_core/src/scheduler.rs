//! Periodic tick drivers
//!
//! One named driver thread per cadence class (fades, band publishing), each
//! iterating the live voice set - instead of one timer per voice. Timer
//! count stays flat as voices come and go, and cancelling a voice's work is
//! just removing it from the set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// A periodic driver thread. Joined (after flagging shutdown) on drop.
pub(crate) struct Ticker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a named thread calling `tick` every `period` until the shared
    /// `shutdown` flag flips.
    pub(crate) fn spawn(
        name: &str,
        period: Duration,
        shutdown: Arc<AtomicBool>,
        mut tick: impl FnMut() + Send + 'static,
    ) -> EngineResult<Self> {
        let thread_shutdown = Arc::clone(&shutdown);
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(driver = %thread_name, ?period, "tick driver started");
                while !thread_shutdown.load(Ordering::SeqCst) {
                    tick();
                    // park_timeout instead of sleep so shutdown can interrupt
                    // the wait via unpark
                    thread::park_timeout(period);
                }
                debug!(driver = %thread_name, "tick driver stopped");
            })
            .map_err(|e| EngineError::DriverSpawnError(e.to_string()))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}
