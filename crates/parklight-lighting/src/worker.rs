//! Background thread that runs skylight propagation.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::error::LightingError;
use crate::shared::LightingShared;
use crate::skylight::{SkylightPropagator, StepOutcome};

/// Owns the skylight worker thread.
///
/// The thread runs [`SkylightPropagator::step`] until the shared continue
/// flag is cleared. It sleeps `sleep` between steps, and while idle it
/// blocks on a wake channel (with `sleep` as timeout) instead of spinning.
///
/// Dropping the worker stops and joins the thread.
pub struct SkylightWorker {
    shared: Arc<LightingShared>,
    wake: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SkylightWorker {
    pub fn spawn(shared: Arc<LightingShared>, sleep: Duration) -> Result<Self, LightingError> {
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("skylight-worker".into())
            .spawn(move || run(&thread_shared, &wake_rx, sleep))
            .map_err(LightingError::WorkerSpawn)?;
        tracing::debug!(sleep_us = sleep.as_micros() as u64, "skylight worker started");
        Ok(Self {
            shared,
            wake: wake_tx,
            handle: Some(handle),
        })
    }

    /// Interrupts an idle wait. Never blocks.
    pub fn wake(&self) {
        let _ = self.wake.try_send(());
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Clears the continue flag and joins the thread. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<(), LightingError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.shared.stop();
        self.wake();
        let joined = handle.join().map_err(|_| LightingError::WorkerPanicked);
        tracing::debug!("skylight worker stopped");
        joined
    }
}

impl Drop for SkylightWorker {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!(%err, "skylight worker did not shut down cleanly");
        }
    }
}

fn run(shared: &LightingShared, wake: &Receiver<()>, sleep: Duration) {
    let mut propagator = SkylightPropagator::new(shared);
    while shared.is_running() {
        match propagator.step(shared) {
            StepOutcome::Idle => {
                let _ = wake.recv_timeout(sleep.max(Duration::from_millis(1)));
            }
            _ if !sleep.is_zero() => std::thread::sleep(sleep),
            _ => {}
        }
    }
}
