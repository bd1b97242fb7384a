//! Mock input capture for unit testing.
//!
//! Allows tests to inject synthetic [`LocalInputEvent`]s and to observe the
//! blocking requests made by the orchestrator.

use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};

use super::{CaptureError, InputCapture, LocalInputEvent};

/// A mock implementation of [`InputCapture`] that allows tests to inject events.
#[derive(Default)]
pub struct MockInputCapture {
    sender: Mutex<Option<Sender<LocalInputEvent>>>,
    /// Every value passed to `set_blocking`, in order.
    pub blocking_calls: Mutex<Vec<bool>>,
    /// When `true`, `start` fails as if the hook could not be installed.
    pub should_fail: bool,
}

impl MockInputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `false` if capture is not running.
    pub fn inject_event(&self, event: LocalInputEvent) -> bool {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// The most recent blocking state requested, if any.
    pub fn last_blocking(&self) -> Option<bool> {
        self.blocking_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .copied()
    }
}

impl InputCapture for MockInputCapture {
    fn start(&self) -> Result<mpsc::Receiver<LocalInputEvent>, CaptureError> {
        if self.should_fail {
            return Err(CaptureError::HookInstallFailed("mock failure".into()));
        }
        let (tx, rx) = mpsc::channel();
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Dropping the sender closes the channel.
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn set_blocking(&self, blocked: bool) {
        self.blocking_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(blocked);
    }
}
