//! Input capture capability for the node.
//!
//! The OS hook lives outside this crate. Whatever delivers the events calls
//! into an [`InputCapture`] implementation, which hands each event to a
//! channel so the hook thread never waits on the state machine or the
//! network.
//!
//! # Testability
//!
//! The `InputCapture` trait allows unit tests to inject synthetic events
//! without any OS hook; see [`mock::MockInputCapture`].

use std::sync::mpsc;
use std::sync::Mutex;

use edgeshare_core::domain::edge::{ButtonAction, KeyAction};
use edgeshare_core::keymap::HostKeyCode;
use edgeshare_core::protocol::MouseButton;
use tracing::debug;

pub mod mock;

/// A local input event as reported by the capture hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalInputEvent {
    /// Absolute pointer position in local screen pixels.
    PointerMove { x: i32, y: i32 },
    Button {
        button: MouseButton,
        action: ButtonAction,
    },
    /// Vertical wheel; positive is away from the user.
    Wheel { delta: i16 },
    Key {
        code: HostKeyCode,
        action: KeyAction,
    },
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install input hook: {0}")]
    HookInstallFailed(String),
    #[error("capture is already running")]
    AlreadyRunning,
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting the global input hook.
pub trait InputCapture: Send + Sync {
    /// Starts capturing and returns a receiver for captured events.
    fn start(&self) -> Result<mpsc::Receiver<LocalInputEvent>, CaptureError>;
    /// Stops capturing; the receiver returned by `start` is closed.
    fn stop(&self);
    /// Blocks or releases local delivery of clicks and keys.
    fn set_blocking(&self, blocked: bool);
}

/// Capture used when no OS hook is available.
///
/// `start` succeeds and hands out a channel that stays silent until `stop`.
#[derive(Default)]
pub struct HeadlessCapture {
    sender: Mutex<Option<mpsc::Sender<LocalInputEvent>>>,
}

impl HeadlessCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputCapture for HeadlessCapture {
    fn start(&self) -> Result<mpsc::Receiver<LocalInputEvent>, CaptureError> {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel();
        *guard = Some(tx);
        debug!("headless capture started; no local events will be produced");
        Ok(rx)
    }

    fn stop(&self) {
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn set_blocking(&self, blocked: bool) {
        debug!(blocked, "headless capture ignores blocking");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capture_rejects_double_start_until_stopped() {
        let capture = HeadlessCapture::new();
        let rx = capture.start().expect("first start");

        assert!(matches!(capture.start(), Err(CaptureError::AlreadyRunning)));

        capture.stop();
        assert!(rx.recv().is_err(), "stop must close the channel");
        assert!(capture.start().is_ok());
    }
}
