//! Local screen geometry and cursor control.
//!
//! The edge state machine needs the primary screen size to detect edges and
//! normalise pointer positions, and the injection side needs it to re-scale
//! received positions. Each platform implements [`ScreenGeometry`]; the
//! correct one is selected at compile time and re-exported as
//! `NativeDisplay`:
//!
//! | Module    | OS      | API used                              |
//! |-----------|---------|---------------------------------------|
//! | `windows` | Windows | `GetSystemMetrics` + `SetCursorPos`   |
//!
//! Elsewhere the node falls back to [`FixedScreen`] built from configuration.

use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::forward_input::CursorController;

/// Error type for screen queries.
#[derive(Debug, Error)]
pub enum ScreenInfoError {
    #[error("platform API error while querying the screen: {0}")]
    PlatformError(String),
}

/// Capability for reading the primary screen size.
pub trait ScreenGeometry: Send + Sync {
    /// Returns `(width, height)` of the primary screen in pixels.
    fn primary_screen_size(&self) -> Result<(u32, u32), ScreenInfoError>;
}

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "windows")]
pub use windows::WindowsDisplay as NativeDisplay;

/// Resolves the screen size, falling back when the query fails or reports zero.
pub fn detect_screen_size(geometry: &dyn ScreenGeometry, fallback: (u32, u32)) -> (u32, u32) {
    match geometry.primary_screen_size() {
        Ok((w, h)) if w > 0 && h > 0 => {
            debug!(width = w, height = h, "detected primary screen");
            (w, h)
        }
        Ok((w, h)) => {
            warn!(width = w, height = h, "screen reported zero size; using fallback");
            fallback
        }
        Err(e) => {
            warn!("screen query failed, using {}x{}: {e}", fallback.0, fallback.1);
            fallback
        }
    }
}

/// Screen with a size fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScreen {
    pub width: u32,
    pub height: u32,
}

impl FixedScreen {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ScreenGeometry for FixedScreen {
    fn primary_screen_size(&self) -> Result<(u32, u32), ScreenInfoError> {
        Ok((self.width, self.height))
    }
}

/// Cursor controller for hosts without pointer control.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessCursor;

impl CursorController for HeadlessCursor {
    fn teleport_cursor(&self, x: i32, y: i32) {
        debug!(x, y, "cursor pin requested without a display");
    }
}

/// Cursor controller that records every teleport, for tests.
#[derive(Debug, Default)]
pub struct MockCursorController {
    teleports: Mutex<Vec<(i32, i32)>>,
}

impl MockCursorController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teleports(&self) -> Vec<(i32, i32)> {
        self.teleports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CursorController for MockCursorController {
    fn teleport_cursor(&self, x: i32, y: i32) {
        self.teleports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((x, y));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingScreen;

    impl ScreenGeometry for FailingScreen {
        fn primary_screen_size(&self) -> Result<(u32, u32), ScreenInfoError> {
            Err(ScreenInfoError::PlatformError("no display".into()))
        }
    }

    #[test]
    fn test_detect_screen_size_uses_reported_size() {
        assert_eq!(detect_screen_size(&FixedScreen::new(2560, 1440), (1920, 1080)), (2560, 1440));
    }

    #[test]
    fn test_detect_screen_size_falls_back_on_error() {
        assert_eq!(detect_screen_size(&FailingScreen, (1920, 1080)), (1920, 1080));
    }

    #[test]
    fn test_detect_screen_size_falls_back_on_zero_dimension() {
        assert_eq!(detect_screen_size(&FixedScreen::new(0, 1080), (1280, 720)), (1280, 720));
    }

    #[test]
    fn test_mock_cursor_records_teleports() {
        let cursor = MockCursorController::new();
        cursor.teleport_cursor(1, 2);
        cursor.teleport_cursor(3, 4);
        assert_eq!(cursor.teleports(), vec![(1, 2), (3, 4)]);
    }
}
