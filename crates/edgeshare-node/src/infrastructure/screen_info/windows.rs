//! Windows screen metrics and cursor pinning via `GetSystemMetrics` / `SetCursorPos`.

use tracing::warn;
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
};

use super::{ScreenGeometry, ScreenInfoError};
use crate::application::forward_input::CursorController;

/// Primary display of the interactive Windows session.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDisplay;

impl WindowsDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenGeometry for WindowsDisplay {
    fn primary_screen_size(&self) -> Result<(u32, u32), ScreenInfoError> {
        // SAFETY: GetSystemMetrics has no preconditions and only reads system state.
        let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if w <= 0 || h <= 0 {
            return Err(ScreenInfoError::PlatformError(format!(
                "GetSystemMetrics returned {w}x{h}"
            )));
        }
        Ok((w as u32, h as u32))
    }
}

impl CursorController for WindowsDisplay {
    fn teleport_cursor(&self, x: i32, y: i32) {
        // SAFETY: SetCursorPos takes plain integers; failure is reported via Result.
        if let Err(e) = unsafe { SetCursorPos(x, y) } {
            warn!(x, y, "SetCursorPos failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_display_reports_nonzero_size() {
        let (w, h) = WindowsDisplay::new()
            .primary_screen_size()
            .expect("a desktop session has a primary screen");
        assert!(w > 0 && h > 0);
    }
}
