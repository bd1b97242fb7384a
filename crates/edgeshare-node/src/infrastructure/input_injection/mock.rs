//! Mock input injector for unit testing.
//!
//! Each injected event is pushed into a `Mutex<Vec<...>>` so that test
//! assertions can inspect exactly what was injected and in what order.
//! Set `should_fail = true` to simulate OS failures.

use std::sync::Mutex;

use edgeshare_core::domain::edge::{ButtonAction, KeyAction};
use edgeshare_core::keymap::{KeyIdentifier, Modifiers};
use edgeshare_core::protocol::MouseButton;

use crate::application::emulate_input::{InjectionError, InputInjector};

/// A mock injector that records all calls without performing OS API calls.
#[derive(Default)]
pub struct MockInputInjector {
    pub mouse_moves: Mutex<Vec<(i32, i32)>>,
    pub buttons: Mutex<Vec<(MouseButton, ButtonAction)>>,
    pub wheels: Mutex<Vec<i16>>,
    pub keys: Mutex<Vec<(KeyIdentifier, KeyAction, Modifiers)>>,
    /// When `true`, every method immediately returns an `InjectionError::Platform`.
    pub should_fail: bool,
}

impl MockInputInjector {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), InjectionError> {
        if self.should_fail {
            Err(InjectionError::Platform("mock failure".into()))
        } else {
            Ok(())
        }
    }
}

fn record<T>(list: &Mutex<Vec<T>>, item: T) {
    list.lock().unwrap_or_else(|e| e.into_inner()).push(item);
}

impl InputInjector for MockInputInjector {
    fn inject_mouse_move(&self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.check()?;
        record(&self.mouse_moves, (x, y));
        Ok(())
    }

    fn inject_button(&self, button: MouseButton, action: ButtonAction) -> Result<(), InjectionError> {
        self.check()?;
        record(&self.buttons, (button, action));
        Ok(())
    }

    fn inject_wheel(&self, delta: i16) -> Result<(), InjectionError> {
        self.check()?;
        record(&self.wheels, delta);
        Ok(())
    }

    fn inject_key(
        &self,
        key: KeyIdentifier,
        action: KeyAction,
        modifiers: Modifiers,
    ) -> Result<(), InjectionError> {
        self.check()?;
        record(&self.keys, (key, action, modifiers));
        Ok(())
    }
}
