//! Input injection backends.
//!
//! The [`InputInjector`] trait lives in the application layer; this module
//! holds the implementations. OS injection services sit outside this crate,
//! so the node ships [`LoggingInjector`] for headless runs and
//! [`mock::MockInputInjector`] for tests.

use edgeshare_core::domain::edge::{ButtonAction, KeyAction};
use edgeshare_core::keymap::{KeyIdentifier, KeyTable, Modifiers};
use edgeshare_core::protocol::MouseButton;
use tracing::debug;

use crate::application::emulate_input::{InjectionError, InputInjector};

pub mod mock;

/// Injector that only logs what it would have injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInjector;

impl InputInjector for LoggingInjector {
    fn inject_mouse_move(&self, x: i32, y: i32) -> Result<(), InjectionError> {
        debug!(x, y, "inject pointer move");
        Ok(())
    }

    fn inject_button(&self, button: MouseButton, action: ButtonAction) -> Result<(), InjectionError> {
        debug!(button = button.as_str(), ?action, "inject button");
        Ok(())
    }

    fn inject_wheel(&self, delta: i16) -> Result<(), InjectionError> {
        debug!(delta, "inject wheel");
        Ok(())
    }

    fn inject_key(
        &self,
        key: KeyIdentifier,
        action: KeyAction,
        modifiers: Modifiers,
    ) -> Result<(), InjectionError> {
        let host = KeyTable::global()
            .to_host_key_code(key)
            .ok_or(InjectionError::UnmappedKey(key))?;
        debug!(%key, host, ?action, modifiers = modifiers.bits(), "inject key");
        Ok(())
    }
}
