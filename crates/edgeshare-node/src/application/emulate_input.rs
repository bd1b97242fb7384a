//! EmulateInputUseCase: replays packets received from the peer on this host.
//!
//! Pointer coordinates arrive normalised to `0..=65535` and are re-scaled to
//! the local screen before injection. Key names from `KeyPress` and button
//! names are parsed back into typed values; anything that does not parse is
//! rejected with a [`DispatchError`] for the caller to log and drop.

use std::sync::Arc;

use edgeshare_core::domain::coords::denormalize;
use edgeshare_core::domain::edge::{ButtonAction, KeyAction};
use edgeshare_core::keymap::{KeyIdentifier, Modifiers};
use edgeshare_core::protocol::{MouseButton, Packet, PacketType};
use thiserror::Error;
use tracing::trace;

use crate::infrastructure::audio::{AudioError, AudioPlayback};

/// Error type for input injection operations.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("no host key code for {0}")]
    UnmappedKey(KeyIdentifier),
}

/// Error type for replaying a received packet.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Injection(#[from] InjectionError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("unknown mouse button {0:?}")]
    UnknownButton(String),
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
    /// Session packets are handled by the orchestrator, not replayed.
    #[error("{0:?} is not an input packet")]
    NotInput(PacketType),
}

/// Platform-agnostic input injection capability.
pub trait InputInjector: Send + Sync {
    /// Moves the cursor to an absolute position in local screen pixels.
    fn inject_mouse_move(&self, x: i32, y: i32) -> Result<(), InjectionError>;

    fn inject_button(&self, button: MouseButton, action: ButtonAction) -> Result<(), InjectionError>;

    fn inject_wheel(&self, delta: i16) -> Result<(), InjectionError>;

    /// Injects a key; `Press` means a full down/up pair.
    fn inject_key(
        &self,
        key: KeyIdentifier,
        action: KeyAction,
        modifiers: Modifiers,
    ) -> Result<(), InjectionError>;
}

/// Filters duplicate consecutive pointer positions.
#[derive(Default)]
struct DedupFilter {
    last_mouse_pos: Option<(i32, i32)>,
}

impl DedupFilter {
    fn should_send_mouse_move(&mut self, x: i32, y: i32) -> bool {
        if self.last_mouse_pos == Some((x, y)) {
            return false;
        }
        self.last_mouse_pos = Some((x, y));
        true
    }

    fn reset(&mut self) {
        self.last_mouse_pos = None;
    }
}

/// The Emulate Input use case.
pub struct EmulateInputUseCase {
    injector: Arc<dyn InputInjector>,
    playback: Arc<dyn AudioPlayback>,
    width: u32,
    height: u32,
    dedup: DedupFilter,
}

impl EmulateInputUseCase {
    pub fn new(
        injector: Arc<dyn InputInjector>,
        playback: Arc<dyn AudioPlayback>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            injector,
            playback,
            width,
            height,
            dedup: DedupFilter::default(),
        }
    }

    /// Resets internal state (e.g., on reconnect).
    pub fn reset(&mut self) {
        self.dedup.reset();
    }

    /// Replays one input or audio packet.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for unparseable names, capability failures,
    /// or session packets that are not meant for replay.
    pub fn handle_packet(&mut self, packet: Packet) -> Result<(), DispatchError> {
        match packet {
            Packet::MouseMove { x, y } => self.handle_mouse_move(x, y),
            Packet::MouseClick { button } => self.handle_button(&button, ButtonAction::Click),
            Packet::MouseDown { button } => self.handle_button(&button, ButtonAction::Down),
            Packet::MouseUp { button } => self.handle_button(&button, ButtonAction::Up),
            Packet::MouseWheel { delta } => Ok(self.injector.inject_wheel(delta)?),
            Packet::KeyPress { key } => {
                let id = KeyIdentifier::from_name(&key).ok_or(DispatchError::UnknownKey(key))?;
                Ok(self
                    .injector
                    .inject_key(id, KeyAction::Press, Modifiers::empty())?)
            }
            Packet::KeyDown { key, modifiers } => {
                Ok(self.injector.inject_key(key, KeyAction::Down, modifiers)?)
            }
            Packet::KeyUp { key, modifiers } => {
                Ok(self.injector.inject_key(key, KeyAction::Up, modifiers)?)
            }
            Packet::AudioFrame(bytes) => Ok(self.playback.play(&bytes)?),
            p @ (Packet::Handshake { .. } | Packet::HandshakeAck | Packet::Ping) => {
                Err(DispatchError::NotInput(p.packet_type()))
            }
        }
    }

    fn handle_mouse_move(&mut self, x: u16, y: u16) -> Result<(), DispatchError> {
        if self.width == 0 || self.height == 0 {
            trace!("screen size unknown; dropping pointer move");
            return Ok(());
        }
        let px = denormalize(x, self.width);
        let py = denormalize(y, self.height);
        if self.dedup.should_send_mouse_move(px, py) {
            self.injector.inject_mouse_move(px, py)?;
        }
        Ok(())
    }

    fn handle_button(&self, name: &str, action: ButtonAction) -> Result<(), DispatchError> {
        let button =
            MouseButton::from_name(name).ok_or_else(|| DispatchError::UnknownButton(name.into()))?;
        Ok(self.injector.inject_button(button, action)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
