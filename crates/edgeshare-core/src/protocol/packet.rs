//! All EdgeShare packet types.
//!
//! One packet travels in one frame. The first payload byte is the
//! [`PacketType`] tag; the rest is type-specific (see `codec`).

use serde::{Deserialize, Serialize};

use crate::keymap::{KeyIdentifier, Modifiers};

// ── Packet type tags ──────────────────────────────────────────────────────────

/// Single-byte tag identifying a packet on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    MouseMove = 0x01,
    MouseClick = 0x02,
    MouseDown = 0x03,
    MouseUp = 0x04,
    MouseWheel = 0x05,
    KeyPress = 0x06,
    AudioFrame = 0x07,
    Handshake = 0x08,
    HandshakeAck = 0x09,
    Ping = 0x0A,
    KeyDown = 0x0B,
    KeyUp = 0x0C,
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(PacketType::MouseMove),
            0x02 => Ok(PacketType::MouseClick),
            0x03 => Ok(PacketType::MouseDown),
            0x04 => Ok(PacketType::MouseUp),
            0x05 => Ok(PacketType::MouseWheel),
            0x06 => Ok(PacketType::KeyPress),
            0x07 => Ok(PacketType::AudioFrame),
            0x08 => Ok(PacketType::Handshake),
            0x09 => Ok(PacketType::HandshakeAck),
            0x0A => Ok(PacketType::Ping),
            0x0B => Ok(PacketType::KeyDown),
            0x0C => Ok(PacketType::KeyUp),
            _ => Err(()),
        }
    }
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// A decoded EdgeShare packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    /// Pointer position normalised to `0..=65535` on both axes, independent of
    /// the sender's resolution.
    MouseMove { x: u16, y: u16 },
    /// A complete press-and-release of the named button.
    MouseClick { button: String },
    MouseDown { button: String },
    MouseUp { button: String },
    /// Vertical wheel delta; positive scrolls away from the user.
    MouseWheel { delta: i16 },
    /// One-shot press of the key named by [`KeyIdentifier::name`].
    KeyPress { key: String },
    /// Opaque encoded audio.
    AudioFrame(Vec<u8>),
    Handshake { machine_name: String },
    HandshakeAck,
    Ping,
    KeyDown { key: KeyIdentifier, modifiers: Modifiers },
    KeyUp { key: KeyIdentifier, modifiers: Modifiers },
}

impl Packet {
    /// Returns the wire tag for this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::MouseMove { .. } => PacketType::MouseMove,
            Packet::MouseClick { .. } => PacketType::MouseClick,
            Packet::MouseDown { .. } => PacketType::MouseDown,
            Packet::MouseUp { .. } => PacketType::MouseUp,
            Packet::MouseWheel { .. } => PacketType::MouseWheel,
            Packet::KeyPress { .. } => PacketType::KeyPress,
            Packet::AudioFrame(_) => PacketType::AudioFrame,
            Packet::Handshake { .. } => PacketType::Handshake,
            Packet::HandshakeAck => PacketType::HandshakeAck,
            Packet::Ping => PacketType::Ping,
            Packet::KeyDown { .. } => PacketType::KeyDown,
            Packet::KeyUp { .. } => PacketType::KeyUp,
        }
    }
}

// ── Mouse buttons ─────────────────────────────────────────────────────────────

/// Mouse buttons known to the capture and injection layers.
///
/// Buttons travel as their lower-case name so a peer can forward buttons this
/// build does not know about; receivers drop names they cannot parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::Back => "back",
            MouseButton::Forward => "forward",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            "back" => Some(MouseButton::Back),
            "forward" => Some(MouseButton::Forward),
            _ => None,
        }
    }
}
