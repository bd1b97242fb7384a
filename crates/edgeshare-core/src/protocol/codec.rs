//! Binary codec for EdgeShare packets.
//!
//! Payload format (the frame length is supplied by the outer framing):
//! ```text
//! [tag:1][body:N]
//! ```
//!
//! | Packet          | Body                                        |
//! |-----------------|---------------------------------------------|
//! | `MouseMove`     | `x:u16` `y:u16`                             |
//! | `MouseWheel`    | `delta:i16`                                 |
//! | `KeyDown/KeyUp` | `key:u16` `modifiers:u8`                    |
//! | string packets  | UTF-8 bytes up to the end of the payload    |
//! | `AudioFrame`    | opaque bytes up to the end of the payload   |
//! | `HandshakeAck`, `Ping` | empty                                |
//!
//! All multi-byte integers are big-endian, matching the frame length prefix.

use thiserror::Error;

use crate::keymap::{KeyIdentifier, Modifiers};
use crate::protocol::framing::MAX_FRAME_LEN;
use crate::protocol::packet::{Packet, PacketType};

/// Errors that can occur during packet encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The payload has no tag byte.
    #[error("empty payload")]
    Empty,

    /// The tag byte is not a recognised packet type.
    ///
    /// Receivers log and discard these; a newer peer may send types this
    /// build does not know.
    #[error("unknown packet type: 0x{0:02X}")]
    UnknownType(u8),

    /// The body is shorter than the packet type requires.
    #[error("truncated {context}: need {needed} bytes, got {available}")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// The body could not be parsed (invalid UTF-8, out-of-range key, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The encoded packet would not fit in a single frame.
    #[error("encoded packet is {0} bytes; the frame limit is {max}", max = MAX_FRAME_LEN)]
    TooLarge(usize),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Packet`] into a frame payload.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] if the result exceeds [`MAX_FRAME_LEN`].
///
/// # Examples
///
/// ```rust
/// use edgeshare_core::protocol::{decode_packet, encode_packet, Packet};
///
/// let packet = Packet::MouseWheel { delta: -120 };
/// let bytes = encode_packet(&packet).unwrap();
/// assert_eq!(decode_packet(&bytes).unwrap(), packet);
/// ```
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(1 + body_size_hint(packet));
    buf.push(packet.packet_type() as u8);
    match packet {
        Packet::MouseMove { x, y } => {
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
        }
        Packet::MouseClick { button }
        | Packet::MouseDown { button }
        | Packet::MouseUp { button } => buf.extend_from_slice(button.as_bytes()),
        Packet::MouseWheel { delta } => buf.extend_from_slice(&delta.to_be_bytes()),
        Packet::KeyPress { key } => buf.extend_from_slice(key.as_bytes()),
        Packet::AudioFrame(bytes) => buf.extend_from_slice(bytes),
        Packet::Handshake { machine_name } => buf.extend_from_slice(machine_name.as_bytes()),
        Packet::HandshakeAck | Packet::Ping => {}
        Packet::KeyDown { key, modifiers } | Packet::KeyUp { key, modifiers } => {
            buf.extend_from_slice(&key.raw().to_be_bytes());
            buf.push(modifiers.bits());
        }
    }
    if buf.len() > MAX_FRAME_LEN {
        return Err(CodecError::TooLarge(buf.len()));
    }
    Ok(buf)
}

/// Decodes one [`Packet`] from a complete frame payload.
///
/// Never reads past the end of `bytes`; every failure is reported as a
/// [`CodecError`].
///
/// # Errors
///
/// See [`CodecError`].
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, CodecError> {
    let (&tag, body) = bytes.split_first().ok_or(CodecError::Empty)?;
    let packet_type = PacketType::try_from(tag).map_err(|_| CodecError::UnknownType(tag))?;

    match packet_type {
        PacketType::MouseMove => {
            let x = read_u16(body, 0, "MouseMove")?;
            let y = read_u16(body, 2, "MouseMove")?;
            Ok(Packet::MouseMove { x, y })
        }
        PacketType::MouseClick => Ok(Packet::MouseClick {
            button: read_string(body)?,
        }),
        PacketType::MouseDown => Ok(Packet::MouseDown {
            button: read_string(body)?,
        }),
        PacketType::MouseUp => Ok(Packet::MouseUp {
            button: read_string(body)?,
        }),
        PacketType::MouseWheel => {
            let delta = read_u16(body, 0, "MouseWheel")? as i16;
            Ok(Packet::MouseWheel { delta })
        }
        PacketType::KeyPress => Ok(Packet::KeyPress {
            key: read_string(body)?,
        }),
        PacketType::AudioFrame => Ok(Packet::AudioFrame(body.to_vec())),
        PacketType::Handshake => Ok(Packet::Handshake {
            machine_name: read_string(body)?,
        }),
        PacketType::HandshakeAck => Ok(Packet::HandshakeAck),
        PacketType::Ping => Ok(Packet::Ping),
        PacketType::KeyDown => {
            let (key, modifiers) = read_key_event(body, "KeyDown")?;
            Ok(Packet::KeyDown { key, modifiers })
        }
        PacketType::KeyUp => {
            let (key, modifiers) = read_key_event(body, "KeyUp")?;
            Ok(Packet::KeyUp { key, modifiers })
        }
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn body_size_hint(packet: &Packet) -> usize {
    match packet {
        Packet::AudioFrame(bytes) => bytes.len(),
        Packet::MouseMove { .. } => 4,
        _ => 16,
    }
}

fn read_u16(buf: &[u8], offset: usize, context: &'static str) -> Result<u16, CodecError> {
    match buf.get(offset..offset + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(CodecError::Truncated {
            context,
            needed: offset + 2,
            available: buf.len(),
        }),
    }
}

fn read_key_event(
    body: &[u8],
    context: &'static str,
) -> Result<(KeyIdentifier, Modifiers), CodecError> {
    let raw = read_u16(body, 0, context)?;
    let modifier_bits = *body.get(2).ok_or(CodecError::Truncated {
        context,
        needed: 3,
        available: body.len(),
    })?;
    let key = KeyIdentifier::new(raw).ok_or_else(|| {
        CodecError::MalformedPayload(format!("key identifier 0x{raw:04X} is out of range"))
    })?;
    Ok((key, Modifiers::from_bits_truncate(modifier_bits)))
}

fn read_string(body: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(body.to_vec())
        .map_err(|e| CodecError::MalformedPayload(format!("invalid UTF-8: {e}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
