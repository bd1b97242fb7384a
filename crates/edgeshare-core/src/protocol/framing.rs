//! Length-prefix framing contract shared by both peers.
//!
//! ```text
//! [length:4, big-endian u32][payload:length]
//! ```
//!
//! A declared length of zero, or above [`MAX_FRAME_LEN`], is a protocol error
//! and the receiving side drops the connection. Values with the high bit set
//! (negative when read as a signed 32-bit integer) always exceed the cap.

use thiserror::Error;

/// Default TCP port for the data channel.
pub const DEFAULT_PORT: u16 = 8888;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest accepted payload (4 MiB).
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Errors from building or validating a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length {0} is outside 1..={max}", max = MAX_FRAME_LEN)]
    InvalidLength(u64),
}

/// Validates a received length prefix and returns the payload length.
///
/// # Errors
///
/// Returns [`FrameError::InvalidLength`] for zero or oversized lengths.
pub fn parse_length_prefix(prefix: [u8; LENGTH_PREFIX_LEN]) -> Result<usize, FrameError> {
    let len = u32::from_be_bytes(prefix);
    check_len(len as usize)?;
    Ok(len as usize)
}

/// Prepends the big-endian length prefix to `payload`.
///
/// # Errors
///
/// Returns [`FrameError::InvalidLength`] if `payload` is empty or larger than
/// [`MAX_FRAME_LEN`].
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    check_len(payload.len())?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

fn check_len(len: usize) -> Result<(), FrameError> {
    if len == 0 || len > MAX_FRAME_LEN {
        Err(FrameError::InvalidLength(len as u64))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload_prefixes_big_endian_length() {
        let framed = frame_payload(&[0x0A]).unwrap();
        assert_eq!(framed, vec![0, 0, 0, 1, 0x0A]);
    }

    #[test]
    fn test_parse_length_prefix_accepts_one_and_cap() {
        assert_eq!(parse_length_prefix([0, 0, 0, 1]), Ok(1));
        let cap = (MAX_FRAME_LEN as u32).to_be_bytes();
        assert_eq!(parse_length_prefix(cap), Ok(MAX_FRAME_LEN));
    }

    #[test]
    fn test_parse_length_prefix_rejects_zero() {
        assert_eq!(parse_length_prefix([0; 4]), Err(FrameError::InvalidLength(0)));
    }

    #[test]
    fn test_parse_length_prefix_rejects_negative_as_signed() {
        let prefix = (-1i32).to_be_bytes();
        assert!(parse_length_prefix(prefix).is_err());
    }

    #[test]
    fn test_parse_length_prefix_rejects_one_past_cap() {
        let prefix = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        assert!(parse_length_prefix(prefix).is_err());
    }

    #[test]
    fn test_frame_payload_rejects_empty_and_oversized() {
        assert!(frame_payload(&[]).is_err());
        assert!(frame_payload(&vec![0u8; MAX_FRAME_LEN + 1]).is_err());
    }
}
