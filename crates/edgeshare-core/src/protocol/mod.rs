//! Protocol module containing the packet type, the binary codec, and the
//! length-prefix framing contract.

pub mod codec;
pub mod framing;
pub mod packet;

pub use codec::{decode_packet, encode_packet, CodecError};
pub use framing::{frame_payload, parse_length_prefix, FrameError, DEFAULT_PORT, MAX_FRAME_LEN};
pub use packet::{MouseButton, Packet, PacketType};
