//! # edgeshare-core
//!
//! Shared library for EdgeShare containing the wire protocol, the key
//! identifier table, and the edge/remote-mode state machine.
//!
//! This crate is used by every node. It has zero dependencies on OS APIs,
//! UI frameworks, or network sockets.
//!
//! # Architecture overview
//!
//! EdgeShare is a software KVM switch between two peers: when the pointer
//! reaches the configured edge of the local screen, local mouse and keyboard
//! input is redirected over the network to the paired peer until the pointer
//! is pulled back.
//!
//! - **`keymap`** – Bidirectional mapping between host key codes and the
//!   platform-neutral 16-bit [`KeyIdentifier`] space used on the wire.
//!
//! - **`protocol`** – The [`Packet`] sum type, its single-byte-tag binary
//!   codec, and the 4-byte length-prefix framing contract.
//!
//! - **`domain`** – Pure decision logic: screen edges, control modes,
//!   coordinate normalisation, and the [`EdgeStateMachine`] that decides when
//!   to enter and leave remote mode.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::edge::{ControlMode, EdgeStateMachine, MoveReaction, ModeSignal, ScreenEdge};
pub use keymap::{KeyIdentifier, KeyTable, Modifiers};
pub use protocol::codec::{decode_packet, encode_packet, CodecError};
pub use protocol::packet::Packet;
