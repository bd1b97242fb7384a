//! Application layer: use cases that orchestrate domain logic.
//!
//! - **`forward_input`** – Captured local input → state machine → outbound packets.
//! - **`emulate_input`** – Received packets → local injection and playback.
//! - **`control`** – The orchestrator wiring network, capture and the shell.
//! - **`peers`** – Pairing-code directory filled by discovery.

pub mod control;
pub mod emulate_input;
pub mod forward_input;
pub mod peers;
