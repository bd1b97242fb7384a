//! Infrastructure layer for the node.
//!
//! Contains OS-facing adapters and capability providers: the TCP connection
//! manager, input capture and injection, screen geometry, audio, TOML
//! storage, and the JSON shell bridge.

pub mod audio;
pub mod input_capture;
pub mod input_injection;
pub mod network;
pub mod screen_info;
pub mod storage;
pub mod ui_bridge;
