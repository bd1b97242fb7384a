//! Network infrastructure for the node.
//!
//! # Sub-modules
//!
//! - **`transport`** – Async length-prefixed frame I/O over any byte stream,
//!   plus the serialised [`FrameWriter`](transport::FrameWriter) shared by
//!   concurrent senders.
//!
//! - **`connection_manager`** – The persistent listener (passive role), the
//!   on-demand outbound connection with retry (active role), per-connection
//!   receive loops, and disconnect notification.

pub mod connection_manager;
pub mod transport;
