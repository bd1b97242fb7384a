//! Domain layer: pure decision logic with no I/O.
//!
//! - **`coords`** – Normalisation of pointer positions into the fixed
//!   `0..=65535` wire range and re-scaling on the receiving side.
//! - **`edge`** – Screen edges, control modes, and the
//!   [`edge::EdgeStateMachine`] deciding when local input is redirected.

pub mod coords;
pub mod edge;
