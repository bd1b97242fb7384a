//! Storage infrastructure: node configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration, supplies defaults on
//! first run, and writes settings changes back to disk.

pub mod config;
