//! PeerDirectory: peers known by pairing code.
//!
//! The orchestrator fills it from the `[[peers]]` list in the configuration.
//! `connect_device{code}` resolves a code back to an address and
//! `start_discovery` lists the current entries.
//!
//! Pairing codes are compared case-insensitively and ignore surrounding
//! whitespace, since users type them by hand.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use tracing::debug;

/// One announced peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub code: String,
    pub name: String,
    pub ip: IpAddr,
}

/// Thread-safe registry of known peers keyed by pairing code.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: RwLock<HashMap<String, PeerEntry>>,
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the peer announced under `code`.
    pub fn register(&self, code: &str, name: impl Into<String>, ip: IpAddr) {
        let key = normalize_code(code);
        let entry = PeerEntry {
            code: key.clone(),
            name: name.into(),
            ip,
        };
        debug!(code = %key, %ip, "peer registered");
        self.peers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    /// Address of the peer registered under `code`.
    pub fn resolve(&self, code: &str) -> Option<IpAddr> {
        self.peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&normalize_code(code))
            .map(|p| p.ip)
    }

    /// Snapshot of all peers, sorted by name for display.
    pub fn list(&self) -> Vec<PeerEntry> {
        let mut peers: Vec<_> = self
            .peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        peers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        peers
    }
}
