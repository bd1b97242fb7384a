//! TOML-based configuration for the node.
//!
//! Default location:
//! - Windows:  `%APPDATA%\EdgeShare\config.toml`
//! - Linux:    `~/.config/edgeshare/config.toml`
//! - macOS:    `~/Library/Application Support/EdgeShare/config.toml`
//!
//! ```toml
//! [node]
//! machine_name = "studio-desktop"
//! log_level = "info"
//!
//! [network]
//! port = 8888
//!
//! [settings]
//! edge = "right"
//! lock_input = true
//!
//! [[peers]]
//! code = "K7Q2"
//! name = "studio-laptop"
//! ip = "192.168.1.40"
//! ```
//!
//! Every field carries a serde default, so a missing file, a missing section
//! or a missing key all fall back to working values.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edgeshare_core::domain::edge::ScreenEdge;
use edgeshare_core::protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::infrastructure::network::connection_manager::NetworkConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level node configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub screen: ScreenSection,
    #[serde(default)]
    pub settings: Settings,
    /// Peers reachable by pairing code.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<PeerSection>,
}

/// A known peer, listed in `discovery_result` and resolvable by its code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerSection {
    pub code: String,
    pub name: String,
    pub ip: IpAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSection {
    /// Name announced to the peer in the handshake.
    #[serde(default = "default_machine_name")]
    pub machine_name: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Data port, used both for listening and for reaching the peer.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Screen size override for hosts where the platform query is unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScreenSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// User-adjustable settings, mirrored to the shell as `settings_data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Active screen edge name (`none`, `left`, `right`, `top`, `bottom`).
    pub edge: String,
    pub lock_input: bool,
    pub delay: u32,
    pub corner_size: u32,
    pub sensitivity: f32,
    pub gesture_threshold: u32,
    pub pairing_code: String,
    pub active_monitor: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            edge: ScreenEdge::Right.as_str().to_string(),
            lock_input: false,
            delay: 0,
            corner_size: 10,
            sensitivity: 1.0,
            gesture_threshold: 50,
            pairing_code: String::new(),
            active_monitor: 0,
        }
    }
}

impl Settings {
    /// Parses the configured edge, falling back to `Right` when unrecognised.
    pub fn active_edge(&self) -> ScreenEdge {
        self.edge.parse().unwrap_or_else(|e| {
            warn!("{e}; falling back to right edge");
            ScreenEdge::Right
        })
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_machine_name() -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "edgeshare".to_string())
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            machine_name: default_machine_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl NetworkSection {
    /// Builds the runtime network configuration.
    ///
    /// An unparseable bind address falls back to `0.0.0.0`.
    pub fn to_network_config(&self) -> NetworkConfig {
        let defaults = NetworkConfig::default();
        let bind_address = self.bind_address.parse::<IpAddr>().unwrap_or_else(|e| {
            warn!(address = %self.bind_address, "invalid bind address ({e}); using 0.0.0.0");
            defaults.bind_address
        });
        NetworkConfig {
            bind_address,
            port: self.port,
            connect_attempts: self.connect_attempts.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl ScreenSection {
    /// The configured size, or 1920×1080 when either dimension is missing or zero.
    pub fn fallback_size(&self) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => (1920, 1080),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<NodeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NodeConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &NodeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("EdgeShare"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("edgeshare"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("EdgeShare")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
