//! JSON message types exchanged with the surrounding UI shell.
//!
//! The shell owns the window, the tray icon and the settings page. It talks to
//! the node with one JSON object per line, each carrying a `"type"` field that
//! names the variant:
//!
//! ```text
//! Shell → Node:  {"type":"connect_device","ip":"192.168.1.20"}
//! Node  → Shell: {"type":"connection_status","status":"Connected to 192.168.1.20:8888"}
//! ```
//!
//! Commands and notifications are separate enums so a notification can never
//! be parsed as a command by mistake.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::storage::config::Settings;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed shell message: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ── Shell → Node ──────────────────────────────────────────────────────────────

/// Commands the shell can issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiCommand {
    /// Asks for the list of currently known peers.
    StartDiscovery,

    /// Enables or disables a service (`"input"` or `"audio"`).
    ServiceToggle { service: String, enabled: bool },

    /// Connects to a peer by IP address or pairing code.
    ConnectDevice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Tears down the outbound connection.
    Disconnect,

    /// Flips between local and remote control.
    ToggleMode,

    GetSettings,
    /// Changes the settings named in the message and keeps the rest.
    UpdateSettings(SettingsUpdate),
    ResetSettings,
}

// ── Node → Shell ──────────────────────────────────────────────────────────────

/// Notifications the node pushes to the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiNotification {
    DiscoveryResult { devices: Vec<DeviceDto> },

    /// Human-readable connection status line.
    ConnectionStatus { status: String },

    SettingsData(SettingsDto),

    /// `"local"` or `"remote"`.
    ModeChanged { mode: String },
}

/// A peer entry in a `discovery_result` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub name: String,
    pub ip: String,
    pub code: String,
}

/// Settings as the shell sees them (camelCase keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDto {
    pub edge: String,
    pub lock_input: bool,
    pub delay: u32,
    pub corner_size: u32,
    pub sensitivity: f32,
    pub gesture_threshold: u32,
    pub pairing_code: String,
    pub active_monitor: u32,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for SettingsDto {
    fn from(s: Settings) -> Self {
        Self {
            edge: s.edge,
            lock_input: s.lock_input,
            delay: s.delay,
            corner_size: s.corner_size,
            sensitivity: s.sensitivity,
            gesture_threshold: s.gesture_threshold,
            pairing_code: s.pairing_code,
            active_monitor: s.active_monitor,
        }
    }
}

/// Body of `update_settings`: only the keys present are changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_input: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_monitor: Option<u32>,
}

impl SettingsUpdate {
    /// Overwrites the fields of `settings` that this update carries.
    pub fn apply_to(self, settings: &mut Settings) {
        if let Some(edge) = self.edge {
            settings.edge = edge;
        }
        if let Some(lock_input) = self.lock_input {
            settings.lock_input = lock_input;
        }
        if let Some(delay) = self.delay {
            settings.delay = delay;
        }
        if let Some(corner_size) = self.corner_size {
            settings.corner_size = corner_size;
        }
        if let Some(sensitivity) = self.sensitivity {
            settings.sensitivity = sensitivity;
        }
        if let Some(threshold) = self.gesture_threshold {
            settings.gesture_threshold = threshold;
        }
        if let Some(code) = self.pairing_code {
            settings.pairing_code = code;
        }
        if let Some(monitor) = self.active_monitor {
            settings.active_monitor = monitor;
        }
    }
}

/// Parses one line received from the shell.
///
/// # Errors
///
/// Returns [`BridgeError::Malformed`] for invalid JSON, a missing `type`
/// field, or an unknown command name.
pub fn parse_command(line: &str) -> Result<UiCommand, BridgeError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Renders a notification as a single JSON line (without the trailing newline).
///
/// # Errors
///
/// Returns [`BridgeError::Malformed`] if serialization fails.
pub fn render_notification(notification: &UiNotification) -> Result<String, BridgeError> {
    Ok(serde_json::to_string(notification)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
