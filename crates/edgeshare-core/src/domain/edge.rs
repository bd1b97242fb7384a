//! Edge/remote-mode state machine.
//!
//! In [`ControlMode::Local`] pointer moves are only scanned for an edge hit.
//! In [`ControlMode::Remote`] every move, button, wheel and key event is turned
//! into a [`Packet`] for the peer, and pulling the pointer back from the
//! crossing edge by [`RETURN_THRESHOLD`] pixels returns control locally.
//!
//! The machine is synchronous and clock-free: callers pass `now` so that the
//! cooldown can be tested deterministically. Callers serialise access (one
//! lock around the whole machine), which makes every move evaluate entirely
//! under one mode.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::coords::normalize;
use crate::keymap::{HostKeyCode, KeyIdentifier, KeyTable, Modifiers};
use crate::protocol::packet::{MouseButton, Packet};

/// Edge-hit checks are suppressed for this long after returning to local.
pub const EDGE_COOLDOWN: Duration = Duration::from_millis(1000);

/// Distance from the crossing edge, in pixels, that returns control locally.
pub const RETURN_THRESHOLD: u32 = 200;

/// Drift from the crossing edge, in pixels, tolerated before re-pinning.
pub const PIN_TOLERANCE: u32 = 5;

// ── Edges and modes ───────────────────────────────────────────────────────────

/// Which edge of the local screen hands control to the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenEdge {
    None,
    Left,
    #[default]
    Right,
    Top,
    Bottom,
}

impl ScreenEdge {
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenEdge::None => "none",
            ScreenEdge::Left => "left",
            ScreenEdge::Right => "right",
            ScreenEdge::Top => "top",
            ScreenEdge::Bottom => "bottom",
        }
    }
}

impl fmt::Display for ScreenEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an edge name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown screen edge: {0:?}")]
pub struct ParseEdgeError(pub String);

impl FromStr for ScreenEdge {
    type Err = ParseEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "" => Ok(ScreenEdge::None),
            "left" => Ok(ScreenEdge::Left),
            "right" => Ok(ScreenEdge::Right),
            "top" => Ok(ScreenEdge::Top),
            "bottom" => Ok(ScreenEdge::Bottom),
            _ => Err(ParseEdgeError(s.to_string())),
        }
    }
}

/// Whether local input stays on this host or is forwarded to the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Local,
    Remote,
}

/// Signals raised for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSignal {
    /// The pointer reached the active edge in local mode with a target set.
    EdgeHit,
    /// The pointer was pulled back; the machine is now local again.
    Returned,
}

/// What the caller should do in response to a pointer move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReaction {
    /// Packet to forward to the peer.
    pub packet: Option<Packet>,
    /// Position to warp the local pointer to.
    pub pin_to: Option<(i32, i32)>,
    pub signal: Option<ModeSignal>,
}

/// Key transition reported by the capture hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
    /// A typed key delivered as a single press.
    Press,
}

/// Button transition reported by the capture hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Down,
    Up,
    Click,
}

// ── Modifier tracking ─────────────────────────────────────────────────────────

const FIRST_MODIFIER: u16 = 0xEFE1;
const LAST_MODIFIER: u16 = 0xEFEC;

/// Held modifier keys, one bit per identifier in `0xEFE1..=0xEFEC`.
#[derive(Debug, Clone, Copy, Default)]
struct ModifierTracker {
    held: u16,
}

impl ModifierTracker {
    fn update(&mut self, key: KeyIdentifier, is_down: bool) {
        let raw = key.raw();
        if !(FIRST_MODIFIER..=LAST_MODIFIER).contains(&raw) {
            return;
        }
        let bit = 1u16 << (raw - FIRST_MODIFIER);
        if is_down {
            self.held |= bit;
        } else {
            self.held &= !bit;
        }
    }

    fn mask(self) -> Modifiers {
        (FIRST_MODIFIER..=LAST_MODIFIER)
            .filter(|raw| self.held & (1 << (raw - FIRST_MODIFIER)) != 0)
            .filter_map(KeyIdentifier::new)
            .fold(Modifiers::empty(), |acc, key| acc | key.modifier_bit())
    }
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Decides when local input enters and leaves remote mode.
#[derive(Debug)]
pub struct EdgeStateMachine {
    mode: ControlMode,
    edge: ScreenEdge,
    input_lock: bool,
    width: u32,
    height: u32,
    has_target: bool,
    last_return: Option<Instant>,
    modifiers: ModifierTracker,
}

impl EdgeStateMachine {
    /// Creates a machine in local mode with no target configured.
    pub fn new(edge: ScreenEdge, width: u32, height: u32) -> Self {
        Self {
            mode: ControlMode::Local,
            edge,
            input_lock: false,
            width,
            height,
            has_target: false,
            last_return: None,
            modifiers: ModifierTracker::default(),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn active_edge(&self) -> ScreenEdge {
        self.edge
    }

    pub fn input_lock(&self) -> bool {
        self.input_lock
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Applies to future events only.
    pub fn set_active_edge(&mut self, edge: ScreenEdge) {
        self.edge = edge;
    }

    pub fn set_input_lock(&mut self, locked: bool) {
        self.input_lock = locked;
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Records whether an outbound target is configured.
    pub fn set_has_target(&mut self, has_target: bool) {
        self.has_target = has_target;
    }

    pub fn has_target(&self) -> bool {
        self.has_target
    }

    /// Modifier mask from the keys currently held.
    pub fn current_modifiers(&self) -> Modifiers {
        self.modifiers.mask()
    }

    /// Switches to remote mode.
    ///
    /// Refused (returns `false`) without a target or with no active edge.
    pub fn enter_remote(&mut self) -> bool {
        if !self.has_target || self.edge == ScreenEdge::None {
            return false;
        }
        if self.mode != ControlMode::Remote {
            debug!(edge = %self.edge, "entering remote mode");
            self.mode = ControlMode::Remote;
        }
        true
    }

    /// Switches back to local mode and starts the edge cooldown.
    pub fn leave_remote(&mut self, now: Instant) {
        if self.mode == ControlMode::Remote {
            debug!("returning to local mode");
            self.mode = ControlMode::Local;
            self.last_return = Some(now);
        }
    }

    /// Evaluates one pointer move at local pixel position `(x, y)`.
    pub fn handle_pointer_move(&mut self, x: i32, y: i32, now: Instant) -> MoveReaction {
        if self.width == 0 || self.height == 0 {
            return MoveReaction::default();
        }
        match self.mode {
            ControlMode::Local => self.scan_for_edge(x, y, now),
            ControlMode::Remote => self.forward_move(x, y, now),
        }
    }

    /// Pointer position on the crossing edge closest to `(x, y)`.
    ///
    /// Returns `(x, y)` unchanged when no edge is active.
    pub fn edge_anchor(&self, x: i32, y: i32) -> (i32, i32) {
        let right = self.width as i32 - 1;
        let bottom = self.height as i32 - 1;
        match self.edge {
            ScreenEdge::None => (x, y),
            ScreenEdge::Left => (0, y),
            ScreenEdge::Right => (right, y),
            ScreenEdge::Top => (x, 0),
            ScreenEdge::Bottom => (x, bottom),
        }
    }

    /// Translates a button event; `None` in local mode.
    pub fn handle_button(&self, button: MouseButton, action: ButtonAction) -> Option<Packet> {
        if self.mode != ControlMode::Remote {
            return None;
        }
        let button = button.as_str().to_string();
        Some(match action {
            ButtonAction::Down => Packet::MouseDown { button },
            ButtonAction::Up => Packet::MouseUp { button },
            ButtonAction::Click => Packet::MouseClick { button },
        })
    }

    /// Translates a wheel event; `None` in local mode.
    pub fn handle_wheel(&self, delta: i16) -> Option<Packet> {
        (self.mode == ControlMode::Remote).then_some(Packet::MouseWheel { delta })
    }

    /// Translates a key event; `None` in local mode or for unmapped keys.
    ///
    /// Modifier state is tracked in both modes so that a modifier held while
    /// crossing the edge is reported on the peer.
    pub fn handle_key(&mut self, code: HostKeyCode, action: KeyAction) -> Option<Packet> {
        let key = KeyTable::global().to_identifier(code)?;
        match action {
            KeyAction::Down => self.modifiers.update(key, true),
            KeyAction::Up => self.modifiers.update(key, false),
            KeyAction::Press => {}
        }
        if self.mode != ControlMode::Remote {
            return None;
        }
        let modifiers = self.modifiers.mask();
        Some(match action {
            KeyAction::Down => Packet::KeyDown { key, modifiers },
            KeyAction::Up => Packet::KeyUp { key, modifiers },
            KeyAction::Press => Packet::KeyPress {
                key: key.name().into_owned(),
            },
        })
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn scan_for_edge(&self, x: i32, y: i32, now: Instant) -> MoveReaction {
        if !self.has_target || self.edge == ScreenEdge::None {
            return MoveReaction::default();
        }
        let cooling_down = self
            .last_return
            .map(|t| now.saturating_duration_since(t) < EDGE_COOLDOWN)
            .unwrap_or(false);
        if cooling_down || !self.at_edge(x, y) {
            return MoveReaction::default();
        }
        MoveReaction {
            signal: Some(ModeSignal::EdgeHit),
            ..MoveReaction::default()
        }
    }

    fn forward_move(&mut self, x: i32, y: i32, now: Instant) -> MoveReaction {
        if self.distance_from_edge(x, y) >= i64::from(RETURN_THRESHOLD) {
            self.leave_remote(now);
            return MoveReaction {
                signal: Some(ModeSignal::Returned),
                ..MoveReaction::default()
            };
        }

        let packet = match (normalize(x, self.width), normalize(y, self.height)) {
            (Some(nx), Some(ny)) => Some(Packet::MouseMove { x: nx, y: ny }),
            _ => None,
        };

        let pin_to = if self.input_lock && self.drift_from_anchor(x, y) > i64::from(PIN_TOLERANCE) {
            Some(self.edge_anchor(x, y))
        } else {
            None
        };

        MoveReaction {
            packet,
            pin_to,
            signal: None,
        }
    }

    fn at_edge(&self, x: i32, y: i32) -> bool {
        let right = self.width as i64 - 1;
        let bottom = self.height as i64 - 1;
        match self.edge {
            ScreenEdge::None => false,
            ScreenEdge::Left => x <= 0,
            ScreenEdge::Right => i64::from(x) >= right,
            ScreenEdge::Top => y <= 0,
            ScreenEdge::Bottom => i64::from(y) >= bottom,
        }
    }

    /// Pixels between the pointer and the crossing edge, measured inward.
    fn distance_from_edge(&self, x: i32, y: i32) -> i64 {
        match self.edge {
            ScreenEdge::None => 0,
            ScreenEdge::Left => i64::from(x),
            ScreenEdge::Right => i64::from(self.width) - i64::from(x),
            ScreenEdge::Top => i64::from(y),
            ScreenEdge::Bottom => i64::from(self.height) - i64::from(y),
        }
    }

    fn drift_from_anchor(&self, x: i32, y: i32) -> i64 {
        let (ax, ay) = self.edge_anchor(x, y);
        (i64::from(ax) - i64::from(x)).abs() + (i64::from(ay) - i64::from(y)).abs()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
