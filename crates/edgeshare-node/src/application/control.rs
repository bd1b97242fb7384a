//! ControlOrchestrator: wires capture, the state machine, the network and the
//! shell together.
//!
//! # Event sources
//!
//! ```text
//! ConnectionManager ──ConnectionEvent──┐
//! ForwardInputUseCase ──ModeSignal─────┼──▶ run() ──▶ EmulateInputUseCase
//! shutdown watch ──────────────────────┘          └─▶ UiNotification
//!
//! shell ──UiCommand──▶ execute()
//! ```
//!
//! `run` owns the single outbound writer task and handles one event at a time.
//! Shell commands arrive concurrently through [`ControlOrchestrator::execute`];
//! the pieces of state both paths touch (the state machine, the emulate use
//! case, the settings) sit behind their own short-lived locks.
//!
//! Every failure here is logged and, where the user should know about it,
//! reported as a `connection_status` notification. Nothing is propagated as a
//! crash.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use edgeshare_core::domain::edge::{ControlMode, ModeSignal, ScreenEdge};
use edgeshare_core::protocol::{decode_packet, Packet};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::emulate_input::{EmulateInputUseCase, InputInjector};
use super::forward_input::{
    lock_machine, spawn_outbound_writer, CursorController, ForwardInputUseCase, PacketSink,
    SharedMachine,
};
use super::peers::PeerDirectory;
use crate::infrastructure::audio::{AudioCapture, AudioError, AudioPlayback};
use crate::infrastructure::input_capture::{CaptureError, InputCapture};
use crate::infrastructure::network::connection_manager::{
    ConnectionEvent, ConnectionManager, DisconnectReason, LinkId, NetworkError,
};
use crate::infrastructure::screen_info::{detect_screen_size, ScreenGeometry};
use crate::infrastructure::storage::config::{save_config, NodeConfig, Settings};
use crate::infrastructure::ui_bridge::{DeviceDto, SettingsDto, UiCommand, UiNotification};

/// Error type for shell commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown service {0:?}")]
    UnknownService(String),
    #[error("{0:?} is neither a known pairing code nor an address")]
    UnresolvedTarget(String),
    #[error("no target to connect to")]
    MissingTarget,
    #[error("input capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("audio capture failed: {0}")]
    Audio(#[from] AudioError),
    #[error("could not start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Host capabilities the orchestrator drives.
pub struct Capabilities {
    pub capture: Arc<dyn InputCapture>,
    pub injector: Arc<dyn InputInjector>,
    pub cursor: Arc<dyn CursorController>,
    pub screen: Arc<dyn ScreenGeometry>,
    pub audio_capture: Arc<dyn AudioCapture>,
    pub audio_playback: Arc<dyn AudioPlayback>,
}

/// Startup configuration for the orchestrator.
pub struct OrchestratorConfig {
    pub node: NodeConfig,
    /// Where settings changes are persisted; `None` keeps them in memory.
    pub config_path: Option<PathBuf>,
}

/// Channel ends handed to [`ControlOrchestrator::run`].
struct RunChannels {
    outbound: mpsc::UnboundedReceiver<Packet>,
    signals: mpsc::UnboundedReceiver<ModeSignal>,
}

#[derive(Default)]
struct Services {
    input: Option<thread::JoinHandle<()>>,
    audio: Option<thread::JoinHandle<()>>,
}

/// The control orchestrator.
pub struct ControlOrchestrator {
    capture: Arc<dyn InputCapture>,
    audio_capture: Arc<dyn AudioCapture>,
    machine: SharedMachine,
    forward: Arc<ForwardInputUseCase>,
    emulate: Mutex<EmulateInputUseCase>,
    network: Arc<ConnectionManager>,
    peers: Arc<PeerDirectory>,
    config: Mutex<NodeConfig>,
    config_path: Option<PathBuf>,
    outbound: mpsc::UnboundedSender<Packet>,
    notify: mpsc::UnboundedSender<UiNotification>,
    services: Mutex<Services>,
    channels: Mutex<Option<RunChannels>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn mode_name(mode: ControlMode) -> &'static str {
    match mode {
        ControlMode::Local => "local",
        ControlMode::Remote => "remote",
    }
}

fn reason_text(reason: DisconnectReason) -> &'static str {
    match reason {
        DisconnectReason::RetriesExhausted => "peer unreachable",
        DisconnectReason::SendFailed => "send failed",
        DisconnectReason::PeerClosed => "peer closed the connection",
        DisconnectReason::ProtocolError => "protocol error",
    }
}

impl ControlOrchestrator {
    /// Builds the orchestrator and detects the local screen size.
    ///
    /// Peers listed in the configuration are registered in `peers` so they can
    /// be reached by pairing code.
    ///
    /// Returns the orchestrator together with the notification stream for the
    /// shell.
    pub fn new(
        caps: Capabilities,
        config: OrchestratorConfig,
        network: Arc<ConnectionManager>,
        peers: Arc<PeerDirectory>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<UiNotification>) {
        let node = config.node;
        let (width, height) =
            detect_screen_size(caps.screen.as_ref(), node.screen.fallback_size());
        info!(width, height, "local screen size");

        let mut state =
            edgeshare_core::EdgeStateMachine::new(node.settings.active_edge(), width, height);
        state.set_input_lock(node.settings.lock_input);
        let machine: SharedMachine = Arc::new(Mutex::new(state));

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let forward = Arc::new(ForwardInputUseCase::new(
            Arc::clone(&machine),
            caps.cursor,
            outbound_tx.clone(),
            signal_tx,
        ));
        let emulate = EmulateInputUseCase::new(caps.injector, caps.audio_playback, width, height);

        for peer in &node.peers {
            peers.register(&peer.code, peer.name.clone(), peer.ip);
        }

        let orchestrator = Arc::new(Self {
            capture: caps.capture,
            audio_capture: caps.audio_capture,
            machine,
            forward,
            emulate: Mutex::new(emulate),
            network,
            peers,
            config: Mutex::new(node),
            config_path: config.config_path,
            outbound: outbound_tx,
            notify: notify_tx,
            services: Mutex::new(Services::default()),
            channels: Mutex::new(Some(RunChannels {
                outbound: outbound_rx,
                signals: signal_rx,
            })),
        });
        (orchestrator, notify_rx)
    }

    /// Processes connection events and mode signals until shutdown.
    ///
    /// Spawns the outbound writer on entry. On exit every service is stopped
    /// and the connection manager is shut down. Calling `run` a second time
    /// returns immediately.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ConnectionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let channels = lock(&self.channels).take();
        let Some(RunChannels {
            outbound,
            mut signals,
        }) = channels
        else {
            warn!("orchestrator is already running");
            return;
        };

        let sink: Arc<dyn PacketSink> = self.network.clone();
        let writer = spawn_outbound_writer(sink, outbound);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_connection_event(event).await,
                    None => break,
                },
                Some(signal) = signals.recv() => self.handle_signal(signal),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("orchestrator stopping");
        self.stop_input();
        self.stop_audio();
        self.network.shutdown().await;
        writer.abort();
    }

    // ── Shell commands ────────────────────────────────────────────────────────

    /// Runs a shell command, reporting failures as a status notification.
    pub async fn execute(&self, command: UiCommand) {
        if let Err(e) = self.handle_command(command).await {
            warn!("command failed: {e}");
            self.notify_status(format!("Error: {e}"));
        }
    }

    /// Runs a shell command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the command cannot be carried out.
    pub async fn handle_command(&self, command: UiCommand) -> Result<(), CommandError> {
        debug!(?command, "shell command");
        match command {
            UiCommand::StartDiscovery => {
                let devices = self
                    .peers
                    .list()
                    .into_iter()
                    .map(|p| DeviceDto {
                        name: p.name,
                        ip: p.ip.to_string(),
                        code: p.code,
                    })
                    .collect();
                self.send_notification(UiNotification::DiscoveryResult { devices });
                Ok(())
            }
            UiCommand::ServiceToggle { service, enabled } => {
                self.toggle_service(&service, enabled)
            }
            UiCommand::ConnectDevice { ip, code } => {
                let target = ip
                    .filter(|s| !s.trim().is_empty())
                    .or(code)
                    .ok_or(CommandError::MissingTarget)?;
                self.connect(&target).await.map(|_| ())
            }
            UiCommand::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
            UiCommand::ToggleMode => self.toggle_mode().map(|_| ()),
            UiCommand::GetSettings => {
                let settings = lock(&self.config).settings.clone();
                self.send_notification(UiNotification::SettingsData(settings.into()));
                Ok(())
            }
            UiCommand::UpdateSettings(update) => {
                let mut settings = lock(&self.config).settings.clone();
                update.apply_to(&mut settings);
                self.apply_settings(settings);
                Ok(())
            }
            UiCommand::ResetSettings => {
                self.apply_settings(Settings::default());
                Ok(())
            }
        }
    }

    /// Aims the outbound connection at `target`.
    ///
    /// `target` is looked up as a pairing code first, then parsed as an IP
    /// address (peer port from the configuration) or a full socket address.
    ///
    /// # Errors
    ///
    /// [`CommandError::MissingTarget`] for an empty target,
    /// [`CommandError::UnresolvedTarget`] when nothing matches,
    /// [`CommandError::Network`] once the network has shut down.
    pub async fn connect(&self, target: &str) -> Result<SocketAddr, CommandError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(CommandError::MissingTarget);
        }
        let port = lock(&self.config).network.port;
        let addr = if let Some(ip) = self.peers.resolve(target) {
            SocketAddr::new(ip, port)
        } else if let Ok(ip) = target.parse::<IpAddr>() {
            SocketAddr::new(ip, port)
        } else if let Ok(addr) = target.parse::<SocketAddr>() {
            addr
        } else {
            return Err(CommandError::UnresolvedTarget(target.to_string()));
        };

        info!(%addr, "connecting to peer");
        self.network.set_target(addr).await?;
        lock_machine(&self.machine).set_has_target(true);
        self.notify_status(format!("Connecting to {addr}"));
        Ok(addr)
    }

    /// Drops the outbound connection and returns to local control.
    pub async fn disconnect(&self) {
        self.network.disconnect().await;
        self.clear_target();
        self.notify_status("Disconnected".to_string());
    }

    /// Starts or stops a service by name (`"input"` or `"audio"`).
    ///
    /// # Errors
    ///
    /// [`CommandError::UnknownService`] for any other name, or the capability
    /// error when a service fails to start.
    pub fn toggle_service(&self, name: &str, enabled: bool) -> Result<(), CommandError> {
        match (name, enabled) {
            ("input", true) => self.start_input(),
            ("input", false) => {
                self.stop_input();
                Ok(())
            }
            ("audio", true) => self.start_audio(),
            ("audio", false) => {
                self.stop_audio();
                Ok(())
            }
            _ => Err(CommandError::UnknownService(name.to_string())),
        }
    }

    /// Switches between local and remote control by hand.
    ///
    /// # Errors
    ///
    /// [`CommandError::MissingTarget`] when asked to go remote without a
    /// target or with the edge disabled.
    pub fn toggle_mode(&self) -> Result<ControlMode, CommandError> {
        let mode = {
            let mut machine = lock_machine(&self.machine);
            match machine.mode() {
                ControlMode::Local => {
                    if !machine.enter_remote() {
                        return Err(CommandError::MissingTarget);
                    }
                }
                ControlMode::Remote => machine.leave_remote(Instant::now()),
            }
            machine.mode()
        };
        self.publish_mode();
        Ok(mode)
    }

    /// Applies new settings to the state machine and persists them.
    pub fn apply_settings(&self, mut settings: Settings) {
        let edge = settings.active_edge();
        settings.edge = edge.as_str().to_string();

        let left_remote = {
            let mut machine = lock_machine(&self.machine);
            machine.set_active_edge(edge);
            machine.set_input_lock(settings.lock_input);
            if edge == ScreenEdge::None && machine.mode() == ControlMode::Remote {
                machine.leave_remote(Instant::now());
                true
            } else {
                false
            }
        };
        if left_remote {
            self.publish_mode();
        }
        info!(%edge, lock_input = settings.lock_input, "settings applied");

        let snapshot = {
            let mut config = lock(&self.config);
            config.settings = settings.clone();
            config.clone()
        };
        if let Some(path) = &self.config_path {
            if let Err(e) = save_config(path, &snapshot) {
                warn!(path = %path.display(), "could not persist settings: {e}");
            }
        }
        self.send_notification(UiNotification::SettingsData(SettingsDto::from(settings)));
    }

    pub fn mode(&self) -> ControlMode {
        lock_machine(&self.machine).mode()
    }

    pub fn screen_size(&self) -> (u32, u32) {
        lock_machine(&self.machine).screen_size()
    }

    /// The use case that consumes captured events; exposed for custom hooks.
    pub fn forward_input(&self) -> Arc<ForwardInputUseCase> {
        Arc::clone(&self.forward)
    }

    // ── Services ──────────────────────────────────────────────────────────────

    fn start_input(&self) -> Result<(), CommandError> {
        let mut services = lock(&self.services);
        if services.input.is_some() {
            debug!("input service already running");
            return Ok(());
        }
        let events = self.capture.start()?;
        match Arc::clone(&self.forward).spawn_capture_pump(events) {
            Ok(handle) => services.input = Some(handle),
            Err(e) => {
                self.capture.stop();
                return Err(e.into());
            }
        }
        info!("input service started");
        Ok(())
    }

    fn stop_input(&self) {
        // The pump exits once capture closes its channel.
        if lock(&self.services).input.take().is_none() {
            return;
        }
        self.capture.stop();
        let was_remote = {
            let mut machine = lock_machine(&self.machine);
            let remote = machine.mode() == ControlMode::Remote;
            machine.leave_remote(Instant::now());
            remote
        };
        if was_remote {
            self.publish_mode();
        }
        info!("input service stopped");
    }

    fn start_audio(&self) -> Result<(), CommandError> {
        let mut services = lock(&self.services);
        if services.audio.is_some() {
            debug!("audio service already running");
            return Ok(());
        }
        let frames = self.audio_capture.start()?;
        let outbound = self.outbound.clone();
        let spawned = thread::Builder::new()
            .name("edgeshare-audio".into())
            .spawn(move || {
                while let Ok(frame) = frames.recv() {
                    if outbound.send(Packet::AudioFrame(frame)).is_err() {
                        break;
                    }
                }
                debug!("audio pump stopped");
            });
        match spawned {
            Ok(handle) => services.audio = Some(handle),
            Err(e) => {
                self.audio_capture.stop();
                return Err(e.into());
            }
        }
        info!("audio service started");
        Ok(())
    }

    fn stop_audio(&self) {
        if lock(&self.services).audio.take().is_some() {
            self.audio_capture.stop();
            info!("audio service stopped");
        }
    }

    // ── Event handling ────────────────────────────────────────────────────────

    async fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::InboundAccepted { link, peer } => {
                debug!(%peer, %link, "inbound peer accepted");
            }
            ConnectionEvent::InboundClosed { link, peer } => {
                debug!(%peer, %link, "inbound peer gone");
                lock(&self.emulate).reset();
                self.notify_status(format!("Peer {} disconnected", peer.ip()));
            }
            ConnectionEvent::OutboundConnected { peer } => {
                let machine_name = lock(&self.config).node.machine_name.clone();
                // Queued so it leaves ahead of any input forwarded after it.
                if self.outbound.send(Packet::Handshake { machine_name }).is_err() {
                    warn!("outbound queue closed; handshake not sent");
                }
                self.notify_status(format!("Connected to {peer}"));
            }
            ConnectionEvent::OutboundDisconnected { peer, reason } => {
                warn!(%peer, ?reason, "outbound connection lost");
                // A newer target may already be connecting.
                if self.network.target().await.is_none() {
                    self.clear_target();
                }
                self.notify_status(format!("Disconnected from {peer}: {}", reason_text(reason)));
            }
            ConnectionEvent::Frame { link, payload } => self.handle_frame(link, &payload).await,
        }
    }

    async fn handle_frame(&self, link: LinkId, payload: &[u8]) {
        let packet = match decode_packet(payload) {
            Ok(p) => p,
            Err(e) => {
                debug!(?link, len = payload.len(), "dropping undecodable frame: {e}");
                return;
            }
        };
        trace!(?link, tag = ?packet.packet_type(), "packet received");

        match packet {
            Packet::Handshake { machine_name } => {
                info!(?link, peer = %machine_name, "peer handshake");
                if let Err(e) = self.network.reply(link, &Packet::HandshakeAck).await {
                    warn!(?link, "could not acknowledge handshake: {e}");
                }
                self.notify_status(format!("Connected with {machine_name}"));
            }
            Packet::HandshakeAck => {
                info!(?link, "peer acknowledged handshake");
            }
            Packet::Ping => trace!(?link, "ping"),
            packet => {
                let tag = packet.packet_type();
                let replayed = lock(&self.emulate).handle_packet(packet);
                if let Err(e) = replayed {
                    debug!(?tag, "packet not replayed: {e}");
                }
            }
        }
    }

    fn handle_signal(&self, signal: ModeSignal) {
        let expected = match signal {
            ModeSignal::EdgeHit => ControlMode::Remote,
            ModeSignal::Returned => ControlMode::Local,
        };
        // A command may have switched the machine again while the signal sat
        // in the queue; that switch was already published.
        let current = lock_machine(&self.machine).mode();
        if current != expected {
            debug!(?signal, mode = mode_name(current), "dropping stale mode signal");
            return;
        }
        self.publish_mode();
    }

    /// Aligns capture blocking with the machine's current mode and tells the
    /// shell.
    fn publish_mode(&self) {
        // Blocking is set under the machine lock so the last call always
        // matches the last transition.
        let mode = {
            let machine = lock_machine(&self.machine);
            let mode = machine.mode();
            self.capture.set_blocking(mode == ControlMode::Remote);
            mode
        };
        info!(mode = mode_name(mode), "control mode changed");
        self.send_notification(UiNotification::ModeChanged {
            mode: mode_name(mode).to_string(),
        });
    }

    fn clear_target(&self) {
        let was_remote = {
            let mut machine = lock_machine(&self.machine);
            machine.set_has_target(false);
            let remote = machine.mode() == ControlMode::Remote;
            machine.leave_remote(Instant::now());
            remote
        };
        if was_remote {
            self.publish_mode();
        }
    }

    fn notify_status(&self, status: String) {
        self.send_notification(UiNotification::ConnectionStatus { status });
    }

    fn send_notification(&self, notification: UiNotification) {
        if self.notify.send(notification).is_err() {
            trace!("no shell attached; notification dropped");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
