//! ForwardInputUseCase: feeds captured local input through the edge state machine.
//!
//! This use case runs on the capture pump thread, never on the OS hook thread:
//! the hook only pushes [`LocalInputEvent`]s onto a std channel. Every event is
//! evaluated under the state machine lock, so a pointer move is always handled
//! entirely in one mode. Packets leave through an unbounded queue drained by a
//! single writer task, which preserves capture order on the wire.
//!
//! # Architecture
//!
//! This use case depends only on traits (`PacketSink`, `CursorController`) and
//! domain types (`EdgeStateMachine`). Infrastructure implementations are
//! injected at construction time, making it fully unit-testable.

use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use async_trait::async_trait;
use edgeshare_core::domain::edge::{EdgeStateMachine, ModeSignal};
use edgeshare_core::protocol::Packet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::infrastructure::input_capture::LocalInputEvent;
use crate::infrastructure::network::connection_manager::NetworkError;

/// State machine shared between the capture pump and the orchestrator.
pub type SharedMachine = Arc<Mutex<EdgeStateMachine>>;

/// Locks the shared machine, recovering the state if a holder panicked.
pub fn lock_machine(machine: &Mutex<EdgeStateMachine>) -> MutexGuard<'_, EdgeStateMachine> {
    machine.lock().unwrap_or_else(|e| e.into_inner())
}

/// Trait for sending packets to the peer.
///
/// The connection manager implements this; test implementations record calls.
#[async_trait]
pub trait PacketSink: Send + Sync {
    async fn send_packet(&self, packet: &Packet) -> Result<(), NetworkError>;
}

/// Trait for controlling the physical local cursor position.
///
/// Infrastructure implementation calls `SetCursorPos`; test implementation records calls.
pub trait CursorController: Send + Sync {
    /// Teleports the physical cursor to (x, y) in local screen pixels.
    fn teleport_cursor(&self, x: i32, y: i32);
}

/// The Forward Input use case.
pub struct ForwardInputUseCase {
    machine: SharedMachine,
    cursor: Arc<dyn CursorController>,
    outbound: mpsc::UnboundedSender<Packet>,
    signals: mpsc::UnboundedSender<ModeSignal>,
}

impl ForwardInputUseCase {
    /// Creates the use case.
    ///
    /// Packets are queued on `outbound`; edge-hit and return signals are
    /// reported on `signals` after the machine has already changed mode.
    pub fn new(
        machine: SharedMachine,
        cursor: Arc<dyn CursorController>,
        outbound: mpsc::UnboundedSender<Packet>,
        signals: mpsc::UnboundedSender<ModeSignal>,
    ) -> Self {
        Self {
            machine,
            cursor,
            outbound,
            signals,
        }
    }

    /// Handles one captured event.
    pub fn handle_event(&self, event: LocalInputEvent) {
        self.handle_event_at(event, Instant::now());
    }

    /// Handles one captured event with an explicit timestamp.
    pub fn handle_event_at(&self, event: LocalInputEvent, now: Instant) {
        let mut machine = lock_machine(&self.machine);
        let packet = match event {
            LocalInputEvent::PointerMove { x, y } => {
                let reaction = machine.handle_pointer_move(x, y, now);
                if let Some((px, py)) = reaction.pin_to {
                    self.cursor.teleport_cursor(px, py);
                }
                match reaction.signal {
                    Some(ModeSignal::EdgeHit) => {
                        // Promotion happens under the same lock as the hit.
                        if machine.enter_remote() {
                            info!(edge = %machine.active_edge(), "edge hit; forwarding input");
                            let (ax, ay) = machine.edge_anchor(x, y);
                            if machine.input_lock() {
                                self.cursor.teleport_cursor(ax, ay);
                            }
                            self.emit_signal(ModeSignal::EdgeHit);
                        }
                    }
                    Some(ModeSignal::Returned) => {
                        info!("pointer pulled back; input is local again");
                        self.emit_signal(ModeSignal::Returned);
                    }
                    None => {}
                }
                reaction.packet
            }
            LocalInputEvent::Button { button, action } => machine.handle_button(button, action),
            LocalInputEvent::Wheel { delta } => machine.handle_wheel(delta),
            LocalInputEvent::Key { code, action } => machine.handle_key(code, action),
        };
        drop(machine);

        if let Some(packet) = packet {
            trace!(tag = ?packet.packet_type(), "queueing packet");
            if self.outbound.send(packet).is_err() {
                debug!("outbound queue closed; dropping packet");
            }
        }
    }

    /// Drains `events` on a dedicated thread until the capture channel closes.
    pub fn spawn_capture_pump(
        self: Arc<Self>,
        events: std_mpsc::Receiver<LocalInputEvent>,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("edgeshare-capture".into())
            .spawn(move || {
                while let Ok(event) = events.recv() {
                    self.handle_event(event);
                }
                debug!("capture pump stopped");
            })
    }

    fn emit_signal(&self, signal: ModeSignal) {
        if self.signals.send(signal).is_err() {
            debug!(?signal, "signal receiver closed");
        }
    }
}

/// Spawns the single writer task that drains the outbound queue in order.
pub fn spawn_outbound_writer(
    sink: Arc<dyn PacketSink>,
    mut queue: mpsc::UnboundedReceiver<Packet>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(packet) = queue.recv().await {
            match sink.send_packet(&packet).await {
                Ok(()) => {}
                Err(NetworkError::NotConnected) => {
                    trace!(tag = ?packet.packet_type(), "no outbound connection; packet dropped");
                }
                Err(e) => warn!("failed to forward packet: {e}"),
            }
        }
        debug!("outbound writer stopped");
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
