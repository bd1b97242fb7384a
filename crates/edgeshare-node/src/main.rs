//! EdgeShare node entry point.
//!
//! Loads the configuration, starts the connection manager and the control
//! orchestrator, and bridges the surrounding UI shell over stdio.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()                -- TOML, defaults when absent
//!  └─ ConnectionManager::start_listener()
//!  └─ ControlOrchestrator::run()   -- connection events + mode signals
//!  └─ stdin reader                 -- one JSON UiCommand per line
//!  └─ stdout writer                -- one JSON UiNotification per line
//! ```
//!
//! Logs go to stderr so stdout carries nothing but shell notifications.
//!
//! # Platform capabilities
//!
//! Screen size and cursor pinning use the native display on Windows. Global
//! input hooks, input injection and audio devices are provided by the host
//! shell integration; this binary runs with the headless capture, the logging
//! injector and no audio backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use edgeshare_node::application::control::{
    Capabilities, ControlOrchestrator, OrchestratorConfig,
};
use edgeshare_node::application::peers::PeerDirectory;
use edgeshare_node::infrastructure::{
    audio::NullAudio,
    input_capture::HeadlessCapture,
    input_injection::LoggingInjector,
    network::connection_manager::ConnectionManager,
    storage::config::{default_config_path, load_config, NodeConfig},
    ui_bridge::{parse_command, render_notification},
};

/// Software KVM node: share one keyboard and mouse across two machines.
#[derive(Debug, Parser)]
#[command(name = "edgeshare", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "EDGESHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Data port; overrides `[network] port`.
    #[arg(long, env = "EDGESHARE_PORT")]
    port: Option<u16>,

    /// Peer to connect to at startup (IP address or pairing code).
    #[arg(long)]
    connect: Option<String>,
}

#[cfg(target_os = "windows")]
fn native_capabilities(_config: &NodeConfig) -> Capabilities {
    use edgeshare_node::infrastructure::screen_info::NativeDisplay;

    let display = Arc::new(NativeDisplay::new());
    Capabilities {
        capture: Arc::new(HeadlessCapture::new()),
        injector: Arc::new(LoggingInjector),
        cursor: display.clone(),
        screen: display,
        audio_capture: Arc::new(NullAudio),
        audio_playback: Arc::new(NullAudio),
    }
}

#[cfg(not(target_os = "windows"))]
fn native_capabilities(config: &NodeConfig) -> Capabilities {
    use edgeshare_node::infrastructure::screen_info::{FixedScreen, HeadlessCursor};

    let (width, height) = config.screen.fallback_size();
    Capabilities {
        capture: Arc::new(HeadlessCapture::new()),
        injector: Arc::new(LoggingInjector),
        cursor: Arc::new(HeadlessCursor),
        screen: Arc::new(FixedScreen::new(width, height)),
        audio_capture: Arc::new(NullAudio),
        audio_playback: Arc::new(NullAudio),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration is read first so its log level can seed the filter.
    let config_path = match cli.config.clone() {
        Some(path) => Some(path),
        None => default_config_path().ok(),
    };
    let loaded = match &config_path {
        Some(path) => load_config(path),
        None => Ok(NodeConfig::default()),
    };
    let (mut config, load_error) = match loaded {
        Ok(cfg) => (cfg, None),
        Err(e) => (NodeConfig::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.node.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("EdgeShare node starting");
    if let Some(e) = load_error {
        warn!("configuration unreadable, using defaults: {e}");
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // ── Network ───────────────────────────────────────────────────────────────
    let (network, events) = ConnectionManager::new(config.network.to_network_config());
    let local = network
        .start_listener()
        .await
        .context("failed to start the peer listener")?;
    info!(%local, machine = %config.node.machine_name, "node ready");

    // ── Orchestrator ──────────────────────────────────────────────────────────
    let caps = native_capabilities(&config);
    let peers = Arc::new(PeerDirectory::new());
    let (orchestrator, mut notifications) = ControlOrchestrator::new(
        caps,
        OrchestratorConfig {
            node: config,
            config_path,
        },
        Arc::clone(&network),
        peers,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run_task = tokio::spawn(Arc::clone(&orchestrator).run(events, shutdown_rx));

    if let Err(e) = orchestrator.toggle_service("input", true) {
        warn!("input capture unavailable: {e}");
    }
    if let Some(target) = cli.connect.as_deref() {
        if let Err(e) = orchestrator.connect(target).await {
            error!(target, "startup connect failed: {e}");
        }
    }

    // ── Shell bridge: stdout ──────────────────────────────────────────────────
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(notification) = notifications.recv().await {
            let line = match render_notification(&notification) {
                Ok(line) => line,
                Err(e) => {
                    warn!("could not render notification: {e}");
                    continue;
                }
            };
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                debug!("shell output closed: {e}");
                break;
            }
        }
    });

    // ── Shell bridge: stdin ───────────────────────────────────────────────────
    let shell = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(command) => shell.execute(command).await,
                    Err(e) => warn!("ignoring shell input: {e}"),
                },
                Ok(None) => {
                    debug!("shell input closed");
                    break;
                }
                Err(e) => {
                    warn!("shell input error: {e}");
                    break;
                }
            }
        }
    });

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    if let Err(e) = run_task.await {
        error!("orchestrator task failed: {e}");
    }

    info!("EdgeShare node stopped");
    Ok(())
}
