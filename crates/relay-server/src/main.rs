//! Relay node binary.
//!
//! Startup order matters: settings → tracing → metrics → cluster backends →
//! coordinator → bus subscription → sweep task → listener. Shutdown is the
//! reverse of the interesting half: flip the coordinator into drain mode,
//! let the listener wind down, then close every local socket.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use relay_bus::{FanoutBus, LoopbackBus, RedisFanoutBus};
use relay_coordinator::Coordinator;
use relay_core::transport::CloseReason;
use relay_presence::{MemoryPresenceStore, PresenceKeys, PresenceStore, RedisPresenceStore};
use relay_server::{AppState, build_router, spawn_bus_pump, spawn_sweep_task};
use relay_settings::{RelaySettings, load_settings_from_path};
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Cluster-wide real-time connection coordinator node.
#[derive(Debug, Parser)]
#[command(name = "relay-server", version, about)]
struct Args {
    /// Settings file path (default: `~/.relay/settings.json`).
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RelaySettings::load(),
    };
    relay_core::logging::init_tracing(&settings.logging.level, settings.logging.json);

    let node_id = settings.node.resolve_id();
    info!(node_id = %node_id, "starting relay node");

    let metrics = relay_server::metrics::install_recorder();

    let (presence, bus): (Arc<dyn PresenceStore>, Arc<dyn FanoutBus>) =
        match &settings.presence.url {
            Some(url) => {
                let keys = PresenceKeys::new(settings.presence.key_prefix.clone());
                let presence = RedisPresenceStore::connect(url, keys)
                    .await
                    .context("connecting presence store")?;
                let bus = RedisFanoutBus::connect(url, settings.bus.channel.clone())
                    .await
                    .context("connecting fanout bus")?;
                (Arc::new(presence), Arc::new(bus))
            }
            None => {
                warn!("no presence url configured, running single-node with in-process backends");
                (
                    Arc::new(MemoryPresenceStore::new()),
                    Arc::new(LoopbackBus::new()),
                )
            }
        };

    let coordinator = Arc::new(Coordinator::new(
        node_id,
        Duration::from_secs(settings.heartbeat.timeout_secs),
        presence,
        Arc::clone(&bus),
    ));

    spawn_bus_pump(Arc::clone(&coordinator), bus).await;
    spawn_sweep_task(
        Arc::clone(&coordinator),
        Duration::from_secs(settings.heartbeat.sweep_interval_secs),
    );

    let state = AppState {
        coordinator: Arc::clone(&coordinator),
        metrics,
    };
    let router = build_router(state);

    let addr = format!("{}:{}", settings.server.bind, settings.server.ws_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&coordinator)))
        .await
        .context("server error")?;

    drain(&coordinator).await;
    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then flip into drain mode.
async fn shutdown_signal(coordinator: Arc<Coordinator>) {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, entering drain");
    coordinator.enter_shutdown();
}

/// Close every local socket. Presence is deliberately left alone — the
/// coordinator is draining, and peers' heartbeat sweeps reap the leftovers.
async fn drain(coordinator: &Coordinator) {
    let sessions = coordinator.sessions().all_sessions();
    info!(count = sessions.len(), "closing local sessions");
    for session in sessions {
        coordinator
            .close_session(&session, CloseReason::Restarting)
            .await;
    }
}
