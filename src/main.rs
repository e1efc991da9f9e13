//! FlintKV server entry point.
//!
//! Loads the last snapshot (when persistence is on), serves clients until
//! Ctrl+C, then writes a final snapshot.

use anyhow::Context;
use clap::Parser;
use flintkv::commands::CommandHandler;
use flintkv::config::Config;
use flintkv::connection::{handle_connection, ConnectionStats};
use flintkv::storage::{Keyspace, SnapshotManager};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        version = flintkv::VERSION,
        persistence = ?config.persistence,
        "Starting FlintKV"
    );

    // The keyspace is shared by every connection and the snapshot task
    let keyspace = Arc::new(Keyspace::new());

    let snapshots = if config.persistence_enabled() {
        let manager = SnapshotManager::new(&config.rdb_file);
        if let Err(e) = manager.load(&keyspace) {
            error!(
                path = %config.rdb_file.display(),
                error = %e,
                "Failed to load snapshot, starting empty"
            );
            if let Err(e) = manager.quarantine() {
                error!(error = %e, "Failed to move bad snapshot aside");
            }
        }
        Some(manager)
    } else {
        None
    };

    let snapshot_task = snapshots.clone().map(|manager| {
        spawn_snapshot_task(manager, Arc::clone(&keyspace), config.snapshot_interval())
    });

    let stats = Arc::new(ConnectionStats::new());
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Ready to accept connections");

    let handler = CommandHandler::new(Arc::clone(&keyspace));

    tokio::select! {
        _ = accept_loop(listener, handler, Arc::clone(&stats)) => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    // an interval save already on the blocking pool keeps running; the
    // final save waits for it on the manager's save lock
    if let Some(task) = snapshot_task {
        task.abort();
    }
    if let Some(manager) = snapshots {
        save_snapshot(manager, Arc::clone(&keyspace)).await;
    }

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        keys = keyspace.len(),
        "Server shutdown complete"
    );
    Ok(())
}

async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    handler.clone(),
                    Arc::clone(&stats),
                ));
            }
            Err(e) => error!(error = %e, "Failed to accept connection"),
        }
    }
}

/// Saves a snapshot every `interval` until aborted.
fn spawn_snapshot_task(
    manager: SnapshotManager,
    keyspace: Arc<Keyspace>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            save_snapshot(manager.clone(), Arc::clone(&keyspace)).await;
        }
    })
}

/// Writes a snapshot off the async workers. Failures are logged and the
/// server keeps serving from memory.
async fn save_snapshot(manager: SnapshotManager, keyspace: Arc<Keyspace>) {
    let result = tokio::task::spawn_blocking(move || manager.save(&keyspace)).await;
    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "Snapshot failed"),
        Err(e) => error!(error = %e, "Snapshot task panicked"),
    }
}
