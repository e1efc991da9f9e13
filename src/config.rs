//! Server configuration.
//!
//! Every option can be given on the command line or through its
//! environment variable; the command line wins.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// How the keyspace is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PersistenceMode {
    /// Memory only
    None,
    /// Periodic snapshots plus one at shutdown
    Rdb,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "flintkv", author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind to
    #[arg(long, env = "FLINTKV_HOST", default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "REDIS_PORT", default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Persistence mode
    #[arg(long, env = "PERSISTENCE_MODE", value_enum, default_value_t = PersistenceMode::None)]
    pub persistence: PersistenceMode,

    /// Snapshot file used when persistence is `rdb`
    #[arg(long, env = "RDB_FILE_PATH", default_value = "dump.rdb")]
    pub rdb_file: PathBuf,

    /// Seconds between periodic snapshots
    #[arg(
        long,
        env = "RDB_SNAPSHOT_INTERVAL",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub snapshot_interval: u64,

    /// Default log filter (overridden by RUST_LOG)
    #[arg(long, env = "FLINTKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval)
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence == PersistenceMode::Rdb
    }
}
