//! # FlintKV - A Concurrent In-Memory Key-Value Engine
//!
//! FlintKV stores strings, hashes, lists, sets, sorted sets and Bloom
//! filters in a single shared keyspace and speaks a Redis-compatible wire
//! protocol.
//!
//! ## Features
//!
//! - **Lock-free keyspace**: per-key compare-and-swap, no global lock
//! - **Typed values**: one variant per key, `WRONGTYPE` on mismatch
//! - **Lazy expiry**: keys vanish on the first access past their deadline
//! - **Bloom filters**: atomic bit words with a stable serialized layout
//! - **Snapshots**: optional periodic dump to a single file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlintKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │  Request    │    │           Keyspace           │ │
//! │                     │  Parser     │    │  DashMap<Bytes, Arc<Entry>>  │ │
//! │                     └─────────────┘    └──────────────┬───────────────┘ │
//! │                                                       │                 │
//! │                                        ┌──────────────┴───────────────┐ │
//! │                                        │       SnapshotManager        │ │
//! │                                        │  (periodic + at shutdown)    │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flintkv::commands::CommandHandler;
//! use flintkv::protocol::{Command, RespValue};
//! use flintkv::storage::Keyspace;
//! use std::sync::Arc;
//!
//! let handler = CommandHandler::new(Arc::new(Keyspace::new()));
//!
//! let zadd = Command::from_parts(["ZADD", "board", "10", "ann"]).unwrap();
//! assert_eq!(handler.dispatch(&zadd), RespValue::integer(1));
//!
//! let incr = Command::from_parts(["INCR", "visits"]).unwrap();
//! assert_eq!(handler.dispatch(&incr).serialize(), b":1\r\n");
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoder and reply encoder
//! - [`storage`]: keyspace, value variants, Bloom filter, snapshots
//! - [`commands`]: command table and handlers
//! - [`connection`]: per-client connection loop
//! - [`config`]: command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, ParseError, RequestParser, RespValue};
pub use storage::{Keyspace, SnapshotManager};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
