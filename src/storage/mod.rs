//! Storage Module
//!
//! This module holds the keyspace and everything stored in it: the
//! concurrent key → entry map, the value variants, the Bloom filter, and
//! snapshot persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Keyspace                            │
//! │          DashMap<Bytes, Arc<Entry { value, expiry }>>       │
//! │                                                             │
//! │   String   Hash     List      Set      SortedSet   Bloom    │
//! │   Bytes    DashMap  RwLock    DashSet  RwLock      Atomic   │
//! │                     VecDeque           BTreeMap    words    │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ snapshot() / load_snapshot()
//!              ┌─────────────┴─────────────┐
//!              │     SnapshotManager       │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Lock-free keyspace**: per-key compare-and-swap on entry identity
//! - **Typed values**: a key keeps one variant; mismatches are `WRONGTYPE`
//! - **Lazy expiry**: expired keys are evicted when next touched
//! - **Snapshots**: atomic dump-and-rename to a single file
//!
//! ## Example
//!
//! ```
//! use flintkv::storage::{Keyspace, TtlResult};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let keyspace = Keyspace::new();
//!
//! keyspace.set(Bytes::from("session"), Bytes::from("token123"), Some(Duration::from_secs(3600)));
//! assert!(matches!(keyspace.ttl(b"session"), TtlResult::Seconds(_)));
//!
//! keyspace.sadd(&Bytes::from("tags"), vec![Bytes::from("rust")]).unwrap();
//! assert_eq!(keyspace.smembers(b"tags").unwrap(), vec![Bytes::from("rust")]);
//! ```

pub mod bloom;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod value;

// Re-export commonly used types
pub use bloom::{BloomError, BloomFilter};
pub use engine::{unix_millis, Entry, Keyspace, StorageStats, TtlResult};
pub use error::{StoreError, StoreResult};
pub use snapshot::{SnapshotError, SnapshotManager};
pub use value::Value;
