//! Command Handler Module
//!
//! This module implements the command processing layer for FlintKV.
//! It receives decoded commands, validates them against the command table,
//! executes them against the keyspace, and returns the reply.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ RequestParser   │  (protocol module)
//! └────────┬────────┘
//!          │ Command { name, args }
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Resolve      │  CommandRegistry: name → arity + handler
//! │  - Parse args   │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   Keyspace      │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Strings and Keys
//! - `GET`, `SET key value [EX seconds]`, `INCR`
//! - `EXPIRE`, `TTL`, `TYPE`
//!
//! ### Containers
//! - `HSET`, `HGET`
//! - `LPUSH`
//! - `SADD`, `SREM`, `SMEMBERS`
//! - `ZADD`, `ZRANGE`
//!
//! ### Bloom Filters
//! - `BF.RESERVE`, `BF.ADD`, `BF.EXISTS`
//!
//! ### Connection
//! - `PING [message]`

mod bloom;
mod collections;
pub mod error;
pub mod handler;
mod parse;
pub mod registry;
mod strings;

pub use error::{CommandError, CommandResult};
pub use handler::CommandHandler;
pub use registry::{CommandArity, CommandRegistry, CommandSpec, HandlerFn};
