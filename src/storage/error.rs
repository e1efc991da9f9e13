//! Keyspace error types.

use crate::storage::bloom::BloomError;
use thiserror::Error;

/// Failures raised by keyspace operations. None of them mutate the key.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The key holds a different value variant
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The stored string is not a base-10 64-bit integer
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    /// A Bloom filter already exists at the key
    #[error("ERR item exists")]
    KeyExists,

    #[error("ERR {0}")]
    Bloom(#[from] BloomError),
}

pub type StoreResult<T> = Result<T, StoreError>;
