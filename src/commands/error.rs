//! Command-level errors.
//!
//! The `Display` text of each variant is exactly what the client receives
//! after the leading `-`.

use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Carries the lowercase command name
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CommandResult<T> = Result<T, CommandError>;
