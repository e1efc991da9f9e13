//! Wire Protocol Codec
//!
//! Requests arrive as length-prefixed arrays of bulk strings and are
//! decoded into a [`Command`]. Replies are built as [`RespValue`]s and
//! encoded back into the textual, CRLF-terminated wire format.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` reply enum and its encoder
//! - `parser`: incremental request decoder
//!
//! ## Example
//!
//! ```
//! use flintkv::protocol::{parse_command, RespValue};
//! use bytes::Bytes;
//!
//! let data = b"*2\r\n$3\r\nget\r\n$4\r\nname\r\n";
//! let (command, consumed) = parse_command(data).unwrap().unwrap();
//! assert_eq!(command.name, "GET");
//! assert_eq!(consumed, data.len());
//!
//! let reply = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{
    parse_command, Command, ParseError, ParseResult, RequestParser, MAX_ARGS, MAX_BULK_SIZE,
};
pub use types::RespValue;
