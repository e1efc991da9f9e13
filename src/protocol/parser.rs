//! Request Decoder
//!
//! Clients send every request as an array of bulk strings:
//!
//! ```text
//! *<N>\r\n
//! $<len>\r\n<len bytes>\r\n     (repeated N times)
//! ```
//!
//! Payloads are read by exact byte count, never by scanning for a
//! delimiter, so arguments may contain CR, LF or NUL bytes. Only the header
//! lines are located by searching for CRLF.
//!
//! ## Incremental Decoding
//!
//! [`RequestParser::parse`] returns:
//! - `Ok(Some((command, consumed)))` when a whole request is buffered
//! - `Ok(None)` when more bytes are needed
//! - `Err(ParseError)` when the stream violates the framing
//!
//! A framing error leaves the stream unsynchronized. The caller must drop
//! the connection rather than answer with an error reply.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Framing violations. All of them are fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The request did not start with an array header
    #[error("expected '*', got {0:#04x}")]
    ExpectedArray(u8),

    /// An argument did not start with a bulk string header
    #[error("expected '$', got {0:#04x}")]
    ExpectedBulkString(u8),

    /// A length header was not a decimal integer
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// Array length is negative or zero
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Bulk string length is negative
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// A bulk payload was not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingTerminator,

    /// A length header exceeds the configured limit
    #[error("message too large: {size} (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size of a single bulk argument (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of arguments in one request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Maximum header line length before we give up waiting for CRLF
const MAX_HEADER_LINE: usize = 32;

/// A decoded request: an uppercase command name plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl Command {
    /// Builds a command from string parts. The first part is the name.
    ///
    /// Returns `None` for an empty part list.
    pub fn from_parts<I, T>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        let mut parts = parts.into_iter().map(Into::into);
        let name = parts.next()?;
        let name = String::from_utf8_lossy(&name).to_ascii_uppercase();
        Some(Self {
            name,
            args: parts.collect(),
        })
    }
}

/// Stateless decoder for request frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParser;

impl RequestParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one request from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
        let (count, mut pos) = match read_header(buf, prefix::ARRAY)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count <= 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }
        let count = count as usize;
        if count > MAX_ARGS {
            return Err(ParseError::MessageTooLarge {
                size: count,
                max: MAX_ARGS,
            });
        }

        // Preallocation is capped so a hostile header cannot reserve gigabytes
        let mut parts: Vec<Bytes> = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            match read_bulk(&buf[pos..])? {
                Some((data, used)) => {
                    parts.push(data);
                    pos += used;
                }
                None => return Ok(None),
            }
        }

        let mut parts = parts.into_iter();
        let name = match parts.next() {
            Some(name) => name,
            None => return Err(ParseError::InvalidArrayLength(0)),
        };
        // invalid UTF-8 is left for the dispatcher to reject as unknown
        let name = String::from_utf8_lossy(&name).to_ascii_uppercase();

        Ok(Some((
            Command {
                name,
                args: parts.collect(),
            },
            pos,
        )))
    }
}

/// Reads `<prefix><integer>\r\n`, returning the integer and bytes used.
fn read_header(buf: &[u8], expected: u8) -> ParseResult<Option<(i64, usize)>> {
    let first = match buf.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    if first != expected {
        return Err(match expected {
            prefix::ARRAY => ParseError::ExpectedArray(first),
            _ => ParseError::ExpectedBulkString(first),
        });
    }

    let end = match find_crlf(&buf[1..]) {
        Some(end) => end,
        None if buf.len() > MAX_HEADER_LINE => {
            return Err(ParseError::InvalidLength(
                String::from_utf8_lossy(&buf[1..MAX_HEADER_LINE]).into_owned(),
            ))
        }
        None => return Ok(None),
    };

    let digits = &buf[1..1 + end];
    let n = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;

    Ok(Some((n, 1 + end + 2)))
}

/// Reads one `$<len>\r\n<payload>\r\n` argument.
fn read_bulk(buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
    let (len, header) = match read_header(buf, prefix::BULK_STRING)? {
        Some(h) => h,
        None => return Ok(None),
    };

    if len < 0 {
        return Err(ParseError::InvalidBulkLength(len));
    }
    let len = len as usize;
    if len > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: len,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header + len + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + len..total] != CRLF {
        return Err(ParseError::MissingTerminator);
    }

    Ok(Some((Bytes::copy_from_slice(&buf[header..header + len]), total)))
}

/// Finds the position of the first CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single request with a fresh parser.
pub fn parse_command(buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
    RequestParser::new().parse(buf)
}
