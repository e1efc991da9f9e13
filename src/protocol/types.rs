//! Reply Types and Encoding
//!
//! Every reply the engine produces is a [`RespValue`]. Encoding is
//! deterministic and textual, with each line terminated by CRLF.
//!
//! ## Wire Shapes
//!
//! | Shape        | Encoding                         |
//! |--------------|----------------------------------|
//! | status       | `+OK\r\n`                        |
//! | error        | `-ERR <msg>\r\n`                 |
//! | integer      | `:<n>\r\n`                       |
//! | bulk         | `$<len>\r\n<bytes>\r\n`          |
//! | null bulk    | `$-1\r\n`                        |
//! | array        | `*<count>\r\n<elements...>`      |
//! | null array   | `*-1\r\n`                        |
//!
//! Array elements are themselves arbitrary replies, so nested arrays encode
//! recursively.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The CRLF terminator used by the wire protocol
pub const CRLF: &[u8] = b"\r\n";

/// Type prefix bytes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status line. Must not contain CRLF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Error line.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe, length-prefixed string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string: `$-1\r\n`
    Null,

    /// Null array: `*-1\r\n`
    NullArray,

    /// Array of replies, possibly nested.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a bulk string reply.
    ///
    /// # Example
    /// ```
    /// use flintkv::protocol::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Builds an array of bulk strings.
    pub fn bulk_array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        RespValue::Array(items.into_iter().map(RespValue::BulkString).collect())
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Encodes the reply into a fresh buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.serialize_into(&mut buf);
        buf.to_vec()
    }

    /// Encodes the reply onto the end of `buf`.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::NullArray => write_line(buf, prefix::ARRAY, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Exact number of bytes [`serialize_into`](Self::serialize_into) appends.
    pub fn encoded_len(&self) -> usize {
        match self {
            RespValue::SimpleString(s) | RespValue::Error(s) => 1 + s.len() + 2,
            RespValue::Integer(n) => 1 + n.to_string().len() + 2,
            RespValue::BulkString(data) => 1 + decimal_len(data.len()) + 2 + data.len() + 2,
            RespValue::Null | RespValue::NullArray => 5,
            RespValue::Array(values) => {
                1 + decimal_len(values.len())
                    + 2
                    + values.iter().map(RespValue::encoded_len).sum::<usize>()
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null | RespValue::NullArray)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

#[inline]
fn write_line(buf: &mut BytesMut, prefix: u8, body: &[u8]) {
    buf.reserve(1 + body.len() + 2);
    buf.put_u8(prefix);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

#[inline]
fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null | RespValue::NullArray => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command 'FOO'");
        assert_eq!(value.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(RespValue::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(RespValue::integer(-2).serialize(), b":-2\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");

        let empty = RespValue::bulk_string(Bytes::new());
        assert_eq!(empty.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_variants() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
        assert_eq!(RespValue::NullArray.serialize(), b"*-1\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::bulk_array(vec![Bytes::from("a"), Bytes::from("bc")]),
            RespValue::Null,
        ]);
        assert_eq!(
            value.serialize(),
            b"*3\r\n:1\r\n*2\r\n$1\r\na\r\n$2\r\nbc\r\n$-1\r\n"
        );
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let values = vec![
            RespValue::ok(),
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value"),
            RespValue::integer(-1234567),
            RespValue::bulk_string(Bytes::from(vec![b'x'; 1234])),
            RespValue::NullArray,
            RespValue::array(vec![
                RespValue::bulk_string(Bytes::from("z")),
                RespValue::array(vec![RespValue::integer(0); 12]),
            ]),
        ];
        for value in values {
            assert_eq!(value.serialize().len(), value.encoded_len(), "{:?}", value);
        }
    }

    #[test]
    fn test_binary_bulk_is_length_prefixed() {
        let value = RespValue::bulk_string(Bytes::from_static(b"a\r\nb\x00"));
        assert_eq!(value.serialize(), b"$5\r\na\r\nb\x00\r\n");
    }
}
