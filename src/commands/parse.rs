//! Argument parsers shared by the command handlers.

use crate::commands::error::{CommandError, CommandResult};
use std::str;

/// Parses a base-10 signed 64-bit integer argument.
pub(crate) fn parse_i64(arg: &[u8]) -> CommandResult<i64> {
    let Ok(text) = str::from_utf8(arg) else {
        return Err(CommandError::NotAnInteger);
    };
    if text.starts_with('+') {
        return Err(CommandError::NotAnInteger);
    }
    text.parse().map_err(|_| CommandError::NotAnInteger)
}

/// Parses a float argument. NaN is rejected; `inf` and `-inf` are accepted.
pub(crate) fn parse_f64(arg: &[u8]) -> CommandResult<f64> {
    let Ok(text) = str::from_utf8(arg) else {
        return Err(CommandError::NotAFloat);
    };
    match text.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(value),
        _ => Err(CommandError::NotAFloat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64(b"42"), Ok(42));
        assert_eq!(parse_i64(b"-7"), Ok(-7));
        assert_eq!(parse_i64(b"+7"), Err(CommandError::NotAnInteger));
        assert_eq!(parse_i64(b"4.2"), Err(CommandError::NotAnInteger));
        assert_eq!(parse_i64(b"\xff"), Err(CommandError::NotAnInteger));
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(b"1.5"), Ok(1.5));
        assert_eq!(parse_f64(b"-inf"), Ok(f64::NEG_INFINITY));
        assert_eq!(parse_f64(b"nan"), Err(CommandError::NotAFloat));
        assert_eq!(parse_f64(b"abc"), Err(CommandError::NotAFloat));
    }
}
