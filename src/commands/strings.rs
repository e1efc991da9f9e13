//! String, expiry and connection commands.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::parse::parse_i64;
use crate::protocol::RespValue;
use crate::storage::Keyspace;
use bytes::Bytes;
use std::time::Duration;

/// PING [message]
pub(crate) fn handle_ping(_keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(match args.first() {
        Some(message) => RespValue::bulk_string(message.clone()),
        None => RespValue::pong(),
    })
}

/// TYPE key
pub(crate) fn handle_type(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(RespValue::simple_string(keyspace.key_type(&args[0])))
}

/// GET key
pub(crate) fn handle_get(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(match keyspace.get(&args[0])? {
        Some(value) => RespValue::bulk_string(value),
        None => RespValue::null(),
    })
}

/// SET key value [EX seconds]
pub(crate) fn handle_set(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let ttl = match args {
        [_, _] => None,
        [_, _, option, seconds] if option.eq_ignore_ascii_case(b"EX") => {
            let seconds = parse_i64(seconds)?;
            // EX 0 stores a key that is already expired
            if seconds < 0 {
                return Err(CommandError::InvalidExpireTime("set"));
            }
            Some(Duration::from_secs(seconds as u64))
        }
        _ => return Err(CommandError::Syntax),
    };

    keyspace.set(args[0].clone(), args[1].clone(), ttl);
    Ok(RespValue::ok())
}

/// INCR key
pub(crate) fn handle_incr(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(RespValue::integer(keyspace.incr(&args[0])?))
}

/// EXPIRE key seconds
pub(crate) fn handle_expire(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let seconds = parse_i64(&args[1])?;
    if seconds < 0 {
        return Err(CommandError::InvalidExpireTime("expire"));
    }
    let applied = keyspace.expire(&args[0], seconds as u64);
    Ok(RespValue::integer(applied as i64))
}

/// TTL key
pub(crate) fn handle_ttl(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(RespValue::integer(keyspace.ttl(&args[0]).as_reply()))
}
