//! Hash, list, set and sorted set commands.
//!
//! Each of these creates its container on the first write to a missing key.

use crate::commands::error::CommandResult;
use crate::commands::parse::{parse_f64, parse_i64};
use crate::protocol::RespValue;
use crate::storage::Keyspace;
use bytes::Bytes;

/// HSET key field value
pub(crate) fn handle_hset(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let created = keyspace.hset(&args[0], args[1].clone(), args[2].clone())?;
    Ok(RespValue::integer(created as i64))
}

/// HGET key field
pub(crate) fn handle_hget(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(match keyspace.hget(&args[0], &args[1])? {
        Some(value) => RespValue::bulk_string(value),
        None => RespValue::null(),
    })
}

/// LPUSH key value [value ...]
pub(crate) fn handle_lpush(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let len = keyspace.lpush(&args[0], args[1..].to_vec())?;
    Ok(RespValue::integer(len as i64))
}

/// SADD key member [member ...]
pub(crate) fn handle_sadd(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let added = keyspace.sadd(&args[0], args[1..].to_vec())?;
    Ok(RespValue::integer(added as i64))
}

/// SREM key member [member ...]
pub(crate) fn handle_srem(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let removed = keyspace.srem(&args[0], &args[1..])?;
    Ok(RespValue::integer(removed as i64))
}

/// SMEMBERS key
pub(crate) fn handle_smembers(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    Ok(RespValue::bulk_array(keyspace.smembers(&args[0])?))
}

/// ZADD key score member
pub(crate) fn handle_zadd(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let score = parse_f64(&args[1])?;
    let created = keyspace.zadd(&args[0], score, args[2].clone())?;
    Ok(RespValue::integer(created as i64))
}

/// ZRANGE key start stop
pub(crate) fn handle_zrange(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    Ok(RespValue::bulk_array(keyspace.zrange(&args[0], start, stop)?))
}
