//! Bloom filter commands.

use crate::commands::error::CommandResult;
use crate::commands::parse::{parse_f64, parse_i64};
use crate::protocol::RespValue;
use crate::storage::Keyspace;
use bytes::Bytes;

/// BF.RESERVE key error_rate capacity
pub(crate) fn handle_reserve(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let error_rate = parse_f64(&args[1])?;
    // non-positive capacities are rejected by the filter constructor
    let capacity = u64::try_from(parse_i64(&args[2])?).unwrap_or(0);
    keyspace.bf_reserve(&args[0], error_rate, capacity)?;
    Ok(RespValue::ok())
}

/// BF.ADD key item
pub(crate) fn handle_add(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let added = keyspace.bf_add(&args[0], &args[1])?;
    Ok(RespValue::integer(added as i64))
}

/// BF.EXISTS key item
pub(crate) fn handle_exists(keyspace: &Keyspace, args: &[Bytes]) -> CommandResult<RespValue> {
    let present = keyspace.bf_exists(&args[0], &args[1])?;
    Ok(RespValue::integer(present as i64))
}
