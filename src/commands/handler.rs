//! Command Dispatcher
//!
//! Turns a decoded [`Command`] into a [`RespValue`] reply. Every failure,
//! from an unknown name to a type mismatch deep in the keyspace, comes back
//! as an error reply; nothing raised here is fatal to the connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  resolve()  │───>│  handler()  │───>│ to reply    │      │
//! │  │ name, arity │    │ parse args  │    │ Ok / -ERR   │      │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘      │
//! │                            ▼                                │
//! │                        Keyspace                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::registry::CommandRegistry;
use crate::protocol::{Command, RespValue};
use crate::storage::Keyspace;
use std::sync::Arc;
use tracing::debug;

/// Executes commands against a shared keyspace.
///
/// Cheap to clone; each connection task holds its own copy.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    keyspace: Arc<Keyspace>,
    registry: Arc<CommandRegistry>,
}

impl CommandHandler {
    /// Creates a handler with the built-in command table.
    pub fn new(keyspace: Arc<Keyspace>) -> Self {
        Self::with_registry(keyspace, Arc::new(CommandRegistry::with_builtin_commands()))
    }

    pub fn with_registry(keyspace: Arc<Keyspace>, registry: Arc<CommandRegistry>) -> Self {
        Self { keyspace, registry }
    }

    pub fn keyspace(&self) -> &Arc<Keyspace> {
        &self.keyspace
    }

    /// Executes a command and returns the reply to send back.
    pub fn dispatch(&self, command: &Command) -> RespValue {
        let result = self
            .registry
            .resolve(&command.name, command.args.len())
            .and_then(|spec| (spec.handler)(&self.keyspace, &command.args));

        match result {
            Ok(reply) => reply,
            Err(e) => {
                debug!(command = %command.name, error = %e, "Command failed");
                RespValue::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::thread;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(Keyspace::new()))
    }

    fn run(handler: &CommandHandler, parts: &[&'static str]) -> RespValue {
        let command = Command::from_parts(parts.iter().copied()).unwrap();
        handler.dispatch(&command)
    }

    fn bulk(s: &'static str) -> RespValue {
        RespValue::bulk_string(Bytes::from_static(s.as_bytes()))
    }

    fn bulks(items: &[&'static str]) -> RespValue {
        RespValue::bulk_array(items.iter().map(|s| Bytes::from_static(s.as_bytes())))
    }

    const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

    #[test]
    fn test_ping() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["PING"]), RespValue::pong());
        assert_eq!(run(&handler, &["ping", "hello"]), bulk("hello"));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["GET", "never"]), RespValue::null());
        assert_eq!(run(&handler, &["TTL", "never"]), RespValue::integer(-2));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "name", "Ariz"]), RespValue::ok());
        assert_eq!(run(&handler, &["get", "name"]), bulk("Ariz"));
        assert_eq!(run(&handler, &["TTL", "name"]), RespValue::integer(-1));
    }

    #[test]
    fn test_set_with_ex() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "k", "v", "ex", "100"]), RespValue::ok());
        match run(&handler, &["TTL", "k"]) {
            RespValue::Integer(n) => assert!((99..=100).contains(&n), "ttl {}", n),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_set_rejects_bad_options() {
        let handler = create_handler();
        for parts in [
            &["SET", "k", "v", "EX"][..],
            &["SET", "k", "v", "EX", "10", "NX"][..],
        ] {
            assert_eq!(
                run(&handler, parts),
                RespValue::error("ERR wrong number of arguments for 'set' command")
            );
        }
        assert_eq!(
            run(&handler, &["SET", "k", "v", "PX", "10"]),
            RespValue::error("ERR syntax error")
        );
        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "-1"]),
            RespValue::error("ERR invalid expire time in 'set' command")
        );
        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "soon"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::null());
    }

    #[test]
    fn test_set_ex_zero_expires_immediately() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "0"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::null());
        assert_eq!(run(&handler, &["TTL", "k"]), RespValue::integer(-2));
    }

    #[test]
    fn test_incr() {
        let handler = create_handler();
        for n in 1..=5 {
            assert_eq!(run(&handler, &["INCR", "counter"]), RespValue::integer(n));
        }

        run(&handler, &["SET", "word", "hello"]);
        assert_eq!(
            run(&handler, &["INCR", "word"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(run(&handler, &["GET", "word"]), bulk("hello"));

        run(&handler, &["SET", "max", "9223372036854775807"]);
        assert_eq!(
            run(&handler, &["INCR", "max"]),
            RespValue::error("ERR increment or decrement would overflow")
        );
    }

    #[test]
    fn test_concurrent_incr() {
        let handler = create_handler();
        let threads = 32;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let handler = handler.clone();
                thread::spawn(move || run(&handler, &["INCR", "hits"]))
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap().is_error());
        }

        assert_eq!(run(&handler, &["GET", "hits"]), bulk("32"));
    }

    #[test]
    fn test_hset_hget() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["HSET", "user", "name", "a"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["HSET", "user", "name", "b"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["HGET", "user", "name"]), bulk("b"));
        assert_eq!(run(&handler, &["HGET", "user", "age"]), RespValue::null());
    }

    #[test]
    fn test_lpush() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["LPUSH", "list", "a", "b"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["LPUSH", "list", "c"]), RespValue::integer(3));
        assert_eq!(run(&handler, &["TYPE", "list"]), RespValue::simple_string("list"));
    }

    #[test]
    fn test_sets() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SADD", "s", "a", "b", "a"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["SMEMBERS", "s"]), bulks(&["a", "b"]));
        assert_eq!(run(&handler, &["SREM", "s", "a", "zz"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["SMEMBERS", "s"]), bulks(&["b"]));
        assert_eq!(run(&handler, &["SMEMBERS", "none"]), bulks(&[]));
    }

    #[test]
    fn test_sorted_sets() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["ZADD", "z", "1", "x"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["ZADD", "z", "2", "y"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["ZADD", "z", "0", "z"]), RespValue::integer(1));

        assert_eq!(run(&handler, &["ZRANGE", "z", "0", "-1"]), bulks(&["z", "x", "y"]));
        assert_eq!(run(&handler, &["ZRANGE", "z", "1", "1"]), bulks(&["x"]));
        assert_eq!(run(&handler, &["ZRANGE", "z", "5", "10"]), bulks(&[]));

        assert_eq!(
            run(&handler, &["ZADD", "z", "nan", "w"]),
            RespValue::error("ERR value is not a valid float")
        );
        assert_eq!(
            run(&handler, &["ZRANGE", "z", "a", "1"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_expire() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["EXPIRE", "ghost", "10"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["TTL", "ghost"]), RespValue::integer(-2));
        assert_eq!(run(&handler, &["GET", "ghost"]), RespValue::null());

        run(&handler, &["SADD", "s", "a"]);
        assert_eq!(run(&handler, &["EXPIRE", "s", "50"]), RespValue::integer(1));
        match run(&handler, &["TTL", "s"]) {
            RespValue::Integer(n) => assert!((49..=50).contains(&n), "ttl {}", n),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            run(&handler, &["EXPIRE", "s", "-1"]),
            RespValue::error("ERR invalid expire time in 'expire' command")
        );
    }

    #[test]
    fn test_expired_key_reads_as_missing() {
        let handler = create_handler();
        handler
            .keyspace()
            .set(Bytes::from_static(b"k"), Bytes::from_static(b"v"), Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::null());
        assert_eq!(run(&handler, &["TTL", "k"]), RespValue::integer(-2));
    }

    #[test]
    fn test_wrong_type() {
        let handler = create_handler();
        run(&handler, &["SET", "s", "text"]);
        assert_eq!(run(&handler, &["SADD", "s", "a"]), RespValue::error(WRONGTYPE));
        assert_eq!(run(&handler, &["HGET", "s", "f"]), RespValue::error(WRONGTYPE));
        assert_eq!(run(&handler, &["ZRANGE", "s", "0", "-1"]), RespValue::error(WRONGTYPE));
        assert_eq!(run(&handler, &["GET", "s"]), bulk("text"));

        run(&handler, &["LPUSH", "l", "a"]);
        assert_eq!(run(&handler, &["GET", "l"]), RespValue::error(WRONGTYPE));
    }

    #[test]
    fn test_bloom_commands() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["BF.EXISTS", "bf", "a"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["BF.RESERVE", "bf", "0.01", "1000"]), RespValue::ok());
        assert_eq!(
            run(&handler, &["BF.RESERVE", "bf", "0.01", "1000"]),
            RespValue::error("ERR item exists")
        );
        assert_eq!(run(&handler, &["BF.ADD", "bf", "a"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["BF.ADD", "bf", "a"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["BF.EXISTS", "bf", "a"]), RespValue::integer(1));

        assert_eq!(run(&handler, &["bf.add", "implicit", "x"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["BF.EXISTS", "implicit", "x"]), RespValue::integer(1));

        assert!(run(&handler, &["BF.RESERVE", "bad", "2", "10"]).is_error());
        assert!(run(&handler, &["BF.RESERVE", "bad", "0.1", "0"]).is_error());
        assert_eq!(run(&handler, &["TYPE", "bad"]), RespValue::simple_string("none"));
    }

    #[test]
    fn test_bloom_reserve_too_large() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["BF.RESERVE", "bf", "0.01", "9223372036854775807"]),
            RespValue::error("ERR filter would need more than 2^32 bits")
        );
        assert_eq!(run(&handler, &["TYPE", "bf"]), RespValue::simple_string("none"));
        // the key is still free for an implicit filter
        assert_eq!(run(&handler, &["BF.ADD", "bf", "x"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["BF.EXISTS", "bf", "x"]), RespValue::integer(1));
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["flushall"]),
            RespValue::error("ERR unknown command 'FLUSHALL'")
        );
    }

    #[test]
    fn test_wrong_arity() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["GET"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&handler, &["SADD", "s"]),
            RespValue::error("ERR wrong number of arguments for 'sadd' command")
        );
        assert_eq!(
            run(&handler, &["ZRANGE", "z", "0"]),
            RespValue::error("ERR wrong number of arguments for 'zrange' command")
        );
    }
}
