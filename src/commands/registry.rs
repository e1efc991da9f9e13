//! Command table: name → arity + handler.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::{bloom, collections, strings};
use crate::protocol::RespValue;
use crate::storage::Keyspace;
use bytes::Bytes;
use std::collections::HashMap;

/// Signature shared by every command handler.
///
/// Handlers receive the arguments after the command name, already checked
/// against the declared arity.
pub type HandlerFn = fn(&Keyspace, &[Bytes]) -> CommandResult<RespValue>;

/// Arity constraints for a command, not counting the name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandArity {
    /// Exactly this many arguments
    Exact(usize),
    /// At least this many arguments
    AtLeast(usize),
    /// Between `min` and `max` arguments, inclusive
    Range(usize, usize),
    /// One of a fixed set of counts
    OneOf(&'static [usize]),
}

impl CommandArity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            CommandArity::Exact(n) => argc == n,
            CommandArity::AtLeast(n) => argc >= n,
            CommandArity::Range(min, max) => (min..=max).contains(&argc),
            CommandArity::OneOf(counts) => counts.contains(&argc),
        }
    }
}

/// One command table entry.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Canonical uppercase name
    pub name: &'static str,
    pub arity: CommandArity,
    pub handler: HandlerFn,
}

/// The command table. Built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    entries: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        registry.register_connection_commands();
        registry.register_string_commands();
        registry.register_expiry_commands();
        registry.register_container_commands();
        registry.register_bloom_commands();
        registry
    }

    fn register_connection_commands(&mut self) {
        self.register(CommandSpec {
            name: "PING",
            arity: CommandArity::Range(0, 1),
            handler: strings::handle_ping,
        });
        self.register(CommandSpec {
            name: "TYPE",
            arity: CommandArity::Exact(1),
            handler: strings::handle_type,
        });
    }

    fn register_string_commands(&mut self) {
        self.register(CommandSpec {
            name: "GET",
            arity: CommandArity::Exact(1),
            handler: strings::handle_get,
        });
        // SET key value [EX seconds]
        self.register(CommandSpec {
            name: "SET",
            arity: CommandArity::OneOf(&[2, 4]),
            handler: strings::handle_set,
        });
        self.register(CommandSpec {
            name: "INCR",
            arity: CommandArity::Exact(1),
            handler: strings::handle_incr,
        });
    }

    fn register_expiry_commands(&mut self) {
        self.register(CommandSpec {
            name: "EXPIRE",
            arity: CommandArity::Exact(2),
            handler: strings::handle_expire,
        });
        self.register(CommandSpec {
            name: "TTL",
            arity: CommandArity::Exact(1),
            handler: strings::handle_ttl,
        });
    }

    fn register_container_commands(&mut self) {
        self.register(CommandSpec {
            name: "HSET",
            arity: CommandArity::Exact(3),
            handler: collections::handle_hset,
        });
        self.register(CommandSpec {
            name: "HGET",
            arity: CommandArity::Exact(2),
            handler: collections::handle_hget,
        });
        self.register(CommandSpec {
            name: "LPUSH",
            arity: CommandArity::AtLeast(2),
            handler: collections::handle_lpush,
        });
        self.register(CommandSpec {
            name: "SADD",
            arity: CommandArity::AtLeast(2),
            handler: collections::handle_sadd,
        });
        self.register(CommandSpec {
            name: "SREM",
            arity: CommandArity::AtLeast(2),
            handler: collections::handle_srem,
        });
        self.register(CommandSpec {
            name: "SMEMBERS",
            arity: CommandArity::Exact(1),
            handler: collections::handle_smembers,
        });
        self.register(CommandSpec {
            name: "ZADD",
            arity: CommandArity::Exact(3),
            handler: collections::handle_zadd,
        });
        self.register(CommandSpec {
            name: "ZRANGE",
            arity: CommandArity::Exact(3),
            handler: collections::handle_zrange,
        });
    }

    fn register_bloom_commands(&mut self) {
        self.register(CommandSpec {
            name: "BF.RESERVE",
            arity: CommandArity::Exact(3),
            handler: bloom::handle_reserve,
        });
        self.register(CommandSpec {
            name: "BF.ADD",
            arity: CommandArity::Exact(2),
            handler: bloom::handle_add,
        });
        self.register(CommandSpec {
            name: "BF.EXISTS",
            arity: CommandArity::Exact(2),
            handler: bloom::handle_exists,
        });
    }

    /// Registers or replaces one command.
    pub fn register(&mut self, spec: CommandSpec) {
        self.entries.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a command and checks its argument count.
    pub fn resolve(&self, name: &str, argc: usize) -> CommandResult<&CommandSpec> {
        let spec = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        if !spec.arity.accepts(argc) {
            return Err(CommandError::WrongArity(spec.name.to_ascii_lowercase()));
        }
        Ok(spec)
    }
}
