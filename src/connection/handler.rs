//! Per-client connection loop.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects, ConnectionHandler spawned
//!        │
//!        ▼
//! 2. ┌──────────────────────────────────┐
//!    │  read bytes into BytesMut        │◄─────┐
//!    │        │                         │      │
//!    │        ▼                         │      │
//!    │  decode every complete request   │      │
//!    │  dispatch each, queue its reply  │      │
//!    │        │                         │      │
//!    │        ▼                         │      │
//!    │  write queued replies, flush     │──────┘
//!    └──────────────────────────────────┘
//!        │ EOF, I/O error, or framing error
//!        ▼
//! 3. Handler task ends
//! ```
//!
//! A framing error leaves the byte stream unsynchronized, so the connection
//! is closed without a reply. Command errors are ordinary replies and keep
//! the connection open.

use crate::commands::CommandHandler;
use crate::protocol::{Command, ParseError, RequestParser, MAX_BULK_SIZE};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// One maximal bulk argument plus room for its headers
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Server-wide connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
    /// Connections closed because of a framing error
    pub protocol_errors: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Owns one client socket and its buffers.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,

    /// Bytes received but not yet decoded
    buffer: BytesMut,

    /// Encoded replies waiting to be written
    replies: BytesMut,

    command_handler: CommandHandler,
    parser: RequestParser,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            replies: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RequestParser::new(),
            stats,
        }
    }

    /// Serves the client until it disconnects or sends a malformed frame.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(ConnectionError::Parse(e)) => {
                self.stats.protocol_error();
                warn!(client = %self.addr, error = %e, "Protocol error, closing connection")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // a decode error is returned only after earlier replies are flushed
            let decoded = self.drain_commands();
            self.flush_replies().await?;
            decoded?;

            self.read_more_data().await?;
        }
    }

    /// Decodes and executes every complete request in the buffer.
    fn drain_commands(&mut self) -> Result<(), ConnectionError> {
        while let Some(command) = self.try_parse_command()? {
            let reply = self.command_handler.dispatch(&command);
            self.stats.command_processed();
            trace!(client = %self.addr, command = %command.name, "Executed command");
            reply.serialize_into(&mut self.replies);
        }
        Ok(())
    }

    fn try_parse_command(&mut self) -> Result<Option<Command>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((command, consumed)) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(command))
            }
            None => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete command, need more data"
                );
                Ok(None)
            }
        }
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    /// Writes every queued reply with a single flush.
    async fn flush_replies(&mut self) -> Result<(), ConnectionError> {
        if self.replies.is_empty() {
            return Ok(());
        }

        let out = self.replies.split();
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(out.len());
        trace!(client = %self.addr, bytes = out.len(), "Sent replies");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request frame
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Client disconnected")]
    ClientDisconnected,

    /// Peer closed mid-request
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Runs a [`ConnectionHandler`] to completion, logging abnormal exits.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %e, "Connection ended with error"),
        }
    }
}
