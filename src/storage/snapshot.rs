//! Point-in-time Snapshots
//!
//! Dumps the live keyspace to a single binary file and restores it at
//! startup. A save writes `<path>.tmp` and renames it over `<path>`, so a
//! crash mid-save leaves the previous snapshot intact.
//!
//! ## File Layout
//!
//! ```text
//! ┌──────┬─────────┬─────────┬───────────┬───────────┬─────┐
//! │ FKVS │ ver: u8 │ n: u32  │ entry 0   │ entry 1   │ ... │
//! └──────┴─────────┴─────────┴───────────┴───────────┴─────┘
//!
//! entry: key_len u32 | key | has_expiry u8 | expires_at i64 | tag u8 | payload
//! ```
//!
//! All integers are big-endian.

use crate::storage::bloom::{BloomError, BloomFilter};
use crate::storage::engine::{unix_millis, Entry, Keyspace, MAX_DEADLINE};
use crate::storage::value::{HashValue, ListValue, SetValue, SortedSetValue, Value};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

const MAGIC: &[u8; 4] = b"FKVS";
const VERSION: u8 = 1;

const TAG_STRING: u8 = 0;
const TAG_HASH: u8 = 1;
const TAG_LIST: u8 = 2;
const TAG_SET: u8 = 3;
const TAG_SORTED_SET: u8 = 4;
const TAG_BLOOM: u8 = 5;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a snapshot file")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),

    #[error("snapshot truncated")]
    Truncated,

    #[error("unknown value tag {0}")]
    UnknownTag(u8),

    #[error("corrupt bloom filter: {0}")]
    Bloom(#[from] BloomError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Reads and writes the snapshot file for one keyspace.
///
/// Clones share one save lock, so at most one save touches the temp file
/// at a time.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
    save_lock: Arc<Mutex<()>>,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the keyspace from disk.
    ///
    /// Returns the number of keys loaded. A missing file is not an error and
    /// leaves the keyspace untouched.
    pub fn load(&self, keyspace: &Keyspace) -> SnapshotResult<usize> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot found, starting empty");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let entries = decode_snapshot(&mut Bytes::from(data))?;
        let count = entries.len();
        keyspace.load_snapshot(entries);

        info!(path = %self.path.display(), keys = count, "Loaded snapshot");
        Ok(count)
    }

    /// Moves an unreadable snapshot to `<path>.corrupt` so later saves do
    /// not overwrite it. Returns the new location.
    pub fn quarantine(&self) -> SnapshotResult<PathBuf> {
        let target = self.sibling(".corrupt");
        fs::rename(&self.path, &target)?;
        warn!(from = %self.path.display(), to = %target.display(), "Moved bad snapshot aside");
        Ok(target)
    }

    /// Writes the live keyspace to disk. Returns the number of keys written.
    ///
    /// Blocks while another save from this manager (or a clone) runs.
    pub fn save(&self, keyspace: &Keyspace) -> SnapshotResult<usize> {
        // a panicked save leaves nothing behind that the next one relies on
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entries = keyspace.snapshot();
        let count = entries.len();
        let buf = encode_snapshot(&entries);

        let temp_path = self.sibling(".tmp");
        debug!(path = %temp_path.display(), bytes = buf.len(), "Writing snapshot");

        if let Err(e) = fs::write(&temp_path, &buf).and_then(|_| fs::rename(&temp_path, &self.path))
        {
            warn!(path = %self.path.display(), error = %e, "Snapshot save failed");
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(path = %self.path.display(), keys = count, "Saved snapshot");
        Ok(count)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Serializes entries into the snapshot layout.
pub fn encode_snapshot(entries: &[(Bytes, Arc<Entry>)]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(64 + entries.len() * 32);
    buf.put_slice(MAGIC);
    buf.put_u8(VERSION);
    buf.put_u32(entries.len() as u32);

    for (key, entry) in entries {
        put_bytes(&mut buf, key);
        match entry.expires_at {
            Some(at) => {
                buf.put_u8(1);
                buf.put_i64(at.min(MAX_DEADLINE) as i64);
            }
            None => {
                buf.put_u8(0);
                buf.put_i64(0);
            }
        }
        encode_value(&mut buf, &entry.value);
    }

    buf
}

fn encode_value(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::String(s) => {
            buf.put_u8(TAG_STRING);
            put_bytes(buf, s);
        }
        Value::Hash(hash) => {
            buf.put_u8(TAG_HASH);
            let entries = hash.entries();
            buf.put_u32(entries.len() as u32);
            for (field, value) in &entries {
                put_bytes(buf, field);
                put_bytes(buf, value);
            }
        }
        Value::List(list) => {
            buf.put_u8(TAG_LIST);
            put_byte_list(buf, &list.items());
        }
        Value::Set(set) => {
            buf.put_u8(TAG_SET);
            put_byte_list(buf, &set.members());
        }
        Value::SortedSet(zset) => {
            buf.put_u8(TAG_SORTED_SET);
            let entries = zset.entries();
            buf.put_u32(entries.len() as u32);
            for (score, member) in &entries {
                buf.put_f64(*score);
                put_bytes(buf, member);
            }
        }
        Value::Bloom(filter) => {
            buf.put_u8(TAG_BLOOM);
            filter.encode(buf);
        }
    }
}

/// Parses a snapshot, dropping entries whose deadline has already passed.
pub fn decode_snapshot(buf: &mut Bytes) -> SnapshotResult<Vec<(Bytes, Entry)>> {
    if buf.remaining() < MAGIC.len() + 1 + 4 {
        return Err(SnapshotError::Truncated);
    }
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    buf.advance(MAGIC.len());

    let version = buf.get_u8();
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let count = buf.get_u32() as usize;
    let now = unix_millis();
    let mut entries = Vec::with_capacity(count.min(1 << 16));
    let mut skipped = 0usize;

    for _ in 0..count {
        let key = get_bytes(buf)?;
        need(buf, 1 + 8)?;
        let has_expiry = buf.get_u8() != 0;
        let at = buf.get_i64();
        let expires_at = has_expiry.then_some(at.max(0) as u64);
        let value = decode_value(buf)?;

        let entry = Entry::with_expiry(value, expires_at);
        if entry.is_expired_at(now) {
            skipped += 1;
            continue;
        }
        entries.push((key, entry));
    }

    if skipped > 0 {
        debug!(skipped, "Dropped expired entries while loading snapshot");
    }
    Ok(entries)
}

fn decode_value(buf: &mut Bytes) -> SnapshotResult<Value> {
    need(buf, 1)?;
    let value = match buf.get_u8() {
        TAG_STRING => Value::String(get_bytes(buf)?),
        TAG_HASH => {
            let hash = HashValue::new();
            for _ in 0..get_count(buf)? {
                let field = get_bytes(buf)?;
                let value = get_bytes(buf)?;
                hash.set(field, value);
            }
            Value::Hash(Arc::new(hash))
        }
        TAG_LIST => Value::List(Arc::new(ListValue::from_items(get_byte_list(buf)?))),
        TAG_SET => {
            let set = SetValue::new();
            set.add(get_byte_list(buf)?);
            Value::Set(Arc::new(set))
        }
        TAG_SORTED_SET => {
            let zset = SortedSetValue::new();
            for _ in 0..get_count(buf)? {
                need(buf, 8)?;
                let score = buf.get_f64();
                let member = get_bytes(buf)?;
                zset.add(score, member);
            }
            Value::SortedSet(Arc::new(zset))
        }
        TAG_BLOOM => Value::Bloom(Arc::new(BloomFilter::decode(buf)?)),
        other => return Err(SnapshotError::UnknownTag(other)),
    };
    Ok(value)
}

fn put_bytes(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

fn put_byte_list(buf: &mut BytesMut, items: &[Bytes]) {
    buf.put_u32(items.len() as u32);
    for item in items {
        put_bytes(buf, item);
    }
}

#[inline]
fn need(buf: &Bytes, n: usize) -> SnapshotResult<()> {
    if buf.remaining() < n {
        Err(SnapshotError::Truncated)
    } else {
        Ok(())
    }
}

fn get_count(buf: &mut Bytes) -> SnapshotResult<usize> {
    need(buf, 4)?;
    Ok(buf.get_u32() as usize)
}

fn get_bytes(buf: &mut Bytes) -> SnapshotResult<Bytes> {
    let len = get_count(buf)?;
    need(buf, len)?;
    Ok(buf.split_to(len))
}

fn get_byte_list(buf: &mut Bytes) -> SnapshotResult<Vec<Bytes>> {
    let count = get_count(buf)?;
    let mut items = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        items.push(get_bytes(buf)?);
    }
    Ok(items)
}
