//! Concurrent Keyspace with Lazy Expiry
//!
//! The keyspace maps each key to an immutable, reference-counted [`Entry`]
//! (a value plus an optional absolute expiry). There is no global lock:
//! the map is a `DashMap`, and every logical transition of an entry is a
//! single atomic step on its slot.
//!
//! ## Update Disciplines
//!
//! ```text
//! String (whole value)            Containers (hash/list/set/zset/bloom)
//! ────────────────────            ──────────────────────────────────────
//! read current entry              read current entry
//!   │                               │ absent?
//!   ▼                               ▼
//! compute new entry               insert-if-absent(empty container)
//!   │                               │ lost the race? → re-read
//!   ▼                               ▼
//! replace-if-unchanged            mutate the shared container in place
//!   │ lost the race?                (container is internally synchronized)
//!   └──► retry whole cycle
//! ```
//!
//! "Unchanged" is pointer identity on the `Arc<Entry>`, so a concurrent
//! writer that swapped in an equal-looking entry still forces a retry.
//!
//! ## Expiry
//!
//! Expiry is lazy. Every lookup goes through [`Keyspace::peek`], which
//! treats an entry past its deadline as absent and removes it only if the
//! slot still holds that exact entry. A key that is never touched again is
//! never reclaimed.

use crate::storage::bloom::{BloomFilter, DEFAULT_CAPACITY, DEFAULT_ERROR_RATE};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::value::{HashValue, ListValue, SetValue, SortedSetValue, Value};
use bytes::Bytes;
use dashmap::mapref::entry::Entry as Slot;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Milliseconds since the Unix epoch.
#[inline]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Latest representable deadline. Snapshots store deadlines as i64.
pub const MAX_DEADLINE: u64 = i64::MAX as u64;

/// Absolute deadline `ttl` from now, saturating at [`MAX_DEADLINE`].
#[inline]
pub fn deadline_after(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    unix_millis().saturating_add(ttl_ms).min(MAX_DEADLINE)
}

/// One stored key: a value plus an optional absolute deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// Unix milliseconds after which the entry is logically absent
    pub expires_at: Option<u64>,
}

impl Entry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    pub fn with_expiry(value: Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    #[inline]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|exp| now_ms >= exp)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_millis())
    }
}

/// Result of a TTL lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlResult {
    /// Key does not exist (or has expired)
    Missing,
    /// Key exists without an expiry
    NoExpiry,
    /// Whole seconds remaining, rounded down
    Seconds(u64),
}

impl TtlResult {
    /// The integer reply: -2, -1, or the remaining seconds.
    pub fn as_reply(self) -> i64 {
        match self {
            TtlResult::Missing => -2,
            TtlResult::NoExpiry => -1,
            TtlResult::Seconds(s) => s as i64,
        }
    }
}

/// Counters describing keyspace activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub cas_retries: u64,
    pub expired: u64,
}

/// The shared keyspace.
///
/// Constructed once at startup and handed to the dispatcher and the
/// snapshot task behind an `Arc`.
///
/// # Example
///
/// ```
/// use flintkv::storage::Keyspace;
/// use bytes::Bytes;
///
/// let keyspace = Keyspace::new();
/// keyspace.set(Bytes::from("name"), Bytes::from("Ariz"), None);
/// assert_eq!(keyspace.get(b"name").unwrap(), Some(Bytes::from("Ariz")));
/// assert_eq!(keyspace.incr(&Bytes::from("hits")).unwrap(), 1);
/// ```
pub struct Keyspace {
    data: DashMap<Bytes, Arc<Entry>>,

    /// Lost compare-and-swap races across all keys
    cas_retries: AtomicU64,

    /// Entries evicted by lazy expiry
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyspace")
            .field("keys", &self.data.len())
            .field("cas_retries", &self.cas_retries.load(Ordering::Relaxed))
            .field("expired", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyspace {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            cas_retries: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Slot primitives
    // ========================================================================

    /// Returns the live entry for a key, evicting it if it has expired.
    pub fn peek(&self, key: &[u8]) -> Option<Arc<Entry>> {
        // clone out of the shard guard before touching the map again
        let entry = self.data.get(key).map(|e| Arc::clone(e.value()))?;

        if entry.is_expired() {
            if self
                .data
                .remove_if(key, |_, current| Arc::ptr_eq(current, &entry))
                .is_some()
            {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "Evicted expired key");
            }
            return None;
        }

        Some(entry)
    }

    /// Installs `entry` only if the key has no slot. Returns true on success.
    fn insert_if_absent(&self, key: &Bytes, entry: Arc<Entry>) -> bool {
        match self.data.entry(key.clone()) {
            Slot::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Slot::Occupied(_) => false,
        }
    }

    /// Swaps `current` for `next` only if the slot still holds `current`.
    fn replace_if_unchanged(&self, key: &Bytes, current: &Arc<Entry>, next: Arc<Entry>) -> bool {
        match self.data.entry(key.clone()) {
            Slot::Occupied(mut slot) if Arc::ptr_eq(slot.get(), current) => {
                slot.insert(next);
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn record_retry(&self, key: &[u8], op: &'static str) {
        let total = self.cas_retries.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(key = ?key, op, total, "Lost compare-and-swap race, retrying");
    }

    /// Returns the container at `key`, creating an empty one if absent.
    fn get_or_create<T>(
        &self,
        key: &Bytes,
        view: fn(&Value) -> Option<&Arc<T>>,
        create: impl Fn() -> Value,
        op: &'static str,
    ) -> StoreResult<Arc<T>> {
        loop {
            if let Some(entry) = self.peek(key) {
                return view(&entry.value).cloned().ok_or(StoreError::WrongType);
            }

            let fresh = Arc::new(Entry::new(create()));
            if self.insert_if_absent(key, Arc::clone(&fresh)) {
                return view(&fresh.value).cloned().ok_or(StoreError::WrongType);
            }
            self.record_retry(key, op);
        }
    }

    /// Returns the container at `key` if one exists.
    fn existing<T>(
        &self,
        key: &[u8],
        view: fn(&Value) -> Option<&Arc<T>>,
    ) -> StoreResult<Option<Arc<T>>> {
        match self.peek(key) {
            None => Ok(None),
            Some(entry) => view(&entry.value)
                .cloned()
                .map(Some)
                .ok_or(StoreError::WrongType),
        }
    }

    // ========================================================================
    // String operations
    // ========================================================================

    /// GET: the string at `key`, or `None` if absent.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        match self.peek(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::String(s) => Ok(Some(s.clone())),
                _ => Err(StoreError::WrongType),
            },
        }
    }

    /// SET: replaces whatever the key held with a string.
    ///
    /// The new entry does not depend on the old one, so the
    /// read-compute-replace cycle collapses into one atomic insert.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        let expires_at = ttl.map(deadline_after);
        self.data
            .insert(key, Arc::new(Entry::with_expiry(Value::String(value), expires_at)));
    }

    /// INCR: adds one to the integer stored at `key`, keeping its expiry.
    ///
    /// An absent key counts as 0. Fails without mutation if the value is
    /// not a base-10 integer or the result would overflow.
    pub fn incr(&self, key: &Bytes) -> StoreResult<i64> {
        self.incr_by(key, 1)
    }

    pub fn incr_by(&self, key: &Bytes, delta: i64) -> StoreResult<i64> {
        loop {
            let current = match self.peek(key) {
                Some(entry) => entry,
                None => {
                    let next = Arc::new(Entry::new(Value::String(Bytes::from(
                        delta.to_string(),
                    ))));
                    if self.insert_if_absent(key, next) {
                        return Ok(delta);
                    }
                    self.record_retry(key, "incr");
                    continue;
                }
            };

            let n = match &current.value {
                Value::String(s) => parse_i64(s).ok_or(StoreError::NotAnInteger)?,
                _ => return Err(StoreError::WrongType),
            };
            let n = n.checked_add(delta).ok_or(StoreError::Overflow)?;

            let next = Arc::new(Entry::with_expiry(
                Value::String(Bytes::from(n.to_string())),
                current.expires_at,
            ));
            if self.replace_if_unchanged(key, &current, next) {
                return Ok(n);
            }
            self.record_retry(key, "incr");
        }
    }

    // ========================================================================
    // Hash operations
    // ========================================================================

    /// HSET: returns true if the field was created, false if updated.
    pub fn hset(&self, key: &Bytes, field: Bytes, value: Bytes) -> StoreResult<bool> {
        let hash = self.get_or_create(
            key,
            Value::as_hash,
            || Value::Hash(Arc::new(HashValue::new())),
            "hset",
        )?;
        Ok(hash.set(field, value))
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self
            .existing(key, Value::as_hash)?
            .and_then(|hash| hash.get(field)))
    }

    // ========================================================================
    // List operations
    // ========================================================================

    /// LPUSH: returns the list length after the push.
    pub fn lpush(&self, key: &Bytes, values: Vec<Bytes>) -> StoreResult<usize> {
        let list = self.get_or_create(
            key,
            Value::as_list,
            || Value::List(Arc::new(ListValue::new())),
            "lpush",
        )?;
        Ok(list.push_front(values))
    }

    // ========================================================================
    // Set operations
    // ========================================================================

    /// SADD: returns how many members were newly added.
    pub fn sadd(&self, key: &Bytes, members: Vec<Bytes>) -> StoreResult<usize> {
        let set = self.get_or_create(
            key,
            Value::as_set,
            || Value::Set(Arc::new(SetValue::new())),
            "sadd",
        )?;
        Ok(set.add(members))
    }

    /// SREM: returns how many members were removed.
    pub fn srem(&self, key: &[u8], members: &[Bytes]) -> StoreResult<usize> {
        Ok(self
            .existing(key, Value::as_set)?
            .map(|set| set.remove(members))
            .unwrap_or(0))
    }

    /// SMEMBERS: a snapshot of the members, empty if the key is absent.
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .existing(key, Value::as_set)?
            .map(|set| set.members())
            .unwrap_or_default())
    }

    // ========================================================================
    // Sorted set operations
    // ========================================================================

    /// ZADD: returns true if the member was created, false if its score moved.
    pub fn zadd(&self, key: &Bytes, score: f64, member: Bytes) -> StoreResult<bool> {
        let zset = self.get_or_create(
            key,
            Value::as_sorted_set,
            || Value::SortedSet(Arc::new(SortedSetValue::new())),
            "zadd",
        )?;
        Ok(zset.add(score, member))
    }

    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .existing(key, Value::as_sorted_set)?
            .map(|zset| zset.range(start, stop))
            .unwrap_or_default())
    }

    // ========================================================================
    // Bloom filter operations
    // ========================================================================

    /// BF.RESERVE: creates an empty filter. Fails if the key exists.
    pub fn bf_reserve(&self, key: &Bytes, error_rate: f64, capacity: u64) -> StoreResult<()> {
        let filter = BloomFilter::new(capacity, error_rate)?;
        if self.peek(key).is_some() {
            return Err(StoreError::KeyExists);
        }
        let entry = Arc::new(Entry::new(Value::Bloom(Arc::new(filter))));
        if self.insert_if_absent(key, entry) {
            Ok(())
        } else {
            Err(StoreError::KeyExists)
        }
    }

    /// BF.ADD: returns true if the item was definitely not present before.
    pub fn bf_add(&self, key: &Bytes, item: &[u8]) -> StoreResult<bool> {
        loop {
            if let Some(filter) = self.existing(key, Value::as_bloom)? {
                return Ok(filter.add(item));
            }

            let filter = Arc::new(BloomFilter::new(DEFAULT_CAPACITY, DEFAULT_ERROR_RATE)?);
            let entry = Arc::new(Entry::new(Value::Bloom(Arc::clone(&filter))));
            if self.insert_if_absent(key, entry) {
                return Ok(filter.add(item));
            }
            self.record_retry(key, "bf.add");
        }
    }

    /// BF.EXISTS: false if definitely absent or the key does not exist.
    pub fn bf_exists(&self, key: &[u8], item: &[u8]) -> StoreResult<bool> {
        Ok(self
            .existing(key, Value::as_bloom)?
            .is_some_and(|filter| filter.might_contain(item)))
    }

    // ========================================================================
    // Expiry operations
    // ========================================================================

    /// EXPIRE: sets a deadline `seconds` from now.
    ///
    /// Returns false if the key does not exist. Only the expiry stamp is
    /// swapped; the value (and any container inside it) is shared with the
    /// entry being replaced.
    pub fn expire(&self, key: &Bytes, seconds: u64) -> bool {
        self.expire_in(key, Duration::from_secs(seconds))
    }

    pub fn expire_in(&self, key: &Bytes, ttl: Duration) -> bool {
        loop {
            let current = match self.peek(key) {
                Some(entry) => entry,
                None => return false,
            };

            let next = Arc::new(Entry::with_expiry(
                current.value.clone(),
                Some(deadline_after(ttl)),
            ));
            if self.replace_if_unchanged(key, &current, next) {
                return true;
            }
            self.record_retry(key, "expire");
        }
    }

    /// TTL in whole seconds, rounded down and never negative.
    pub fn ttl(&self, key: &[u8]) -> TtlResult {
        match self.peek(key) {
            None => TtlResult::Missing,
            Some(entry) => match entry.expires_at {
                None => TtlResult::NoExpiry,
                Some(exp) => TtlResult::Seconds(exp.saturating_sub(unix_millis()) / 1000),
            },
        }
    }

    // ========================================================================
    // Whole-keyspace operations
    // ========================================================================

    /// Type name of the value at `key`, or "none".
    pub fn key_type(&self, key: &[u8]) -> &'static str {
        self.peek(key)
            .map(|entry| entry.value.type_name())
            .unwrap_or("none")
    }

    /// Point-in-time copy of all live entries.
    ///
    /// Entries are shared, not deep-copied, so container contents can still
    /// change while the caller serializes them.
    pub fn snapshot(&self) -> Vec<(Bytes, Arc<Entry>)> {
        let now = unix_millis();
        self.data
            .iter()
            .filter(|e| !e.value().is_expired_at(now))
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    /// Replaces the whole keyspace with the given entries.
    pub fn load_snapshot(&self, entries: Vec<(Bytes, Entry)>) {
        self.data.clear();
        for (key, entry) in entries {
            self.data.insert(key, Arc::new(entry));
        }
    }

    /// Number of stored keys, including expired keys not yet evicted.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.data.len() as u64,
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Parses a strict base-10 i64: optional leading '-', digits only.
fn parse_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 20 || bytes[0] == b'+' {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn b(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_get_missing() {
        let ks = Keyspace::new();
        assert_eq!(ks.get(b"nope").unwrap(), None);
        assert_eq!(ks.ttl(b"nope"), TtlResult::Missing);
    }

    #[test]
    fn test_set_and_get_binary() {
        let ks = Keyspace::new();
        ks.set(b("k"), Bytes::from_static(b"\x00\r\n\xff"), None);
        assert_eq!(ks.get(b"k").unwrap(), Some(Bytes::from_static(b"\x00\r\n\xff")));
        assert_eq!(ks.ttl(b"k"), TtlResult::NoExpiry);
    }

    #[test]
    fn test_set_with_ttl() {
        let ks = Keyspace::new();
        ks.set(b("k"), b("v"), Some(Duration::from_secs(100)));
        match ks.ttl(b"k") {
            TtlResult::Seconds(s) => assert!(s <= 100 && s >= 98, "ttl {}", s),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lazy_expiry() {
        let ks = Keyspace::new();
        ks.set(b("k"), b("v"), Some(Duration::from_millis(20)));
        assert_eq!(ks.len(), 1);

        thread::sleep(Duration::from_millis(40));

        // still physically present until touched
        assert_eq!(ks.len(), 1);
        assert_eq!(ks.get(b"k").unwrap(), None);
        assert_eq!(ks.len(), 0);
        assert_eq!(ks.ttl(b"k"), TtlResult::Missing);
        assert_eq!(ks.stats().expired, 1);
    }

    #[test]
    fn test_incr() {
        let ks = Keyspace::new();
        assert_eq!(ks.incr(&b("n")).unwrap(), 1);
        assert_eq!(ks.incr(&b("n")).unwrap(), 2);

        ks.set(b("n"), b("-5"), None);
        assert_eq!(ks.incr(&b("n")).unwrap(), -4);
        assert_eq!(ks.get(b"n").unwrap(), Some(b("-4")));
    }

    #[test]
    fn test_incr_rejects_non_integer() {
        let ks = Keyspace::new();
        for bad in ["abc", "", "1.5", " 1", "+1", "99999999999999999999"] {
            ks.set(b("n"), b(bad), None);
            assert_eq!(ks.incr(&b("n")), Err(StoreError::NotAnInteger), "{:?}", bad);
            assert_eq!(ks.get(b"n").unwrap(), Some(b(bad)));
        }
    }

    #[test]
    fn test_incr_overflow() {
        let ks = Keyspace::new();
        ks.set(b("n"), b(&i64::MAX.to_string()), None);
        assert_eq!(ks.incr(&b("n")), Err(StoreError::Overflow));
        assert_eq!(ks.get(b"n").unwrap(), Some(b(&i64::MAX.to_string())));
    }

    #[test]
    fn test_incr_preserves_expiry() {
        let ks = Keyspace::new();
        ks.set(b("n"), b("1"), Some(Duration::from_secs(50)));
        ks.incr(&b("n")).unwrap();
        assert!(matches!(ks.ttl(b"n"), TtlResult::Seconds(s) if s > 0));
    }

    #[test]
    fn test_incr_after_expiry_starts_fresh() {
        let ks = Keyspace::new();
        ks.set(b("n"), b("41"), Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ks.incr(&b("n")).unwrap(), 1);
        assert_eq!(ks.ttl(b"n"), TtlResult::NoExpiry);
    }

    #[test]
    fn test_concurrent_incr_linearizable() {
        let ks = Arc::new(Keyspace::new());
        let threads = 16;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ks = Arc::clone(&ks);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        ks.incr(&Bytes::from_static(b"counter")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            ks.get(b"counter").unwrap(),
            Some(b(&(threads * per_thread).to_string()))
        );
    }

    #[test]
    fn test_wrong_type_does_not_mutate() {
        let ks = Keyspace::new();
        ks.set(b("s"), b("text"), None);

        assert_eq!(ks.sadd(&b("s"), vec![b("a")]), Err(StoreError::WrongType));
        assert_eq!(ks.hset(&b("s"), b("f"), b("v")), Err(StoreError::WrongType));
        assert_eq!(ks.lpush(&b("s"), vec![b("a")]), Err(StoreError::WrongType));
        assert_eq!(ks.zadd(&b("s"), 1.0, b("a")), Err(StoreError::WrongType));
        assert_eq!(ks.bf_add(&b("s"), b"a"), Err(StoreError::WrongType));
        assert_eq!(ks.get(b"s").unwrap(), Some(b("text")));

        ks.sadd(&b("set"), vec![b("a")]).unwrap();
        assert_eq!(ks.get(b"set"), Err(StoreError::WrongType));
        assert_eq!(ks.incr(&b("set")), Err(StoreError::WrongType));
        assert_eq!(ks.smembers(b"set").unwrap(), vec![b("a")]);
    }

    #[test]
    fn test_set_overwrites_any_type() {
        let ks = Keyspace::new();
        ks.lpush(&b("k"), vec![b("a")]).unwrap();
        ks.set(b("k"), b("v"), None);
        assert_eq!(ks.key_type(b"k"), "string");
    }

    #[test]
    fn test_hash_ops() {
        let ks = Keyspace::new();
        assert!(ks.hset(&b("h"), b("f"), b("1")).unwrap());
        assert!(!ks.hset(&b("h"), b("f"), b("2")).unwrap());
        assert_eq!(ks.hget(b"h", b"f").unwrap(), Some(b("2")));
        assert_eq!(ks.hget(b"h", b"other").unwrap(), None);
        assert_eq!(ks.hget(b"missing", b"f").unwrap(), None);
    }

    #[test]
    fn test_list_ops() {
        let ks = Keyspace::new();
        assert_eq!(ks.lpush(&b("l"), vec![b("a"), b("b")]).unwrap(), 2);
        assert_eq!(ks.lpush(&b("l"), vec![b("c")]).unwrap(), 3);
        assert_eq!(ks.key_type(b"l"), "list");
    }

    #[test]
    fn test_set_ops() {
        let ks = Keyspace::new();
        assert_eq!(ks.sadd(&b("s"), vec![b("a"), b("b"), b("a")]).unwrap(), 2);
        assert_eq!(ks.smembers(b"s").unwrap(), vec![b("a"), b("b")]);
        assert_eq!(ks.srem(b"s", &[b("a"), b("x")]).unwrap(), 1);
        assert_eq!(ks.srem(b"missing", &[b("a")]).unwrap(), 0);
        assert!(ks.smembers(b"missing").unwrap().is_empty());
    }

    #[test]
    fn test_zset_ops() {
        let ks = Keyspace::new();
        assert!(ks.zadd(&b("z"), 1.0, b("x")).unwrap());
        assert!(ks.zadd(&b("z"), 2.0, b("y")).unwrap());
        assert!(ks.zadd(&b("z"), 0.0, b("z")).unwrap());
        assert!(!ks.zadd(&b("z"), 3.0, b("z")).unwrap());
        assert_eq!(ks.zrange(b"z", 0, -1).unwrap(), vec![b("x"), b("y"), b("z")]);
        assert!(ks.zrange(b"missing", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn test_bloom_ops() {
        let ks = Keyspace::new();
        assert!(!ks.bf_exists(b"bf", b"a").unwrap());
        assert!(ks.bf_add(&b("bf"), b"a").unwrap());
        assert!(!ks.bf_add(&b("bf"), b"a").unwrap());
        assert!(ks.bf_exists(b"bf", b"a").unwrap());

        assert_eq!(ks.bf_reserve(&b("bf"), 0.01, 10), Err(StoreError::KeyExists));
        ks.bf_reserve(&b("bf2"), 0.001, 1000).unwrap();
        assert!(matches!(
            ks.bf_reserve(&b("bf3"), 1.5, 10),
            Err(StoreError::Bloom(_))
        ));
        assert_eq!(ks.key_type(b"bf3"), "none");
    }

    #[test]
    fn test_expire_missing_key() {
        let ks = Keyspace::new();
        assert!(!ks.expire(&b("nope"), 10));
        assert_eq!(ks.ttl(b"nope"), TtlResult::Missing);
        assert!(ks.is_empty());
    }

    #[test]
    fn test_expire_keeps_container() {
        let ks = Keyspace::new();
        ks.sadd(&b("s"), vec![b("a")]).unwrap();
        assert!(ks.expire(&b("s"), 100));
        ks.sadd(&b("s"), vec![b("b")]).unwrap();
        assert_eq!(ks.smembers(b"s").unwrap(), vec![b("a"), b("b")]);
        assert!(matches!(ks.ttl(b"s"), TtlResult::Seconds(s) if s >= 99));
    }

    #[test]
    fn test_expire_zero_removes_on_next_access() {
        let ks = Keyspace::new();
        ks.hset(&b("h"), b("f"), b("v")).unwrap();
        assert!(ks.expire(&b("h"), 0));
        assert_eq!(ks.hget(b"h", b"f").unwrap(), None);
        assert_eq!(ks.ttl(b"h"), TtlResult::Missing);
    }

    #[test]
    fn test_expired_container_is_recreated() {
        let ks = Keyspace::new();
        ks.sadd(&b("s"), vec![b("old")]).unwrap();
        ks.expire_in(&b("s"), Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ks.sadd(&b("s"), vec![b("new")]).unwrap(), 1);
        assert_eq!(ks.smembers(b"s").unwrap(), vec![b("new")]);
    }

    #[test]
    fn test_concurrent_container_creation() {
        let ks = Arc::new(Keyspace::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ks = Arc::clone(&ks);
                thread::spawn(move || {
                    for i in 0..100 {
                        ks.sadd(&Bytes::from_static(b"members"), vec![b(&format!("{}-{}", t, i))])
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ks.smembers(b"members").unwrap().len(), 800);
    }

    #[test]
    fn test_snapshot_skips_expired() {
        let ks = Keyspace::new();
        ks.set(b("live"), b("1"), None);
        ks.set(b("dead"), b("2"), Some(Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(20));

        let snapshot = ks.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, b("live"));
    }

    #[test]
    fn test_load_snapshot_replaces_contents() {
        let ks = Keyspace::new();
        ks.set(b("old"), b("1"), None);
        ks.load_snapshot(vec![(b("new"), Entry::new(Value::String(b("2"))))]);
        assert_eq!(ks.get(b"old").unwrap(), None);
        assert_eq!(ks.get(b"new").unwrap(), Some(b("2")));
    }

    #[test]
    fn test_ttl_reply_values() {
        assert_eq!(TtlResult::Missing.as_reply(), -2);
        assert_eq!(TtlResult::NoExpiry.as_reply(), -1);
        assert_eq!(TtlResult::Seconds(7).as_reply(), 7);
    }
}
