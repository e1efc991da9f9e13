//! Value Model
//!
//! Every key holds exactly one [`Value`] variant for its whole lifetime.
//! Strings are immutable buffers that are replaced wholesale; every other
//! variant is a container with its own internal synchronization, shared
//! behind an `Arc` so that EXPIRE can re-stamp an entry without copying or
//! detaching the container.

use crate::storage::bloom::BloomFilter;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// A stored value.
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    Hash(Arc<HashValue>),
    List(Arc<ListValue>),
    Set(Arc<SetValue>),
    SortedSet(Arc<SortedSetValue>),
    Bloom(Arc<BloomFilter>),
}

impl Value {
    /// The type name reported to clients.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
            Value::Bloom(_) => "MBbloom--",
        }
    }

    pub fn as_hash(&self) -> Option<&Arc<HashValue>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Arc<ListValue>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Arc<SetValue>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sorted_set(&self) -> Option<&Arc<SortedSetValue>> {
        match self {
            Value::SortedSet(z) => Some(z),
            _ => None,
        }
    }

    pub fn as_bloom(&self) -> Option<&Arc<BloomFilter>> {
        match self {
            Value::Bloom(b) => Some(b),
            _ => None,
        }
    }
}

/// Field → value map.
#[derive(Debug, Default)]
pub struct HashValue {
    fields: DashMap<Bytes, Bytes>,
}

impl HashValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field. Returns true if the field was created.
    pub fn set(&self, field: Bytes, value: Bytes) -> bool {
        self.fields.insert(field, value).is_none()
    }

    pub fn get(&self, field: &[u8]) -> Option<Bytes> {
        self.fields.get(field).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Point-in-time copy of all field/value pairs.
    pub fn entries(&self) -> Vec<(Bytes, Bytes)> {
        self.fields
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

/// Ordered list with head insertion.
#[derive(Debug, Default)]
pub struct ListValue {
    items: RwLock<VecDeque<Bytes>>,
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Bytes>) -> Self {
        Self {
            items: RwLock::new(items.into()),
        }
    }

    /// Pushes each value onto the head in argument order, so the last
    /// argument becomes the first element. Returns the new length.
    pub fn push_front(&self, values: Vec<Bytes>) -> usize {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        for value in values {
            items.push_front(value);
        }
        items.len()
    }

    /// Point-in-time copy, head first.
    pub fn items(&self) -> Vec<Bytes> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.iter().cloned().collect()
    }
}

/// Unordered set of unique members.
#[derive(Debug, Default)]
pub struct SetValue {
    members: DashSet<Bytes>,
}

impl SetValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds members, returning how many were not already present.
    pub fn add(&self, members: Vec<Bytes>) -> usize {
        members
            .into_iter()
            .filter(|m| self.members.insert(m.clone()))
            .count()
    }

    /// Removes members, returning how many were present.
    pub fn remove(&self, members: &[Bytes]) -> usize {
        members
            .iter()
            .filter(|&m| self.members.remove(m).is_some())
            .count()
    }

    /// Point-in-time copy of the members, sorted bytewise.
    pub fn members(&self) -> Vec<Bytes> {
        let mut members: Vec<Bytes> = self.members.iter().map(|m| m.key().clone()).collect();
        members.sort();
        members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Members ordered by score. Equal scores are ordered bytewise by member.
#[derive(Debug, Default)]
pub struct SortedSetValue {
    inner: RwLock<ScoreIndex>,
}

#[derive(Debug, Default)]
struct ScoreIndex {
    /// member → score
    scores: HashMap<Bytes, OrderedFloat<f64>>,
    /// score → members holding that score
    by_score: BTreeMap<OrderedFloat<f64>, BTreeSet<Bytes>>,
}

impl SortedSetValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member or moves it to a new score. Returns true if created.
    pub fn add(&self, score: f64, member: Bytes) -> bool {
        let score = OrderedFloat(score);
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let previous = inner.scores.insert(member.clone(), score);
        if let Some(old) = previous {
            if old == score {
                return false;
            }
            let now_empty = match inner.by_score.get_mut(&old) {
                Some(bucket) => {
                    bucket.remove(&member);
                    bucket.is_empty()
                }
                None => false,
            };
            if now_empty {
                inner.by_score.remove(&old);
            }
        }
        inner.by_score.entry(score).or_default().insert(member);

        previous.is_none()
    }

    /// Members between two ranks, inclusive. Negative ranks count from the
    /// end; out-of-range ranks are clamped.
    pub fn range(&self, start: i64, stop: i64) -> Vec<Bytes> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let len = inner.scores.len() as i64;
        if len == 0 {
            return Vec::new();
        }

        let start = if start < 0 { len + start } else { start }.max(0);
        let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);
        if start > stop || start >= len {
            return Vec::new();
        }

        inner
            .by_score
            .values()
            .flat_map(|bucket| bucket.iter())
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect()
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.scores.get(member).map(|s| s.into_inner())
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .scores
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy in rank order.
    pub fn entries(&self) -> Vec<(f64, Bytes)> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .by_score
            .iter()
            .flat_map(|(score, bucket)| bucket.iter().map(move |m| (score.into_inner(), m.clone())))
            .collect()
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_score
            .len()
    }
}
