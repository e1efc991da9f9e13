//! Bloom Filter
//!
//! A space-efficient probabilistic set. `might_contain` never returns a
//! false negative; the false-positive rate is bounded by the error rate the
//! filter was sized for.
//!
//! ## Sizing
//!
//! For capacity `n` and error rate `p`:
//!
//! ```text
//! m = roundUpTo64(ceil(-n * ln(p) / ln(2)^2))     bits
//! k = max(1, ceil((m / n) * ln(2)))               hash functions
//! ```
//!
//! ## Hashing
//!
//! Each element is hashed once with MurmurHash3 x64_128, both halves seeded
//! with the filter's 64-bit seed. The `i`-th probe position is
//! `(h1 + i * h2) mod m` in wrapping unsigned 64-bit arithmetic.
//!
//! ## Serialized Layout (big-endian)
//!
//! ```text
//! seed: i64 | bit count: i64 | k: i32 | word count: i32 | words: i64 * count
//! ```
//!
//! The layout is a persisted format. Changing it requires a new snapshot
//! version.

use bytes::{Buf, BufMut};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Capacity used when BF.ADD creates a filter implicitly
pub const DEFAULT_CAPACITY: u64 = 100;

/// Error rate used when BF.ADD creates a filter implicitly
pub const DEFAULT_ERROR_RATE: f64 = 0.01;

/// Largest filter that may be created: 2^32 bits (512 MiB of words)
pub const MAX_BIT_SIZE: u64 = 1 << 32;

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BloomError {
    #[error("capacity must be positive")]
    InvalidCapacity,

    #[error("error rate must be between 0 and 1 exclusive")]
    InvalidErrorRate,

    #[error("filter would need more than 2^32 bits")]
    TooLarge,

    #[error("truncated bloom filter data")]
    Truncated,

    #[error("inconsistent bloom filter layout: {0}")]
    Inconsistent(String),
}

/// A concurrent Bloom filter over an array of atomic 64-bit words.
pub struct BloomFilter {
    seed: u64,
    bit_size: u64,
    num_hashes: u32,
    words: Box<[AtomicU64]>,
}

impl fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("seed", &self.seed)
            .field("bit_size", &self.bit_size)
            .field("num_hashes", &self.num_hashes)
            .finish()
    }
}

impl BloomFilter {
    /// Creates an empty filter with a random seed.
    pub fn new(capacity: u64, error_rate: f64) -> Result<Self, BloomError> {
        Self::with_seed(capacity, error_rate, rand::random::<u64>())
    }

    /// Creates an empty filter with an explicit seed.
    pub fn with_seed(capacity: u64, error_rate: f64, seed: u64) -> Result<Self, BloomError> {
        if capacity == 0 {
            return Err(BloomError::InvalidCapacity);
        }
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(BloomError::InvalidErrorRate);
        }

        let bit_size = optimal_bit_size(capacity, error_rate)?;
        let num_hashes = optimal_num_hashes(bit_size, capacity);
        let words = (0..bit_size / 64).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            seed,
            bit_size,
            num_hashes,
            words,
        })
    }

    /// Reassembles a filter from its persisted parts.
    pub fn from_parts(
        seed: u64,
        bit_size: u64,
        num_hashes: u32,
        words: Vec<u64>,
    ) -> Result<Self, BloomError> {
        if num_hashes == 0 {
            return Err(BloomError::Inconsistent("zero hash functions".into()));
        }
        if bit_size == 0
            || bit_size > MAX_BIT_SIZE
            || bit_size % 64 != 0
            || bit_size / 64 != words.len() as u64
        {
            return Err(BloomError::Inconsistent(format!(
                "{} bits in {} words",
                bit_size,
                words.len()
            )));
        }

        Ok(Self {
            seed,
            bit_size,
            num_hashes,
            words: words.into_iter().map(AtomicU64::new).collect(),
        })
    }

    /// Adds an element. Returns true if at least one bit flipped from 0 to 1.
    pub fn add(&self, element: &[u8]) -> bool {
        let mut changed = false;

        for pos in self.positions(element) {
            let word = &self.words[(pos >> 6) as usize];
            let mask = 1u64 << (pos & 63);

            let mut current = word.load(Ordering::Acquire);
            loop {
                if current & mask != 0 {
                    break;
                }
                match word.compare_exchange_weak(
                    current,
                    current | mask,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        changed = true;
                        break;
                    }
                    Err(actual) => current = actual,
                }
            }
        }

        changed
    }

    /// False means definitely absent; true means possibly present.
    pub fn might_contain(&self, element: &[u8]) -> bool {
        self.positions(element).all(|pos| {
            let word = self.words[(pos >> 6) as usize].load(Ordering::Acquire);
            word & (1u64 << (pos & 63)) != 0
        })
    }

    fn positions(&self, element: &[u8]) -> impl Iterator<Item = u64> {
        let (h1, h2) = murmur3_x64_128(element, self.seed);
        let m = self.bit_size;
        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bit_size(&self) -> u64 {
        self.bit_size
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Point-in-time copy of the bit words.
    pub fn words(&self) -> Vec<u64> {
        self.words.iter().map(|w| w.load(Ordering::Acquire)).collect()
    }

    /// Size of the serialized form in bytes.
    pub fn encoded_len(&self) -> usize {
        8 + 8 + 4 + 4 + self.words.len() * 8
    }

    /// Writes the filter in its persisted layout.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64(self.seed as i64);
        buf.put_i64(self.bit_size as i64);
        buf.put_i32(self.num_hashes as i32);
        buf.put_i32(self.words.len() as i32);
        for word in self.words.iter() {
            buf.put_i64(word.load(Ordering::Acquire) as i64);
        }
    }

    /// Reads a filter written by [`encode`](Self::encode).
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, BloomError> {
        if buf.remaining() < 24 {
            return Err(BloomError::Truncated);
        }
        let seed = buf.get_i64() as u64;
        let bit_size = buf.get_i64();
        let num_hashes = buf.get_i32();
        let len = buf.get_i32();

        if bit_size <= 0 || num_hashes <= 0 || len < 0 {
            return Err(BloomError::Inconsistent(format!(
                "bits={} k={} words={}",
                bit_size, num_hashes, len
            )));
        }
        if bit_size as u64 > MAX_BIT_SIZE {
            return Err(BloomError::TooLarge);
        }
        let len = len as usize;
        if buf.remaining() / 8 < len {
            return Err(BloomError::Truncated);
        }

        let words = (0..len).map(|_| buf.get_i64() as u64).collect();
        Self::from_parts(seed, bit_size as u64, num_hashes as u32, words)
    }
}

fn optimal_bit_size(capacity: u64, error_rate: f64) -> Result<u64, BloomError> {
    let ln2 = std::f64::consts::LN_2;
    let bits_per_element = -error_rate.ln() / (ln2 * ln2);
    let bits = (capacity as f64 * bits_per_element).ceil();
    // compared as f64 so the cast below never saturates
    if bits > MAX_BIT_SIZE as f64 {
        return Err(BloomError::TooLarge);
    }
    let words = (bits as u64).div_ceil(64).max(1);
    words
        .checked_mul(64)
        .filter(|&size| size <= MAX_BIT_SIZE)
        .ok_or(BloomError::TooLarge)
}

fn optimal_num_hashes(bit_size: u64, capacity: u64) -> u32 {
    let k = ((bit_size as f64 / capacity as f64) * std::f64::consts::LN_2).ceil();
    // serialized as i32
    (k as u64).clamp(1, i32::MAX as u64) as u32
}

/// MurmurHash3 x64_128 with both lanes seeded by the same 64-bit seed.
pub fn murmur3_x64_128(data: &[u8], seed: u64) -> (u64, u64) {
    let len = data.len();
    let mut h1 = seed;
    let mut h2 = seed;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let (lo, hi) = block.split_at(8);
        let k1 = read_u64_le(lo);
        let k2 = read_u64_le(hi);

        h1 ^= mix_k1(k1);
        h1 = h1.rotate_left(27).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        h2 ^= mix_k2(k2);
        h2 = h2.rotate_left(31).wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        let k2 = tail[8..]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc ^ ((b as u64) << (8 * i)));
        h2 ^= mix_k2(k2);
    }
    if !tail.is_empty() {
        let k1 = tail[..tail.len().min(8)]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc ^ ((b as u64) << (8 * i)));
        h1 ^= mix_k1(k1);
    }

    h1 ^= len as u64;
    h2 ^= len as u64;
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1, h2)
}

/// Little-endian load of an 8-byte block half.
#[inline]
fn read_u64_le(half: &[u8]) -> u64 {
    half.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[inline]
fn mix_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

#[inline]
fn mix_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}
