//! Bucket selection strategies.
//!
//! A [`HashStrategy`] maps a key and the current bucket count to a bucket
//! index. The table calls it on every lookup and once per entry during a
//! rehash, always with `bucket_count >= 1`, and reduces the returned index
//! modulo `bucket_count`.
//!
//! Strategies must be deterministic for a given `(key, bucket_count)` pair.
//! Replacing the strategy of a populated table does not move existing
//! entries; see [`ChainHashMap::set_hash`](crate::ChainHashMap::set_hash).

use core::hash::BuildHasher;
use hashbrown::hash_map::DefaultHashBuilder;

/// Maps a key to one of `bucket_count` buckets.
///
/// Implemented for `Fn(&str, usize) -> usize` closures, so a plain function
/// can serve as a strategy.
pub trait HashStrategy {
    /// Bucket for `key` in a table of `bucket_count` buckets.
    ///
    /// Called only with `bucket_count >= 1`. Must return the same index for
    /// the same `(key, bucket_count)` for as long as the strategy is
    /// installed. Results outside `0..bucket_count` are reduced modulo
    /// `bucket_count` by the table, so range is a matter of distribution,
    /// not safety.
    fn bucket_index(&self, key: &str, bucket_count: usize) -> usize;
}

impl<F> HashStrategy for F
where
    F: Fn(&str, usize) -> usize,
{
    #[inline]
    fn bucket_index(&self, key: &str, bucket_count: usize) -> usize {
        self(key, bucket_count)
    }
}

/// Strategy installed by the default constructors.
pub type DefaultStrategy = Djb2;

/// Bernstein's `h * 33 + c` string hash.
#[derive(Copy, Clone, Debug, Default)]
pub struct Djb2;

/// djb2 over `bytes` with wrapping 64-bit arithmetic, starting from 5381.
pub const fn djb2(bytes: &[u8]) -> u64 {
    let mut h: u64 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        h = h.wrapping_mul(33).wrapping_add(bytes[i] as u64);
        i += 1;
    }
    h
}

impl HashStrategy for Djb2 {
    #[inline]
    fn bucket_index(&self, key: &str, bucket_count: usize) -> usize {
        (djb2(key.as_bytes()) % bucket_count as u64) as usize
    }
}

/// 64-bit FNV-1a.
#[derive(Copy, Clone, Debug, Default)]
pub struct Fnv1a;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over `bytes`.
pub const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        h ^= bytes[i] as u64;
        h = h.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    h
}

impl HashStrategy for Fnv1a {
    #[inline]
    fn bucket_index(&self, key: &str, bucket_count: usize) -> usize {
        (fnv1a(key.as_bytes()) % bucket_count as u64) as usize
    }
}

/// Adapts any [`BuildHasher`] into a strategy.
///
/// With a randomly seeded builder (the default, hashbrown's
/// `DefaultHashBuilder`) indices are stable for the lifetime of the strategy
/// value but differ between instances, which makes bucket layout unpredictable
/// to an adversary choosing keys.
#[derive(Clone, Debug, Default)]
pub struct BuildHasherStrategy<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> BuildHasherStrategy<S> {
    /// Strategy hashing keys with `hasher`.
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<S: BuildHasher> HashStrategy for BuildHasherStrategy<S> {
    #[inline]
    fn bucket_index(&self, key: &str, bucket_count: usize) -> usize {
        (self.hasher.hash_one(key) % bucket_count as u64) as usize
    }
}
