//! chain-hashmap: a string-keyed hash table with separate chaining,
//! load-factor driven resizing, pluggable bucket selection and a cleanup
//! hook for values still stored at destruction.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small, predictable dictionary building block (symbol tables,
//!   caches) whose resize behavior can be reasoned about from two numbers,
//!   `min_load` and `max_load`.
//! - Layers, leaf-first:
//!   - `hash`: `HashStrategy` maps `(key, bucket_count)` to a bucket.
//!     `Djb2` is the default; `Fnv1a`, any `BuildHasher`, and plain
//!     closures also qualify.
//!   - `bucket_store`: chain entries live in a `SlotMap` arena; each bucket
//!     head and each entry's `next` link is an arena key. Chains are walked,
//!     pushed and unlinked here and nowhere else.
//!   - `resize`: plans grow/shrink from the load factor and relinks every
//!     entry into a fully allocated replacement store before swapping it in.
//!   - `ChainHashMap<V>`: public API; owns the store, the arena, options,
//!     strategy and cleanup hook.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no locks, no atomics).
//! - Keys are unique and copied on insert; values are moved in and handed
//!   back by `set` (on overwrite) and `delete`.
//! - After every `set`/`delete`, `len / bucket_count` is back within
//!   `[min_load, max_load]`, except that shrinking stops at the shrink
//!   floor `max(initial_size, 8)`, and a narrow band may admit no whole
//!   bucket count for the current `len`, leaving the load under `min_load`.
//! - A resize completes inside the call that triggered it; callers never
//!   see a partially migrated table.
//!
//! Resize policy
//! - Both directions go straight to the in-bounds bucket count nearest the
//!   midpoint of the bounds, or to the smallest count at or below the
//!   midpoint when none is in bounds. Growth is geometric, so inserts stay
//!   amortized O(1).
//! - Rehashing relinks entries: arena slots, keys and values stay put, only
//!   chain heads and `next` links are rewritten.
//! - The grown store is allocated before a new entry is linked, so
//!   `try_set` can report `AllocationFailure` with the table untouched.
//!   A shrink that cannot allocate, or a grow `set` cannot allocate, is
//!   skipped and logged.
//!
//! Hash strategy caveat
//! - Swapping the strategy on a populated table does not move entries;
//!   call `rehash()` afterwards or lookups may miss.
//!
//! Cleanup
//! - The hook sees every value still stored when the table is destroyed
//!   (explicitly via `destroy` or by drop), exactly once each. Overwritten
//!   and deleted values never reach it.
//!
//! Reentrancy
//! - Hash strategies run while chains may be half linked. A debug-only
//!   guard panics if one re-enters the table it serves.

mod bucket_store;
mod chain_hash_map;
mod chain_hash_map_proptest;
pub mod error;
pub mod hash;
pub mod options;
mod reentrancy;
mod resize;

// Public surface
pub use chain_hash_map::{ChainHashMap, Cleanup, Iter, IterMut};
pub use error::{ConfigError, TableError};
pub use hash::{BuildHasherStrategy, DefaultStrategy, Djb2, Fnv1a, HashStrategy};
pub use options::TableOptions;
