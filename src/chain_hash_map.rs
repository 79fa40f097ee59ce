//! ChainHashMap: the string-keyed table tying the bucket store, resize
//! engine, hash strategy and cleanup hook together.

use crate::bucket_store::{BucketStore, Chain, ChainEntry, Entries, EntryKey, Fallibility};
use crate::error::TableError;
use crate::hash::{DefaultStrategy, HashStrategy};
use crate::options::TableOptions;
use crate::reentrancy::{DebugReentrancy, Op};
use crate::resize;
use core::fmt;
use slotmap::SlotMap;

/// Hook that receives every value still stored when a table is destroyed.
///
/// Values removed earlier through [`ChainHashMap::delete`] or displaced by
/// [`ChainHashMap::set`] are handed back to the caller instead and never
/// reach the hook.
pub trait Cleanup<V> {
    fn dispose(&mut self, key: &str, value: V);
}

impl<V, F> Cleanup<V> for F
where
    F: FnMut(&str, V),
{
    #[inline]
    fn dispose(&mut self, key: &str, value: V) {
        self(key, value)
    }
}

/// String-keyed hash table with separate chaining.
///
/// The table keeps `len() / bucket_count()` within `[min_load, max_load]`:
/// an insert that pushes the load above `max_load` grows the bucket store,
/// and a removal that drops it below `min_load` shrinks it (never below
/// [`shrink_floor`](Self::shrink_floor)). Resizing happens inside the call
/// that crossed the bound.
///
/// Keys are copied on insert. Values are moved in and handed back by
/// [`set`](Self::set) (when overwritten) and [`delete`](Self::delete); those
/// still present at destruction go to the [`Cleanup`] hook if one is set,
/// and are dropped otherwise.
pub struct ChainHashMap<V> {
    buckets: BucketStore,
    entries: Entries<V>,
    options: TableOptions,
    hash: Box<dyn HashStrategy>,
    cleanup: Option<Box<dyn Cleanup<V>>>,
    reentrancy: DebugReentrancy,
}

impl<V> ChainHashMap<V> {
    /// Empty table with 8 buckets, load bounds `[0.25, 0.75]`, the default
    /// hash strategy and no cleanup hook.
    pub fn new() -> Self {
        let options = TableOptions::default();
        let buckets = match BucketStore::allocate(options.initial_size, Fallibility::Infallible) {
            Ok(b) => b,
            Err(_) => unreachable!("default bucket count is far below MAX_BUCKETS"),
        };
        Self::from_parts(buckets, options)
    }

    /// Default table populated with `pairs`, applied in order. A key that
    /// appears more than once ends up with its last value.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let mut t = Self::new();
        t.extend(pairs);
        t
    }

    /// Empty table with `initial_size` buckets and the given load bounds.
    /// Fails with `InvalidConfiguration` on bad bounds or a zero size.
    pub fn with_options(initial_size: usize, max_load: f64, min_load: f64) -> Result<Self, TableError> {
        Self::from_options(TableOptions {
            initial_size,
            max_load,
            min_load,
        })
    }

    /// Like [`with_options`](Self::with_options), taking a [`TableOptions`].
    pub fn from_options(options: TableOptions) -> Result<Self, TableError> {
        options.validate()?;
        let buckets = BucketStore::allocate(options.initial_size, Fallibility::Fallible)?;
        Ok(Self::from_parts(buckets, options))
    }

    fn from_parts(buckets: BucketStore, options: TableOptions) -> Self {
        Self {
            buckets,
            entries: SlotMap::with_key(),
            options,
            hash: Box::new(DefaultStrategy::default()),
            cleanup: None,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Builder form of [`set_hash`](Self::set_hash).
    pub fn with_hash<H: HashStrategy + 'static>(mut self, hash: H) -> Self {
        self.set_hash(hash);
        self
    }

    /// Builder form of [`set_cleanup`](Self::set_cleanup).
    pub fn with_cleanup<C: Cleanup<V> + 'static>(mut self, cleanup: C) -> Self {
        self.set_cleanup(cleanup);
        self
    }

    /// Replace the hash strategy.
    ///
    /// Existing entries stay in the buckets chosen by the previous strategy,
    /// so lookups may miss them until [`rehash`](Self::rehash) is called.
    pub fn set_hash<H: HashStrategy + 'static>(&mut self, hash: H) {
        self.hash = Box::new(hash);
    }

    /// Install (or replace) the hook run on live values at destruction.
    pub fn set_cleanup<C: Cleanup<V> + 'static>(&mut self, cleanup: C) {
        self.cleanup = Some(Box::new(cleanup));
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Entries per bucket, `len() / bucket_count()`.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.bucket_count() as f64
    }

    /// Load above which an insert grows the table.
    pub fn max_load(&self) -> f64 {
        self.options.max_load
    }

    /// Load below which a removal shrinks the table.
    pub fn min_load(&self) -> f64 {
        self.options.min_load
    }

    /// Bucket count below which the table never shrinks.
    pub fn shrink_floor(&self) -> usize {
        self.options.shrink_floor()
    }

    #[inline]
    fn index_for(&self, key: &str) -> usize {
        let n = self.buckets.len();
        self.hash.bucket_index(key, n) % n
    }

    fn find(&self, key: &str) -> Option<EntryKey> {
        let _g = self.reentrancy.enter(Op::Lookup);
        let index = self.index_for(key);
        self.buckets.find(&self.entries, index, key)
    }

    /// Value stored under `key`, or `None` if it is absent.
    pub fn get(&self, key: &str) -> Option<&V> {
        let k = self.find(key)?;
        self.entries.get(k).map(|e| &e.value)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let k = self.find(key)?;
        self.entries.get_mut(k).map(|e| &mut e.value)
    }

    /// Whether an entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Map `key` to `value`, returning the value it replaces.
    ///
    /// The replaced value is not passed to the cleanup hook. Inserting a new
    /// key may grow the bucket store before returning; out-of-memory is
    /// handled as for `Vec`, and a grow larger than any allocation can hold
    /// is skipped and logged. See [`try_set`](Self::try_set) for a variant
    /// that reports allocation failure.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        match self.insert(key, value, Fallibility::Infallible) {
            Ok(prev) => prev,
            Err(_) => unreachable!("infallible inserts skip a grow they cannot allocate"),
        }
    }

    /// Like [`set`](Self::set), but if growing the bucket store fails the
    /// table is left untouched and `AllocationFailure` is returned.
    pub fn try_set(&mut self, key: &str, value: V) -> Result<Option<V>, TableError> {
        self.insert(key, value, Fallibility::Fallible)
    }

    fn insert(&mut self, key: &str, value: V, fallibility: Fallibility) -> Result<Option<V>, TableError> {
        let _g = self.reentrancy.enter(Op::Insert);
        let index = self.index_for(key);
        if let Some(k) = self.buckets.find(&self.entries, index, key) {
            let entry = &mut self.entries[k];
            return Ok(Some(core::mem::replace(&mut entry.value, value)));
        }

        // Reserve the grown store before linking so a failed allocation
        // leaves the table as it was.
        let count = self.entries.len() + 1;
        let grow = match resize::after_insert(count, self.buckets.len(), &self.options) {
            Some(plan) => match BucketStore::allocate(plan.new_size(), fallibility) {
                Ok(replacement) => Some((plan, replacement)),
                Err(err) if fallibility == Fallibility::Fallible => return Err(err),
                Err(err) => {
                    tracing::warn!(%err, count, size = self.buckets.len(), "skipping grow");
                    None
                }
            },
            None => None,
        };

        let k = self.entries.insert(ChainEntry::new(key, value));
        self.buckets.push_front(&mut self.entries, index, k);

        if let Some((plan, replacement)) = grow {
            resize::apply(plan, &mut self.entries, &mut self.buckets, replacement, &*self.hash);
        }
        Ok(None)
    }

    /// Remove `key`, handing its value back. The cleanup hook is not run.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        let _g = self.reentrancy.enter(Op::Remove);
        let index = self.index_for(key);
        let k = self.buckets.unlink(&mut self.entries, index, key)?;
        let entry = self.entries.remove(k)?;

        if let Some(plan) = resize::after_remove(self.entries.len(), self.buckets.len(), &self.options) {
            match BucketStore::allocate(plan.new_size(), Fallibility::Fallible) {
                Ok(replacement) => {
                    resize::apply(plan, &mut self.entries, &mut self.buckets, replacement, &*self.hash)
                }
                Err(err) => tracing::warn!(
                    %err,
                    count = self.entries.len(),
                    size = self.buckets.len(),
                    "skipping shrink"
                ),
            }
        }
        Some(entry.value)
    }

    /// Re-bucket every entry under the current hash strategy, keeping the
    /// bucket count. Needed after [`set_hash`](Self::set_hash) on a
    /// populated table.
    pub fn rehash(&mut self) -> Result<(), TableError> {
        let _g = self.reentrancy.enter(Op::Rehash);
        let n = self.buckets.len();
        let replacement = BucketStore::allocate(n, Fallibility::Fallible)?;
        resize::migrate(&mut self.entries, &mut self.buckets, replacement, &*self.hash);
        tracing::debug!(size = n, count = self.entries.len(), "rehashed in place");
        Ok(())
    }

    /// Call `visitor(table, key, value, ordinal)` once per entry, where
    /// `ordinal` counts the entries visited before this one. The order is
    /// unspecified.
    pub fn iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(&Self, &str, &V, usize),
    {
        for (ordinal, (key, value)) in self.iter().enumerate() {
            visitor(self, key, value, ordinal);
        }
    }

    /// Entries in bucket order, then chain order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            heads: self.buckets.heads().iter(),
            chain: Chain::starting_at(&self.entries, None),
            entries: &self.entries,
            remaining: self.entries.len(),
        }
    }

    /// Entries with mutable values, in storage order.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            it: self.entries.iter_mut(),
        }
    }

    /// Keys in [`iter`](Self::iter) order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Values in [`iter`](Self::iter) order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Destroy the table, passing each remaining entry to the cleanup hook.
    /// Dropping the table does the same.
    pub fn destroy(self) {
        drop(self)
    }

    #[cfg(test)]
    pub(crate) fn chain_lengths(&self) -> Vec<usize> {
        (0..self.buckets.len())
            .map(|i| self.buckets.chain(&self.entries, i).count())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn home_bucket(&self, key: &str) -> usize {
        self.index_for(key)
    }

    #[cfg(test)]
    pub(crate) fn bucket_of(&self, key: &str) -> Option<usize> {
        (0..self.buckets.len()).find(|&i| self.buckets.find(&self.entries, i, key).is_some())
    }
}

impl<V> Default for ChainHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for ChainHashMap<V> {
    fn drop(&mut self) {
        let Some(mut cleanup) = self.cleanup.take() else {
            return;
        };
        let live = self.entries.len();
        for (_, entry) in self.entries.drain() {
            cleanup.dispose(&entry.key, entry.value);
        }
        tracing::trace!(cleaned = live, "destroyed table");
    }
}

impl<V: fmt::Debug> fmt::Debug for ChainHashMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Pairs<'a, V>(&'a ChainHashMap<V>);
        impl<V: fmt::Debug> fmt::Debug for Pairs<'_, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map().entries(self.0.iter()).finish()
            }
        }
        f.debug_struct("ChainHashMap")
            .field("size", &self.bucket_count())
            .field("count", &self.len())
            .field("max_load", &self.options.max_load)
            .field("min_load", &self.options.min_load)
            .field("entries", &Pairs(self))
            .finish()
    }
}

impl<K: AsRef<str>, V> Extend<(K, V)> for ChainHashMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        for (k, v) in pairs {
            self.set(k.as_ref(), v);
        }
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for ChainHashMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Self::from_pairs(pairs)
    }
}

impl<'a, V> IntoIterator for &'a ChainHashMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(key, value)` pairs of a [`ChainHashMap`].
pub struct Iter<'a, V> {
    heads: core::slice::Iter<'a, Option<EntryKey>>,
    chain: Chain<'a, V>,
    entries: &'a Entries<V>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, e)) = self.chain.next() {
                self.remaining -= 1;
                return Some((&*e.key, &e.value));
            }
            let head = *self.heads.next()?;
            self.chain = Chain::starting_at(self.entries, head);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// Iterator over `(key, &mut value)` pairs of a [`ChainHashMap`].
pub struct IterMut<'a, V> {
    it: slotmap::basic::IterMut<'a, EntryKey, ChainEntry<V>>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = (&'a str, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| {
            let ChainEntry { key, value, .. } = e;
            (&**key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}
