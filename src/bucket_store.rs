//! Bucket store: one chain head per bucket, with chains threaded through an
//! entry arena.
//!
//! Entries live in a `SlotMap` owned by the table; a bucket head and each
//! entry's `next` link are arena keys. Moving an entry between chains only
//! rewrites links, so a rehash never copies keys or values.

use crate::error::TableError;
use slotmap::{DefaultKey, SlotMap};

pub(crate) type EntryKey = DefaultKey;
pub(crate) type Entries<V> = SlotMap<EntryKey, ChainEntry<V>>;

/// Largest bucket count whose head array fits in an allocation.
pub(crate) const MAX_BUCKETS: usize = isize::MAX as usize / core::mem::size_of::<Option<EntryKey>>();

#[derive(Debug)]
pub(crate) struct ChainEntry<V> {
    pub(crate) key: Box<str>,
    pub(crate) value: V,
    pub(crate) next: Option<EntryKey>,
}

impl<V> ChainEntry<V> {
    pub(crate) fn new(key: &str, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            next: None,
        }
    }
}

/// Whether running out of memory while sizing a store is reported to the
/// caller or handled the way `Vec` handles it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

#[derive(Debug)]
pub(crate) struct BucketStore {
    heads: Vec<Option<EntryKey>>,
}

impl BucketStore {
    /// Allocate `len` empty chains.
    ///
    /// A `len` above [`MAX_BUCKETS`] is reported under either fallibility;
    /// `Infallible` only changes how running out of memory is handled.
    pub(crate) fn allocate(len: usize, fallibility: Fallibility) -> Result<Self, TableError> {
        if len > MAX_BUCKETS {
            return Err(TableError::AllocationFailure { buckets: len });
        }
        let mut heads = Vec::new();
        match fallibility {
            Fallibility::Fallible => heads
                .try_reserve_exact(len)
                .map_err(|_| TableError::AllocationFailure { buckets: len })?,
            Fallibility::Infallible => heads.reserve_exact(len),
        }
        heads.resize(len, None);
        Ok(Self { heads })
    }

    pub(crate) fn len(&self) -> usize {
        self.heads.len()
    }

    pub(crate) fn heads(&self) -> &[Option<EntryKey>] {
        &self.heads
    }

    pub(crate) fn into_heads(self) -> Vec<Option<EntryKey>> {
        self.heads
    }

    /// Entry in chain `index` whose key equals `key`.
    pub(crate) fn find<V>(&self, entries: &Entries<V>, index: usize, key: &str) -> Option<EntryKey> {
        self.chain(entries, index)
            .find(|(_, e)| &*e.key == key)
            .map(|(k, _)| k)
    }

    /// Link `k` at the front of chain `index`. `k` must not be linked anywhere.
    pub(crate) fn push_front<V>(&mut self, entries: &mut Entries<V>, index: usize, k: EntryKey) {
        let head = &mut self.heads[index];
        entries[k].next = *head;
        *head = Some(k);
    }

    /// Unlink the entry keyed `key` from chain `index`. The entry stays in the
    /// arena; the caller decides what happens to it.
    pub(crate) fn unlink<V>(
        &mut self,
        entries: &mut Entries<V>,
        index: usize,
        key: &str,
    ) -> Option<EntryKey> {
        let mut prev: Option<EntryKey> = None;
        let mut cur = self.heads[index];
        while let Some(k) = cur {
            let (hit, next) = {
                let e = &entries[k];
                (&*e.key == key, e.next)
            };
            if hit {
                match prev {
                    None => self.heads[index] = next,
                    Some(p) => entries[p].next = next,
                }
                entries[k].next = None;
                return Some(k);
            }
            prev = Some(k);
            cur = next;
        }
        None
    }

    pub(crate) fn chain<'a, V>(&self, entries: &'a Entries<V>, index: usize) -> Chain<'a, V> {
        Chain {
            entries,
            cursor: self.heads[index],
        }
    }
}

/// Walks one collision chain from its head.
pub(crate) struct Chain<'a, V> {
    entries: &'a Entries<V>,
    cursor: Option<EntryKey>,
}

impl<'a, V> Chain<'a, V> {
    pub(crate) fn starting_at(entries: &'a Entries<V>, cursor: Option<EntryKey>) -> Self {
        Self { entries, cursor }
    }
}

impl<'a, V> Iterator for Chain<'a, V> {
    type Item = (EntryKey, &'a ChainEntry<V>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let e = &self.entries[k];
        self.cursor = e.next;
        Some((k, e))
    }
}
