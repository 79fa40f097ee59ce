//! Resize engine: decides when the bucket store grows or shrinks and
//! migrates entries into a replacement store.
//!
//! A resize picks, among the bucket counts that put the load back inside
//! `[min_load, max_load]`, the one closest to the midpoint of the bounds.
//! When no whole bucket count fits (a narrow band and few entries) it falls
//! back to the smallest count at or below the midpoint. Each grow multiplies
//! the size by roughly `max_load / midpoint`, which keeps inserts amortized
//! O(1). Shrinking never goes below the shrink floor.

use crate::bucket_store::{BucketStore, Entries, MAX_BUCKETS};
use crate::hash::HashStrategy;
use crate::options::TableOptions;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Resize {
    Grow(usize),
    Shrink(usize),
}

impl Resize {
    pub(crate) fn new_size(self) -> usize {
        match self {
            Resize::Grow(n) | Resize::Shrink(n) => n,
        }
    }
}

#[inline]
fn load(count: usize, size: usize) -> f64 {
    count as f64 / size as f64
}

/// Smallest bucket count at which `count` entries sit at or below the
/// target load.
fn ideal_size(count: usize, options: &TableOptions) -> usize {
    let ideal = (count as f64 / options.target_load()).ceil();
    // Saturating; anything above MAX_BUCKETS is refused at allocation.
    (ideal as usize).max(1)
}

/// Inclusive range of bucket counts that hold `count` entries within
/// `[min_load, max_load]`, if any whole count does.
pub(crate) fn within_bounds(count: usize, options: &TableOptions) -> Option<(usize, usize)> {
    let c = count as f64;
    let lo = (c / options.max_load).ceil().max(1.0);
    let hi = if options.min_load > 0.0 {
        (c / options.min_load).floor()
    } else {
        MAX_BUCKETS as f64
    };
    if lo > hi.min(MAX_BUCKETS as f64) {
        return None;
    }
    let mut lo = lo as usize;
    let mut hi = (hi as usize).min(MAX_BUCKETS);
    // The float quotients can land one bucket past either bound.
    if load(count, lo) > options.max_load {
        lo += 1;
    }
    if load(count, hi) < options.min_load {
        hi -= 1;
    }
    (lo <= hi).then_some((lo, hi))
}

/// Bucket count in `[lo, hi]` closest to putting `count` at the target load.
fn nearest_to_target(count: usize, lo: usize, hi: usize, options: &TableOptions) -> usize {
    let t = (count as f64 / options.target_load()).round();
    if t <= lo as f64 {
        lo
    } else if t >= hi as f64 {
        hi
    } else {
        t as usize
    }
}

/// Plan for a table that will hold `count` entries in `size` buckets once the
/// pending insert lands.
pub(crate) fn after_insert(count: usize, size: usize, options: &TableOptions) -> Option<Resize> {
    if load(count, size) <= options.max_load {
        return None;
    }
    let new_size = match within_bounds(count, options) {
        Some((lo, hi)) if hi > size => nearest_to_target(count, lo.max(size + 1), hi, options),
        _ => ideal_size(count, options).max(size.saturating_add(1)),
    };
    Some(Resize::Grow(new_size))
}

/// Plan for a table holding `count` entries in `size` buckets right after a
/// removal.
pub(crate) fn after_remove(count: usize, size: usize, options: &TableOptions) -> Option<Resize> {
    let floor = options.shrink_floor();
    if size <= floor || load(count, size) >= options.min_load {
        return None;
    }
    let new_size = match within_bounds(count, options) {
        Some((lo, hi)) if hi >= floor => nearest_to_target(count, lo.max(floor), hi, options),
        _ => ideal_size(count, options).max(floor),
    };
    (new_size < size).then_some(Resize::Shrink(new_size))
}

/// Relink every entry of `buckets` into `replacement` under `hash`, then
/// install `replacement`. Entries keep their arena slot; only `next` links
/// and chain heads change.
pub(crate) fn migrate<V>(
    entries: &mut Entries<V>,
    buckets: &mut BucketStore,
    replacement: BucketStore,
    hash: &dyn HashStrategy,
) {
    let old = core::mem::replace(buckets, replacement);
    let n = buckets.len();
    for head in old.into_heads() {
        let mut cur = head;
        while let Some(k) = cur {
            let entry = &entries[k];
            cur = entry.next;
            let index = hash.bucket_index(&entry.key, n) % n;
            buckets.push_front(entries, index, k);
        }
    }
}

/// Carry out `plan` with the already allocated `replacement` store.
pub(crate) fn apply<V>(
    plan: Resize,
    entries: &mut Entries<V>,
    buckets: &mut BucketStore,
    replacement: BucketStore,
    hash: &dyn HashStrategy,
) {
    debug_assert_eq!(plan.new_size(), replacement.len());
    let from = buckets.len();
    migrate(entries, buckets, replacement, hash);
    match plan {
        Resize::Grow(to) => tracing::debug!(from, to, count = entries.len(), "grew bucket store"),
        Resize::Shrink(to) => {
            tracing::debug!(from, to, count = entries.len(), "shrank bucket store")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket_store::{ChainEntry, Fallibility};
    use crate::hash::Djb2;
    use slotmap::SlotMap;
    use std::collections::BTreeSet;

    fn opts(initial: usize, max: f64, min: f64) -> TableOptions {
        TableOptions::new()
            .initial_size(initial)
            .max_load(max)
            .min_load(min)
    }

    /// The load a settled table may show: within bounds, or under
    /// `min_load` only at the floor or when no whole bucket count fits.
    fn settled(count: usize, size: usize, o: &TableOptions) -> bool {
        let l = load(count, size);
        l <= o.max_load
            && (l >= o.min_load || size <= o.shrink_floor() || within_bounds(count, o).is_none())
    }

    #[test]
    fn grow_triggers_only_above_max_load() {
        let o = opts(8, 0.75, 0.25);
        assert_eq!(after_insert(6, 8, &o), None);
        assert_eq!(after_insert(7, 8, &o), Some(Resize::Grow(14)));
    }

    #[test]
    fn grow_targets_the_midpoint() {
        let o = opts(1, 0.5, 0.4);
        assert_eq!(after_insert(1, 1, &o), Some(Resize::Grow(2)));
        let o = opts(8, 0.75, 0.25);
        assert_eq!(after_insert(96, 128, &o), None);
        assert_eq!(after_insert(100, 128, &o), Some(Resize::Grow(200)));
        assert_eq!(after_insert(97, 64, &o), Some(Resize::Grow(194)));
    }

    #[test]
    fn grown_size_lands_at_or_below_target() {
        let o = opts(8, 0.75, 0.25);
        for size in [1usize, 8, 13, 64] {
            for count in 0..400 {
                if let Some(plan) = after_insert(count, size, &o) {
                    let n = plan.new_size();
                    assert!(n > size);
                    assert!(load(count, n) <= o.target_load() + 1e-12);
                    assert!(settled(count, n, &o));
                }
            }
        }
    }

    /// Invariant: a narrow band with a fitting bucket count lands inside it
    /// rather than at the rounded-up midpoint.
    #[test]
    fn narrow_band_grow_lands_inside_bounds() {
        let o = opts(21, 0.46, 0.44);
        assert_eq!(within_bounds(10, &o), Some((22, 22)));
        assert_eq!(after_insert(10, 21, &o), Some(Resize::Grow(22)));
        // 2 entries fit no whole bucket count: [4.35, 4.55].
        assert_eq!(within_bounds(2, &o), None);
        assert_eq!(within_bounds(5, &o), Some((11, 11)));
    }

    #[test]
    fn bucket_ranges_respect_both_bounds() {
        let o = opts(8, 0.75, 0.25);
        assert_eq!(within_bounds(0, &o), None);
        assert_eq!(within_bounds(3, &o), Some((4, 12)));
        let unbounded = opts(8, 0.75, 0.0);
        assert_eq!(within_bounds(0, &unbounded), Some((1, MAX_BUCKETS)));
        for o in [o, opts(8, 0.46, 0.44), opts(8, 0.9, 0.05)] {
            for count in 1..300 {
                if let Some((lo, hi)) = within_bounds(count, &o) {
                    for n in [lo, hi] {
                        assert!(load(count, n) <= o.max_load && load(count, n) >= o.min_load);
                    }
                    assert!(load(count, lo - 1) > o.max_load || lo == 1);
                    assert!(load(count, hi + 1) < o.min_load);
                }
            }
        }
    }

    #[test]
    fn unreachable_target_plans_an_oversized_store() {
        let o = opts(8, 1e-300, 0.0);
        assert_eq!(within_bounds(1, &o), None);
        let plan = after_insert(1, 8, &o).expect("grow");
        assert!(plan.new_size() > MAX_BUCKETS);
    }

    #[test]
    fn shrink_triggers_only_below_min_load_and_above_floor() {
        let o = opts(8, 0.75, 0.25);
        assert_eq!(after_remove(4, 16, &o), None);
        assert_eq!(after_remove(3, 16, &o), Some(Resize::Shrink(8)));
        // At the floor nothing happens, however sparse.
        assert_eq!(after_remove(0, 8, &o), None);
    }

    #[test]
    fn shrink_targets_the_midpoint_and_respects_floor() {
        let o = opts(8, 0.75, 0.25);
        assert_eq!(after_remove(10, 64, &o), Some(Resize::Shrink(20)));
        assert_eq!(after_remove(0, 64, &o), Some(Resize::Shrink(8)));
        let big_floor = opts(32, 0.75, 0.25);
        assert_eq!(after_remove(0, 48, &big_floor), Some(Resize::Shrink(32)));
    }

    #[test]
    fn narrow_band_shrink_stays_within_bounds() {
        let o = opts(8, 0.5, 0.4);
        let plan = after_remove(30, 100, &o).expect("shrink");
        assert_eq!(plan, Resize::Shrink(67));
        assert!(settled(30, 67, &o));
    }

    #[test]
    fn every_planned_shrink_settles() {
        for o in [opts(8, 0.75, 0.25), opts(1, 0.9, 0.05), opts(16, 0.46, 0.44)] {
            for size in 9..200 {
                for count in 0..size {
                    if let Some(plan) = after_remove(count, size, &o) {
                        assert!(plan.new_size() < size);
                        assert!(settled(count, plan.new_size(), &o), "{} in {}", count, size);
                    }
                }
            }
        }
    }

    #[test]
    fn migrate_relinks_every_entry_without_moving_it() {
        let mut entries = SlotMap::with_key();
        let mut buckets = BucketStore::allocate(2, Fallibility::Fallible).unwrap();
        let mut slots = Vec::new();
        for i in 0..20 {
            let key = format!("k{}", i);
            let k = entries.insert(ChainEntry::new(&key, i));
            let index = Djb2.bucket_index(&key, 2);
            buckets.push_front(&mut entries, index, k);
            slots.push((key, k));
        }

        let replacement = BucketStore::allocate(32, Fallibility::Fallible).unwrap();
        migrate(&mut entries, &mut buckets, replacement, &Djb2);

        assert_eq!(buckets.len(), 32);
        let mut seen = BTreeSet::new();
        for index in 0..32 {
            for (k, e) in buckets.chain(&entries, index) {
                assert_eq!(Djb2.bucket_index(&e.key, 32), index);
                assert!(seen.insert(k), "entry linked twice");
            }
        }
        assert_eq!(seen.len(), 20);
        for (key, k) in slots {
            assert_eq!(&*entries[k].key, key.as_str());
            assert_eq!(buckets.find(&entries, Djb2.bucket_index(&key, 32), &key), Some(k));
        }
    }
}
