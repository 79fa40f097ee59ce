#![cfg(test)]

// Property tests for ChainHashMap kept inside the crate so they can inspect
// chain layout (per-bucket lengths, home buckets) without widening the
// public API.

use crate::chain_hash_map::ChainHashMap;
use crate::options::TableOptions;
use crate::resize::within_bounds;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    Delete(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Rehash,
}

fn arb_options() -> impl Strategy<Value = TableOptions> {
    let gap = prop_oneof![0.02f64..0.39, 0.002f64..0.03];
    (1usize..=32, 0.0f64..0.6, gap).prop_map(|(initial_size, min_load, gap)| {
        TableOptions {
            initial_size,
            min_load,
            max_load: min_load + gap,
        }
    })
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::hash_set("[a-z]{0,6}", 1..=48).prop_flat_map(|pool| {
        let pool: Vec<String> = pool.into_iter().collect();
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            3 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,6}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Rehash),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Invariants that must hold between any two calls:
// - every entry sits in the bucket its key hashes to, and the chains account
//   for every live entry exactly once;
// - the load factor never exceeds max_load, and is below min_load only at the
//   shrink floor or when no whole bucket count holds `len` within bounds.
fn check_settled(t: &ChainHashMap<i32>, options: &TableOptions) -> Result<(), TestCaseError> {
    let lengths = t.chain_lengths();
    prop_assert_eq!(lengths.len(), t.bucket_count());
    prop_assert_eq!(lengths.iter().sum::<usize>(), t.len());
    for (k, _) in t.iter() {
        prop_assert_eq!(t.bucket_of(k), Some(t.home_bucket(k)));
    }

    let (count, size) = (t.len(), t.bucket_count());
    let load = t.load_factor();
    prop_assert!(load <= options.max_load, "load {} above max in {} buckets", load, size);
    let no_fit = within_bounds(count, options).is_none();
    prop_assert!(
        load >= options.min_load || size <= options.shrink_floor() || no_fit,
        "load {} below min with {} entries in {} buckets",
        load,
        count,
        size
    );
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences and load bounds:
// - `set` returns the displaced value exactly when the model had one.
// - `delete` hands back the model's value; absent keys change nothing.
// - `get`/`contains_key` parity with the model, including keys outside the pool.
// - `iter` yields each live entry exactly once; key set equals the model's.
// - `len`/`is_empty` parity and a settled load factor after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(options in arb_options(), (pool, ops) in arb_scenario()) {
        let mut sut: ChainHashMap<i32> = ChainHashMap::from_options(options).unwrap();
        let mut model: HashMap<String, i32> = HashMap::new();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = &pool[i];
                    let before = sut.bucket_count();
                    let prev = sut.set(k, v);
                    let mprev = model.insert(k.clone(), v);
                    prop_assert_eq!(prev, mprev);
                    if mprev.is_some() {
                        prop_assert_eq!(sut.bucket_count(), before, "overwrite must not resize");
                    }
                }
                OpI::Delete(i) => {
                    let k = &pool[i];
                    let before = sut.bucket_count();
                    let got = sut.delete(k);
                    let expected = model.remove(k);
                    prop_assert_eq!(got, expected);
                    if expected.is_none() {
                        prop_assert_eq!(sut.bucket_count(), before, "failed delete must not resize");
                    }
                    prop_assert!(sut.get(k).is_none());
                }
                OpI::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k), model.get(k));
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
                }
                OpI::Mutate(i, d) => {
                    let k = &pool[i];
                    match (sut.get_mut(k), model.get_mut(k)) {
                        (Some(sv), Some(mv)) => {
                            *sv = sv.saturating_add(d);
                            *mv = mv.saturating_add(d);
                        }
                        (None, None) => {}
                        _ => prop_assert!(false, "presence mismatch for {:?}", k),
                    }
                }
                OpI::Iterate => {
                    let mut visits = 0usize;
                    let mut s_keys = BTreeSet::new();
                    sut.iterate(|_, k, v, ordinal| {
                        assert_eq!(ordinal, visits);
                        assert_eq!(model.get(k), Some(v));
                        visits += 1;
                        s_keys.insert(k.to_string());
                    });
                    let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                    prop_assert_eq!(visits, model.len());
                    prop_assert_eq!(s_keys, m_keys);
                }
                OpI::Rehash => {
                    let before = sut.bucket_count();
                    sut.rehash().unwrap();
                    prop_assert_eq!(sut.bucket_count(), before);
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            check_settled(&sut, &options)?;
        }
    }
}

// Property: Same state-machine invariants under worst-case collisions (every
// key in bucket 0). This stresses chain unlinking at head, middle and tail
// and relinking during resizes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let options = TableOptions::default();
        let mut sut: ChainHashMap<i32> = ChainHashMap::new().with_hash(|_: &str, _: usize| 0);
        let mut model: HashMap<String, i32> = HashMap::new();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.set(k, v), model.insert(k.clone(), v));
                }
                OpI::Delete(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.delete(k), model.remove(k));
                }
                OpI::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k), model.get(k));
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
                }
                OpI::Mutate(i, d) => {
                    let k = &pool[i];
                    if let (Some(sv), Some(mv)) = (sut.get_mut(k), model.get_mut(k)) {
                        *sv = sv.wrapping_add(d);
                        *mv = mv.wrapping_add(d);
                    }
                }
                OpI::Iterate => {
                    let s_keys: BTreeSet<_> = sut.keys().map(str::to_string).collect();
                    let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                    prop_assert_eq!(s_keys, m_keys);
                }
                OpI::Rehash => sut.rehash().unwrap(),
            }

            prop_assert_eq!(sut.chain_lengths()[0], model.len());
            prop_assert_eq!(sut.len(), model.len());
            check_settled(&sut, &options)?;
        }
    }
}
