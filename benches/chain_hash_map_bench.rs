use chain_hashmap::{BuildHasherStrategy, ChainHashMap, Fnv1a};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hashbrown::hash_map::DefaultHashBuilder;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (ChainHashMap<u64>, Vec<String>) {
    let keys: Vec<_> = lcg(seed).take(n).map(key).collect();
    let mut m = ChainHashMap::new();
    for (i, k) in keys.iter().enumerate() {
        m.set(k, i as u64);
    }
    (m, keys)
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(100_000).map(key).collect();
    c.bench_function("chain::insert_fresh_100k", |b| {
        b.iter_batched(
            ChainHashMap::<u64>::new,
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    m.set(k, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_overwrite(c: &mut Criterion) {
    c.bench_function("chain::overwrite", |b| {
        let (mut m, keys) = filled(2, 10_000);
        let mut it = keys.iter().cycle();
        let mut n = 0u64;
        b.iter(|| {
            let k = it.next().unwrap();
            n = n.wrapping_add(1);
            black_box(m.set(k, n));
        })
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("chain::get_hit", |b| {
        let (m, keys) = filled(7, 20_000);
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("chain::get_miss", |b| {
        let (m, _) = filled(11, 10_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(m.get(&k));
        })
    });
}

fn bench_get_hit_strategies(c: &mut Criterion) {
    let keys: Vec<_> = lcg(13).take(20_000).map(key).collect();
    let mut group = c.benchmark_group("chain::get_hit_by_strategy");
    let tables = [
        ("djb2", ChainHashMap::new()),
        ("fnv1a", ChainHashMap::new().with_hash(Fnv1a)),
        (
            "build_hasher",
            ChainHashMap::new().with_hash(BuildHasherStrategy::new(DefaultHashBuilder::default())),
        ),
    ];
    for (name, mut m) in tables {
        for (i, k) in keys.iter().enumerate() {
            m.set(k, i as u64);
        }
        let mut it = keys.iter().cycle();
        group.bench_function(name, |b| {
            b.iter(|| {
                let k = it.next().unwrap();
                black_box(m.get(k).unwrap());
            })
        });
    }
    group.finish();
}

fn bench_churn_grow_shrink(c: &mut Criterion) {
    c.bench_function("chain::churn_grow_shrink_10k", |b| {
        let keys: Vec<_> = lcg(17).take(10_000).map(key).collect();
        b.iter_batched(
            ChainHashMap::<u64>::new,
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    m.set(k, i as u64);
                }
                for k in &keys {
                    black_box(m.delete(k));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_iterate(c: &mut Criterion) {
    c.bench_function("chain::iterate_10k", |b| {
        let (m, _) = filled(19, 10_000);
        b.iter(|| {
            let mut sum = 0u64;
            m.iterate(|_, _, v, _| sum = sum.wrapping_add(*v));
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_overwrite, bench_get_hit, bench_get_miss,
        bench_get_hit_strategies, bench_churn_grow_shrink, bench_iterate
}
criterion_main!(benches);
