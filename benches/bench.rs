use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::RngCore;
use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256StarStar};

use ansamble::{
    codec::MultisetCodec, model::UniformModel, AnsCoder, DefaultAnsCoder, Multiset,
};

fn bench_coder(c: &mut Criterion) {
    let mut group = c.benchmark_group("coder");
    let mut rng = Xoshiro256StarStar::seed_from_u64(42);

    const LANES: usize = 8;
    let steps: Vec<[(u32, u32); LANES]> = (0..1000)
        .map(|_| {
            core::array::from_fn(|_| {
                let start = rng.next_u32() % 60000;
                (start, 1 + rng.next_u32() % (65536 - start))
            })
        })
        .collect();

    group.bench_function("push_8_lanes", |b| {
        b.iter(|| {
            let mut coder = AnsCoder::<u32, u64, 16>::with_lanes(LANES);
            for intervals in &steps {
                coder.push_intervals(black_box(intervals)).unwrap();
            }
            coder
        })
    });

    let mut pushed = AnsCoder::<u32, u64, 16>::with_lanes(LANES);
    for intervals in &steps {
        pushed.push_intervals(intervals).unwrap();
    }

    group.bench_function("pop_8_lanes", |b| {
        b.iter(|| {
            let mut coder = pushed.clone();
            for intervals in steps.iter().rev() {
                coder.pop_intervals(black_box(intervals)).unwrap();
            }
            coder
        })
    });

    group.finish();
}

fn bench_multiset_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiset_codec");
    let mut rng = Xoshiro256StarStar::seed_from_u64(7);

    let symbols: Vec<usize> = (0..10_000)
        .map(|_| {
            let a = rng.next_u32() as u8;
            let b = (rng.next_u32() >> 8) as u8;
            a.min(b) as usize
        })
        .collect();
    let multiset: Multiset<usize> = symbols.iter().copied().collect();
    let codec = MultisetCodec::new(UniformModel::<u32, 27>::new(256));

    group.bench_function("build_10k", |b| {
        b.iter(|| symbols.iter().copied().collect::<Multiset<usize>>())
    });

    group.bench_function("encode_10k", |b| {
        b.iter(|| {
            let mut coder = DefaultAnsCoder::new();
            codec
                .encode(&mut coder, black_box(multiset.clone()))
                .unwrap();
            coder
        })
    });

    let mut encoded = DefaultAnsCoder::new();
    codec.encode(&mut encoded, multiset.clone()).unwrap();

    group.bench_function("decode_10k", |b| {
        b.iter(|| {
            let mut coder = encoded.clone();
            codec.decode(&mut coder, black_box(symbols.len())).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_coder, bench_multiset_codec);
criterion_main!(benches);
