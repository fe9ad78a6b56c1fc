use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dada::libs::align::{align_subs, AlignParams};
use dada::libs::kmer::{KmerProfile, KMER_SIZE};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

/// A random sequence and a copy with about 1% substitutions.
fn pair(rng: &mut SmallRng, len: usize) -> (Vec<u8>, Vec<u8>) {
    let s1: Vec<u8> = (0..len).map(|_| rng.gen_range(0..4u8)).collect();
    let s2 = s1
        .iter()
        .map(|&nt| {
            if rng.gen_bool(0.01) {
                (nt + rng.gen_range(1..4u8)) % 4
            } else {
                nt
            }
        })
        .collect();
    (s1, s2)
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_endsfree");
    let mut rng = SmallRng::seed_from_u64(42);

    for len in [150, 250, 450] {
        let (s1, s2) = pair(&mut rng, len);
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("banded", len), &len, |b, _| {
            let params = AlignParams::default();
            b.iter(|| black_box(align_subs(black_box(&s1), black_box(&s2), &params)))
        });

        group.bench_with_input(BenchmarkId::new("unbanded", len), &len, |b, _| {
            let params = AlignParams {
                band: None,
                ..Default::default()
            };
            b.iter(|| black_box(align_subs(black_box(&s1), black_box(&s2), &params)))
        });
    }

    group.finish();
}

fn bench_kmer(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let (s1, s2) = pair(&mut rng, 250);
    let p1 = KmerProfile::new(&s1, KMER_SIZE);
    let p2 = KmerProfile::new(&s2, KMER_SIZE);

    c.bench_function("kmer_dist", |b| b.iter(|| black_box(p1.dist(black_box(&p2)))));
}

criterion_group!(benches, bench_align, bench_kmer);
criterion_main!(benches);
