use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use persistent_vector::Vector;

pub fn batched_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");

    group.bench_function("immutable 10000, N=32", |b| {
        b.iter(|| {
            let mut vec = Vector::<u32>::new();
            for i in 0..10000 {
                vec = vec.push(i);
            }
            black_box(vec)
        })
    });

    group.bench_function("transient 10000, N=32", |b| {
        b.iter(|| {
            let mut transient = Vector::<u32>::new().transient();
            for i in 0..10000 {
                transient.push(i).unwrap();
            }
            black_box(transient.seal().unwrap())
        })
    });
}

pub fn batched_set(c: &mut Criterion) {
    let vec: Vector<u32> = (0..10000).collect();
    let mut group = c.benchmark_group("set all");

    group.bench_function("immutable 10000, N=32", |b| {
        b.iter_batched(
            || vec.clone(),
            |mut vec| {
                for i in 0..10000 {
                    vec = vec.set(i, 0).unwrap();
                }
                vec
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("transient 10000, N=32", |b| {
        b.iter_batched(
            || vec.transient(),
            |mut transient| {
                for i in 0..10000 {
                    transient.set(i, 0).unwrap();
                }
                transient.seal().unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn iter(c: &mut Criterion) {
    let vec: Vector<u32> = (0..10000).collect();
    let mut group = c.benchmark_group("iter");

    group.bench_function("values 100 out of 10k, N=32", |b| {
        b.iter(|| black_box(vec.values(5000..5100).count()));
    });

    group.bench_function("entries 10k, N=32", |b| {
        b.iter(|| black_box(vec.entries(..).map(|(i, x)| i as u32 ^ x).sum::<u32>()));
    });
}

criterion_group!(benches, batched_push, batched_set, iter);
criterion_main!(benches);
