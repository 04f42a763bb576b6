//! Benchmarks for change propagation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use beacon_core::{autorun, reaction, Observable, ObservableArray};

fn bench_observable_set_one_autorun(c: &mut Criterion) {
    let value = Observable::new(0u64);
    let reader = value.clone();
    let disposer = autorun(move |_| {
        black_box(reader.get());
    });

    let mut next = 0u64;
    c.bench_function("observable_set_one_autorun", |b| {
        b.iter(|| {
            next += 1;
            value.set(black_box(next));
        })
    });

    disposer.dispose();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1usize, 10, 100] {
        let value = Observable::new(0u64);
        let disposers: Vec<_> = (0..subscribers)
            .map(|_| {
                let reader = value.clone();
                autorun(move |_| {
                    black_box(reader.get());
                })
            })
            .collect();

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| {
                next += 1;
                value.set(black_box(next));
            })
        });

        for disposer in &disposers {
            disposer.dispose();
        }
    }

    group.finish();
}

fn bench_array_push_with_length_reaction(c: &mut Criterion) {
    let array: ObservableArray<u64> = ObservableArray::new();
    let source = array.clone();
    let disposer = reaction(
        move || source.len(),
        |len, _, _| {
            black_box(*len);
        },
    );

    c.bench_function("array_push_with_length_reaction", |b| {
        b.iter(|| {
            if array.len_untracked() > 4096 {
                array.clear();
            }
            array.push(black_box(7));
        })
    });

    disposer.dispose();
}

fn bench_array_join_autorun(c: &mut Criterion) {
    let array: ObservableArray<String> = (0..64).map(|i| i.to_string()).collect();
    let source = array.clone();
    let disposer = autorun(move |_| {
        black_box(source.join(","));
    });

    let mut next = 0u64;
    c.bench_function("array_index_write_rejoin_64", |b| {
        b.iter(|| {
            next += 1;
            array.set(black_box(31), next.to_string());
        })
    });

    disposer.dispose();
}

criterion_group!(
    benches,
    bench_observable_set_one_autorun,
    bench_fan_out,
    bench_array_push_with_length_reaction,
    bench_array_join_autorun,
);
criterion_main!(benches);
