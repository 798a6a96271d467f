use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use strata_core::{canonical_components, ComponentType, History, Layout, PlacedComponent};

fn create_layout(n: usize) -> Layout {
    let components = (0..n)
        .map(|i| PlacedComponent::with_id(format!("c-{i}"), ComponentType::ALL[i % 3]))
        .collect();
    Layout::new(components).unwrap()
}

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("History");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_layout_50", |b| {
        // Grows with every iteration, which is what a long session does.
        let mut history = History::default();
        let layout = create_layout(50);
        b.iter(|| {
            history.set_layout(black_box(layout.clone()));
        })
    });

    group.bench_function("undo_redo_50", |b| {
        let mut history = History::default();
        for n in 0..100 {
            history.set_layout(create_layout(n % 50));
        }
        b.iter(|| {
            black_box(history.undo());
            black_box(history.redo());
        })
    });

    group.finish();
}

fn bench_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("Envelope");

    for size in [10usize, 50, 200] {
        let layout = create_layout(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("canonical_components_{size}"), |b| {
            b.iter(|| black_box(canonical_components(black_box(&layout))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_history, bench_canonical);
criterion_main!(benches);
