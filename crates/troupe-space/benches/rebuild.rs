//! Per-tick rebuild and query cost of the spatial index.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use troupe_core::{Aabb, ActorId, Vec2};
use troupe_space::{SpatialIndex, SquareRegion};

fn scattered_boxes(n: u32) -> Vec<(ActorId, Aabb)> {
    // Deterministic scatter; no RNG so runs are comparable.
    (0..n)
        .map(|i| {
            let x = (i as f64 * 97.0) % 980.0;
            let y = (i as f64 * 57.0) % 980.0;
            (
                ActorId::from_parts(i, 0),
                Aabb::from_origin_size(Vec2::new(x, y), 12.0, 12.0),
            )
        })
        .collect()
}

fn bench_rebuild(c: &mut Criterion) {
    let region = SquareRegion::new(Vec2::ZERO, 1000.0);
    for n in [100u32, 1000, 5000] {
        let boxes = scattered_boxes(n);
        c.bench_function(&format!("rebuild_{n}"), |b| {
            b.iter(|| {
                let mut index = SpatialIndex::new(region, 10, 100.0);
                for &(id, rect) in &boxes {
                    index.insert(id, rect);
                }
                black_box(index.leaf_count())
            })
        });
    }
}

fn bench_query(c: &mut Criterion) {
    let region = SquareRegion::new(Vec2::ZERO, 1000.0);
    let boxes = scattered_boxes(5000);
    let mut index = SpatialIndex::new(region, 10, 100.0);
    for &(id, rect) in &boxes {
        index.insert(id, rect);
    }
    let probe = Aabb::from_origin_size(Vec2::new(400.0, 400.0), 100.0, 100.0);
    c.bench_function("query_5000", |b| {
        b.iter(|| black_box(index.query(&probe)).len())
    });
}

criterion_group!(benches, bench_rebuild, bench_query);
criterion_main!(benches);
