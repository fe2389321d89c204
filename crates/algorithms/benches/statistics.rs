//! Benchmarks for streaming statistic accumulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geoweights_algorithms::statistics::{run_from_reader, AutocorrelationEngine, StatisticKind};
use geoweights_core::feature::{AttributeValue, Feature, FeatureCollection};
use geoweights_core::io::{write_swm_to_buffer, SwmHeader, SwmReader};
use geoweights_core::weights::{normalize, NeighborRow, WeightType};

/// Rook adjacency on a square grid.
fn grid_rows(side: usize) -> Vec<NeighborRow> {
    (0..side * side)
        .map(|i| {
            let (x, y) = (i % side, i / side);
            let mut neighbors = Vec::with_capacity(4);
            if y > 0 {
                neighbors.push((i - side) as i32);
            }
            if x > 0 {
                neighbors.push(i as i32 - 1);
            }
            if x + 1 < side {
                neighbors.push(i as i32 + 1);
            }
            if y + 1 < side {
                neighbors.push((i + side) as i32);
            }
            normalize(NeighborRow::uniform(i as i32, neighbors, 1.0), true).row
        })
        .collect()
}

fn values(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 31) % 97) as f64 + 1.0).collect()
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");

    for side in [100, 300].iter() {
        let rows = grid_rows(*side);
        let n = side * side;
        let vals = values(n);
        for kind in [StatisticKind::MoransI, StatisticKind::GeneralG] {
            let id = BenchmarkId::new(kind.name(), n);
            group.bench_with_input(id, &n, |b, _| {
                b.iter(|| {
                    let mut engine =
                        AutocorrelationEngine::new(kind, (0..n as i32).collect(), vals.clone())
                            .unwrap();
                    for row in black_box(&rows) {
                        engine.accumulate(row).unwrap();
                    }
                    engine.finalize().unwrap()
                })
            });
        }
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_swm");

    let side = 200;
    let n = side * side;
    let header = SwmHeader::new("ID", WeightType::ContiguityEdgesOnly, n, true);
    let (buf, _) = write_swm_to_buffer(header, grid_rows(side)).unwrap();
    let fc: FeatureCollection = values(n)
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            Feature::new(i as i32, (i % side) as f64, (i / side) as f64)
                .with_property("v", AttributeValue::Float(v))
        })
        .collect();

    group.bench_function(BenchmarkId::from_parameter(n), |b| {
        b.iter(|| {
            let reader = SwmReader::new(black_box(buf.as_slice())).unwrap();
            run_from_reader(StatisticKind::MoransI, reader, &fc, "v", None).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_engine, bench_replay);
criterion_main!(benches);
