//! Benchmarks the full `analyze` pipeline over synthetic ledgers of
//! increasing size, including a ring-heavy batch to stress the detectors'
//! caps rather than just their happy path.

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal_macros::dec;

use fraud_forensics_engine::{analyze, DetectionConfig, Transaction};

/// A chain of independent triangles, `A0->B0->C0->A0, A1->B1->C1->A1, ...`,
/// so cycle enumeration and ring consolidation both have real work to do.
fn synthetic_ledger(triangles: usize) -> Vec<Transaction> {
    let base = Utc::now();
    let mut txs = Vec::with_capacity(triangles * 3);
    for i in 0..triangles {
        let a = format!("A{i}");
        let b = format!("B{i}");
        let c = format!("C{i}");
        txs.push(Transaction::new(format!("t{i}-0"), a.clone(), b.clone(), dec!(100), base + Duration::hours(0)));
        txs.push(Transaction::new(format!("t{i}-1"), b, c.clone(), dec!(100), base + Duration::hours(1)));
        txs.push(Transaction::new(format!("t{i}-2"), c, a, dec!(100), base + Duration::hours(2)));
    }
    txs
}

fn bench_analyze(c: &mut Criterion) {
    let config = DetectionConfig::default();
    let mut group = c.benchmark_group("analyze");
    for triangles in [10, 100, 1_000] {
        let ledger = synthetic_ledger(triangles);
        group.bench_with_input(BenchmarkId::from_parameter(triangles), &ledger, |b, ledger| {
            b.iter(|| analyze(ledger, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
