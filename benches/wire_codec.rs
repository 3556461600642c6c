//! Benchmarks for report encoding and decoding.
//!
//! Run with:
//! - `cargo bench --bench wire_codec`
//! - `cargo bench wire_decode`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use perfreport::measurement::{Extreme, Report, ResultType, ResultUnit};
use perfreport::recorder::MeasurementRecorder;
use perfreport::wire::{self, WireFormat};

const ROW_COUNTS: [usize; 3] = [1, 16, 128];
const VALUES_PER_ARRAY: usize = 120;

#[allow(clippy::cast_precision_loss)]
fn report_with_rows(rows: usize) -> Report {
    let mut recorder = MeasurementRecorder::new();
    recorder
        .set_summary("Bench:1", "Score", 1234.5, ResultType::HigherBetter, ResultUnit::Score)
        .expect("summary");
    for row in 0..rows {
        let values: Vec<f64> = (0..VALUES_PER_ARRAY)
            .map(|i| 16.0 + ((row * 31 + i * 7) % 13) as f64 * 0.25)
            .collect();
        recorder
            .add_values(
                format!("Bench:{row}"),
                format!("Frame Times {row}"),
                &values,
                ResultType::LowerBetter,
                ResultUnit::Ms,
                Extreme::Max,
            )
            .expect("values");
    }
    recorder.finish()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_encode");
    for rows in ROW_COUNTS {
        let report = report_with_rows(rows);
        group.throughput(Throughput::Elements(rows as u64));
        for format in [WireFormat::Legacy, WireFormat::Tagged] {
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), rows),
                &report,
                |b, report| b.iter(|| black_box(wire::encode(report, format))),
            );
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_decode");
    for rows in ROW_COUNTS {
        let report = report_with_rows(rows);
        group.throughput(Throughput::Elements(rows as u64));
        for format in [WireFormat::Legacy, WireFormat::Tagged] {
            let payload = wire::encode(&report, format).expect("encode");
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), rows),
                &payload,
                |b, payload| b.iter(|| black_box(wire::decode(payload))),
            );
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_encode, bench_decode
);
criterion_main!(benches);
