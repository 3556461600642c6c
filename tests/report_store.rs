//! Many sessions writing into one shared store.

mod common;

use common::benchmark_report;
use perfreport::measurement::{Report, ResultType, ResultUnit};
use perfreport::recorder::MeasurementRecorder;
use perfreport::store::{ReportKey, ReportStore};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;

fn score_report(score: f64) -> Report {
    let mut recorder = MeasurementRecorder::new();
    recorder
        .set_summary("Store:1", "Score", score, ResultType::HigherBetter, ResultUnit::Score)
        .expect("summary");
    recorder.finish()
}

fn summary_value(report: &Report) -> f64 {
    report.summary.as_ref().expect("summary").values[0]
}

#[test]
fn concurrent_sessions_keep_their_own_reports() {
    let store = Arc::new(ReportStore::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [("dev1#A#m1", 1.0), ("dev1#A#m2", 2.0)]
        .into_iter()
        .map(|(key, score)| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.put(key.parse().expect("key"), score_report(score));
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer join");
    }

    let m1: ReportKey = "dev1#A#m1".parse().expect("key");
    let m2: ReportKey = "dev1#A#m2".parse().expect("key");
    assert_eq!(summary_value(&store.take(&m1).expect("m1")), 1.0);
    assert_eq!(summary_value(&store.take(&m2).expect("m2")), 2.0);
    assert!(store.is_empty());
}

#[test]
fn many_writers_many_keys() {
    let store = Arc::new(ReportStore::new());
    let handles: Vec<_> = (0..8)
        .map(|session| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for method in 0..32 {
                    let key = ReportKey::new(format!("dev{session}"), "Suite", format!("m{method}"))
                        .expect("key");
                    store.put(key, score_report(f64::from(session * 100 + method)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer join");
    }

    assert_eq!(store.len(), 8 * 32);
    let key = ReportKey::new("dev3", "Suite", "m7").expect("key");
    assert_eq!(summary_value(&store.take(&key).expect("entry")), 307.0);
    assert_eq!(store.len(), 8 * 32 - 1);
}

#[test]
fn later_put_replaces_earlier_and_take_consumes_once() {
    let store = ReportStore::new();
    let key: ReportKey = "dev1#Suite#frames".parse().expect("key");

    store.put(key.clone(), score_report(1.0));
    store.put(key.clone(), benchmark_report());
    assert!(store.contains(&key));

    assert_eq!(store.take(&key), Some(benchmark_report()));
    assert_eq!(store.take(&key), None);
    assert!(!store.contains(&key));
}
