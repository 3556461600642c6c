//! Frame-timing fakes and report fixtures shared by integration tests.
#![allow(dead_code)]

use perfreport::error::{Error, Result};
use perfreport::measurement::{Extreme, Report, ResultType, ResultUnit};
use perfreport::recorder::MeasurementRecorder;
use perfreport::sampler::FrameTimingSource;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const REFRESH_60HZ_NS: u64 = 16_666_666;

/// Latency-dump text for `timestamps_ns` in the three-column layout.
pub fn latency_dump(refresh_period_ns: u64, timestamps_ns: &[u64]) -> String {
    let mut text = format!("{refresh_period_ns}\n");
    for &ts in timestamps_ns {
        text.push_str(&format!("{} {ts} {}\n", ts.saturating_sub(1_000), ts + 1_000));
    }
    text
}

/// `count` evenly spaced timestamps starting at `start_ns`.
pub fn steady_frames(start_ns: u64, count: u64, period_ns: u64) -> Vec<u64> {
    (0..count).map(|i| start_ns + i * period_ns).collect()
}

/// Replays canned dumps; once exhausted, keeps returning an empty buffer.
#[derive(Debug, Default)]
pub struct ScriptedFrameSource {
    dumps: VecDeque<String>,
    refresh_period_ns: u64,
    clears: Arc<AtomicUsize>,
    dumps_taken: Arc<AtomicUsize>,
}

impl ScriptedFrameSource {
    pub fn new(refresh_period_ns: u64, dumps: impl IntoIterator<Item = String>) -> Self {
        Self {
            dumps: dumps.into_iter().collect(),
            refresh_period_ns,
            ..Self::default()
        }
    }

    /// Counter of `clear` calls, readable after the source moved to a thread.
    pub fn clear_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.clears)
    }

    pub fn dump_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dumps_taken)
    }
}

impl FrameTimingSource for ScriptedFrameSource {
    fn clear(&mut self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dump(&mut self) -> Result<String> {
        self.dumps_taken.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .dumps
            .pop_front()
            .unwrap_or_else(|| latency_dump(self.refresh_period_ns, &[])))
    }
}

/// Fails on the first dump.
#[derive(Debug)]
pub struct FailingSource {
    pub message: String,
}

impl FrameTimingSource for FailingSource {
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn dump(&mut self) -> Result<String> {
        Err(Error::sampling(self.message.clone()))
    }
}

/// One summary row plus a scalar and an array detail row.
pub fn benchmark_report() -> Report {
    let mut recorder = MeasurementRecorder::new();
    recorder
        .set_summary(
            "GlBenchmark:88",
            "Average Frame Rate",
            58.25,
            ResultType::HigherBetter,
            ResultUnit::Fps,
        )
        .expect("summary");
    recorder
        .add_value(
            "GlBenchmark:91",
            "Setup Time",
            12.5,
            ResultType::LowerBetter,
            ResultUnit::Ms,
        )
        .expect("scalar");
    recorder
        .add_values(
            "GlBenchmark:95",
            "Frame Times",
            &[16.0, 17.5, 15.25, 33.0],
            ResultType::LowerBetter,
            ResultUnit::Ms,
            Extreme::Max,
        )
        .expect("array");
    recorder.finish()
}
