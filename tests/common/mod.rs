//! Common test infrastructure for `perfreport` integration tests.
//!
//! - Frame-timing fakes for driving the background sampler
//! - Report fixtures
//! - One-time tracing setup that writes through the test harness capture

use std::sync::OnceLock;

pub mod perf;

#[allow(unused_imports)]
pub use perf::{
    FailingSource, REFRESH_60HZ_NS, ScriptedFrameSource, benchmark_report, latency_dump,
    steady_frames,
};

/// Route `tracing` output into the per-test capture. `RUST_LOG` selects the
/// level; nothing is printed for passing tests.
#[allow(dead_code)]
pub fn init_test_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "perfreport=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
