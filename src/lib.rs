//! Performance report recording and transport for device test runs.
//!
//! A test records measurements into a [`MeasurementRecorder`], optionally
//! fed by a background [`SamplingDriver`] that watches frame timing, and
//! finishes them into a [`Report`]. [`ReportDelivery`] moves the report to
//! a host-side [`ReportStore`], either as an encoded payload through a
//! string-only channel or by a direct put, where a consumer collects it
//! exactly once.
#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod delivery;
pub mod error;
pub mod jank;
pub mod measurement;
pub mod recorder;
pub mod sampler;
pub mod stats;
pub mod store;
pub mod wire;

pub use cancel::CancellationToken;
pub use config::{PerfReportConfig, SamplingConfig};
pub use delivery::{METRICS_KEY, ReportDelivery};
pub use error::{Error, Result};
pub use measurement::{Extreme, Measurement, MeasurementKind, Report, ResultType, ResultUnit};
pub use recorder::MeasurementRecorder;
pub use sampler::{FrameTimingSource, SamplerState, SamplingDriver, SamplingOutcome};
pub use store::{ReportKey, ReportStore};
pub use wire::WireFormat;
