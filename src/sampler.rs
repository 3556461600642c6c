//! Background frame-timing sampler.
//!
//! A [`SamplingDriver`] owns one thread that repeatedly clears the external
//! frame-timing buffer, waits one sample interval, dumps the buffer and
//! accumulates the newly presented frame timestamps. The loop stops once
//! enough timestamps are collected or when [`SamplingDriver::finish`] cancels
//! it. Its terminal result travels back over a channel; `finish` waits on
//! that channel with a bounded timeout before joining the thread.
//!
//! ```text
//! Created --start--> Running --finish--> Stopping --> Stopped
//!                       |                    |
//!                       +-------error--------+--> Failed
//! ```

use crate::cancel::CancellationToken;
use crate::config::SamplingConfig;
use crate::error::{Error, Result};
use crate::jank::{JankStats, parse_latency_dump};
use crate::measurement::{Extreme, ResultType, ResultUnit};
use crate::recorder::MeasurementRecorder;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// External frame-timing buffer, e.g. a compositor latency dump.
pub trait FrameTimingSource: Send {
    /// Discard frames recorded so far.
    fn clear(&mut self) -> Result<()>;

    /// Current buffer contents in latency-dump text form.
    fn dump(&mut self) -> Result<String>;
}

impl<S: FrameTimingSource + ?Sized> FrameTimingSource for Box<S> {
    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn dump(&mut self) -> Result<String> {
        (**self).dump()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Created,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl SamplerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOutcome {
    /// Presented frame timestamps in ns, strictly increasing.
    pub timestamps_ns: Vec<u64>,
    /// Refresh period reported by the most recent dump.
    pub refresh_period_ns: Option<u64>,
    pub jank: JankStats,
    /// Completed clear/wait/dump cycles.
    pub iterations: usize,
}

impl SamplingOutcome {
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.timestamps_ns.len()
    }

    /// Fail with [`Error::InsufficientSamples`] if fewer than `required`
    /// timestamps were collected.
    pub fn require_samples(self, required: usize) -> Result<Self> {
        let collected = self.sample_count();
        if collected < required {
            return Err(Error::InsufficientSamples {
                required,
                collected,
            });
        }
        Ok(self)
    }

    /// Record jank count, total jank and frame intervals.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_into(&self, recorder: &mut MeasurementRecorder, location: &str) -> Result<()> {
        recorder.add_value(
            location,
            "Num Janks",
            self.jank.jank_count as f64,
            ResultType::LowerBetter,
            ResultUnit::Count,
        )?;
        recorder.add_value(
            location,
            "Total Jank",
            self.jank.total_jank as f64,
            ResultType::LowerBetter,
            ResultUnit::Count,
        )?;
        if !self.jank.frame_intervals_ms.is_empty() {
            recorder.add_values(
                location,
                "Frame Intervals",
                &self.jank.frame_intervals_ms,
                ResultType::LowerBetter,
                ResultUnit::Ms,
                Extreme::Max,
            )?;
        }
        Ok(())
    }
}

struct Running {
    token: CancellationToken,
    outcome_rx: Receiver<Result<SamplingOutcome>>,
    thread: JoinHandle<()>,
    started_at: Instant,
}

pub struct SamplingDriver {
    config: SamplingConfig,
    state: Arc<Mutex<SamplerState>>,
    source: Option<Box<dyn FrameTimingSource>>,
    running: Option<Running>,
}

impl std::fmt::Debug for SamplingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingDriver")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SamplingDriver {
    pub fn new(source: impl FrameTimingSource + 'static, config: SamplingConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SamplerState::Created)),
            source: Some(Box::new(source)),
            running: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SamplerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Spawn the sampling thread. A driver can be started once.
    pub fn start(&mut self) -> Result<()> {
        let Some(mut source) = self.source.take() else {
            return Err(Error::sampling(format!(
                "sampler cannot start from state {}",
                self.state().as_str()
            )));
        };

        let token = CancellationToken::new();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let config = self.config.clone();
        let loop_token = token.clone();
        let loop_state = Arc::clone(&self.state);

        set_state(&self.state, SamplerState::Running);
        let spawned = thread::Builder::new()
            .name("perfreport-sampler".to_string())
            .spawn(move || {
                let result = sample_until_done(&mut *source, &config, &loop_token);
                if let Err(err) = &result {
                    set_state(&loop_state, SamplerState::Failed);
                    tracing::debug!(
                        event = "sampler.loop.failed",
                        error = %err,
                        "Sampling loop ended with an error"
                    );
                }
                // The receiver is gone only if the driver was dropped.
                let _ = outcome_tx.send(result);
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                set_state(&self.state, SamplerState::Failed);
                return Err(err.into());
            }
        };

        tracing::info!(
            event = "sampler.start",
            sample_interval_ms = self.config.sample_interval_ms,
            required_samples = self.config.required_samples,
            "Frame sampling started"
        );
        self.running = Some(Running {
            token,
            outcome_rx,
            thread,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Cancel the loop, wait for its result and join the thread.
    ///
    /// Returns the loop's own error if it failed, or [`Error::JoinTimeout`]
    /// if it did not report within the configured join timeout.
    pub fn finish(&mut self) -> Result<SamplingOutcome> {
        let Some(running) = self.running.take() else {
            return Err(Error::sampling(format!(
                "sampler cannot finish from state {}",
                self.state().as_str()
            )));
        };

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == SamplerState::Running {
                *state = SamplerState::Stopping;
            }
        }
        running.token.cancel();

        let timeout = self.config.join_timeout();
        let result = match running.outcome_rx.recv_timeout(timeout) {
            Ok(result) => {
                if running.thread.join().is_err() {
                    Err(Error::sampling("sampling thread panicked after reporting"))
                } else {
                    result
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    event = "sampler.join.timeout",
                    timeout_ms = self.config.join_timeout_ms,
                    "Sampling loop did not stop in time; detaching thread"
                );
                Err(Error::JoinTimeout {
                    timeout_ms: self.config.join_timeout_ms,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = running.thread.join();
                Err(Error::sampling("sampling thread exited without reporting"))
            }
        };

        let terminal = if result.is_ok() {
            SamplerState::Stopped
        } else {
            SamplerState::Failed
        };
        set_state(&self.state, terminal);

        let elapsed_ms = u64::try_from(running.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(outcome) => tracing::info!(
                event = "sampler.finish",
                samples = outcome.sample_count(),
                iterations = outcome.iterations,
                jank_count = outcome.jank.jank_count,
                elapsed_ms,
                "Frame sampling finished"
            ),
            Err(err) => tracing::info!(
                event = "sampler.finish",
                error = %err,
                elapsed_ms,
                "Frame sampling failed"
            ),
        }
        result
    }
}

impl Drop for SamplingDriver {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.token.cancel();
        }
    }
}

fn set_state(state: &Mutex<SamplerState>, next: SamplerState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

fn sample_until_done(
    source: &mut dyn FrameTimingSource,
    config: &SamplingConfig,
    token: &CancellationToken,
) -> Result<SamplingOutcome> {
    let mut outcome = SamplingOutcome::default();

    while outcome.sample_count() < config.required_samples && !token.is_cancelled() {
        source.clear()?;
        if token.wait_timeout(config.sample_interval()) {
            // Cancelled mid-wait: the partial window is discarded.
            break;
        }
        let dump = parse_latency_dump(&source.dump()?)?;
        outcome.iterations += 1;

        let last_seen = outcome.timestamps_ns.last().copied();
        let fresh: Vec<u64> = dump
            .present_timestamps_ns
            .into_iter()
            .filter(|&ts| last_seen.is_none_or(|last| ts > last))
            .collect();
        let window = JankStats::from_timestamps_ns(&fresh, dump.refresh_period_ns)?;

        tracing::debug!(
            event = "sampler.iteration",
            iteration = outcome.iterations,
            new_frames = fresh.len(),
            window_janks = window.jank_count,
            "Frame timing sampled"
        );

        outcome.refresh_period_ns = Some(dump.refresh_period_ns);
        outcome.jank.extend(window);
        outcome.timestamps_ns.extend(fresh);
    }

    if token.is_cancelled() && outcome.sample_count() < config.required_samples {
        tracing::warn!(
            event = "sampler.cancelled",
            samples = outcome.sample_count(),
            required = config.required_samples,
            "Sampling cancelled before enough frames were collected"
        );
    }
    Ok(outcome)
}
