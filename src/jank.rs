//! Frame latency parsing and jank statistics.
//!
//! The latency buffer dump has the refresh period in nanoseconds on its
//! first line, followed by one row per frame with three whitespace-separated
//! columns: desired present time, actual present time, frame ready time.
//! Only the middle column is used. Rows whose timestamp is zero or the
//! pending-fence sentinel are frames that have not been presented yet.

use crate::error::{Error, Result};
use serde::Serialize;

pub const PENDING_FENCE_TIMESTAMP: i64 = i64::MAX;

/// Jitter below this many milliseconds is not counted by [`frame_jankiness`].
pub const DEFAULT_JANK_THRESHOLD_MS: f64 = 4.0;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyDump {
    pub refresh_period_ns: u64,
    pub present_timestamps_ns: Vec<u64>,
}

impl LatencyDump {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn refresh_period_ms(&self) -> f64 {
        self.refresh_period_ns as f64 / NANOS_PER_MILLI
    }
}

pub fn parse_latency_dump(text: &str) -> Result<LatencyDump> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let header = lines
        .next()
        .ok_or_else(|| Error::sampling("latency dump is empty"))?;
    let refresh_period_ns = header
        .parse::<u64>()
        .map_err(|err| Error::sampling(format!("invalid refresh period '{header}': {err}")))?;
    if refresh_period_ns == 0 {
        return Err(Error::sampling("refresh period is zero"));
    }

    let mut present_timestamps_ns = Vec::new();
    for line in lines {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() != 3 {
            continue;
        }
        let timestamp = columns[1].parse::<i64>().map_err(|err| {
            Error::sampling(format!("invalid frame timestamp '{}': {err}", columns[1]))
        })?;
        if timestamp == 0 || timestamp == PENDING_FENCE_TIMESTAMP {
            continue;
        }
        let timestamp = u64::try_from(timestamp)
            .map_err(|_| Error::sampling(format!("negative frame timestamp {timestamp}")))?;
        present_timestamps_ns.push(timestamp);
    }

    Ok(LatencyDump {
        refresh_period_ns,
        present_timestamps_ns,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JankStats {
    /// Number of interval deltas that rounded to at least one refresh period.
    pub jank_count: usize,
    /// Sum of all rounded per-delta jank magnitudes.
    pub total_jank: u64,
    pub jank_per_frame: Vec<u64>,
    pub frame_intervals_ms: Vec<f64>,
}

impl JankStats {
    /// Jank from consecutive frame intervals.
    ///
    /// Each delta between consecutive intervals is divided by the refresh
    /// period, floored at zero and rounded.
    pub fn from_intervals(intervals_ms: &[f64], refresh_period_ms: f64) -> Result<Self> {
        if !(refresh_period_ms.is_finite() && refresh_period_ms > 0.0) {
            return Err(Error::invalid_input(format!(
                "refresh period must be positive, got {refresh_period_ms}"
            )));
        }

        let jank_per_frame: Vec<u64> = intervals_ms
            .windows(2)
            .map(|pair| rounded_jank(pair[1] - pair[0], refresh_period_ms))
            .collect();

        Ok(Self {
            jank_count: jank_per_frame.iter().filter(|&&jank| jank > 0).count(),
            total_jank: jank_per_frame.iter().sum(),
            jank_per_frame,
            frame_intervals_ms: intervals_ms.to_vec(),
        })
    }

    pub fn from_timestamps_ns(timestamps_ns: &[u64], refresh_period_ns: u64) -> Result<Self> {
        #[allow(clippy::cast_precision_loss)]
        let refresh_period_ms = refresh_period_ns as f64 / NANOS_PER_MILLI;
        Self::from_intervals(&frame_intervals_ms(timestamps_ns), refresh_period_ms)
    }

    /// Fold in the stats of a later, disjoint sampling window.
    pub fn extend(&mut self, window: Self) {
        self.jank_count += window.jank_count;
        self.total_jank += window.total_jank;
        self.jank_per_frame.extend(window.jank_per_frame);
        self.frame_intervals_ms.extend(window.frame_intervals_ms);
    }
}

/// Milliseconds between consecutive timestamps.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn frame_intervals_ms(timestamps_ns: &[u64]) -> Vec<f64> {
    timestamps_ns
        .windows(2)
        .map(|pair| (pair[1] as f64 - pair[0] as f64) / NANOS_PER_MILLI)
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_jank(delta_ms: f64, refresh_period_ms: f64) -> u64 {
    (delta_ms / refresh_period_ms).max(0.0).round() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameJankiness {
    pub jank_count: usize,
    /// Adjusted delay per interval in ms; zero for on-time or caught-up frames.
    pub jankiness_ms: Vec<f64>,
    pub max_delay_ms: f64,
}

/// Threshold-based jank over frame intervals.
///
/// A late frame is not necessarily jank: the next frames may catch up the
/// accumulated delay. The first delay after an on-time frame always counts;
/// later ones count only if they remain off by more than `threshold_ms`
/// after accounting for the delay accumulated so far.
pub fn frame_jankiness(
    intervals_ms: &[f64],
    nominal_ms: f64,
    threshold_ms: f64,
) -> Result<FrameJankiness> {
    if !(nominal_ms.is_finite() && nominal_ms > 0.0) {
        return Err(Error::invalid_input(format!(
            "nominal frame interval must be positive, got {nominal_ms}"
        )));
    }
    if !(threshold_ms.is_finite() && threshold_ms >= 0.0) {
        return Err(Error::invalid_input(format!(
            "jank threshold must be non-negative, got {threshold_ms}"
        )));
    }

    let mut jank_count = 0;
    let mut max_delay_ms = 0.0_f64;
    let mut accumulated = 0.0_f64;
    let mut jankiness_ms = Vec::with_capacity(intervals_ms.len());

    for &interval in intervals_ms {
        let delay = interval - nominal_ms;
        if delay.abs() <= threshold_ms {
            jankiness_ms.push(0.0);
            accumulated = 0.0;
            continue;
        }

        let mut adjusted = delay;
        if accumulated == 0.0 {
            jank_count += 1;
        } else {
            let mut from_last_refresh =
                accumulated - (accumulated / nominal_ms).floor() * nominal_ms;
            if accumulated < 0.0 {
                from_last_refresh -= nominal_ms;
            }
            adjusted = delay + from_last_refresh;
            if adjusted.abs() > threshold_ms {
                jank_count += 1;
            } else {
                adjusted = 0.0;
                accumulated = 0.0;
            }
        }
        accumulated += delay;
        max_delay_ms = max_delay_ms.max(adjusted);
        jankiness_ms.push(adjusted);
    }

    Ok(FrameJankiness {
        jank_count,
        jankiness_ms,
        max_delay_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    #[test]
    fn constant_intervals_have_no_jank() {
        let timestamps: Vec<u64> = (0..10).map(|i| 1_000 * MS + i * 16 * MS).collect();
        let stats = JankStats::from_timestamps_ns(&timestamps, 16 * MS).expect("stats");
        assert_eq!(stats.jank_count, 0);
        assert_eq!(stats.total_jank, 0);
        assert_eq!(stats.frame_intervals_ms.len(), 9);
    }

    #[test]
    fn one_long_interval_is_one_jank_of_magnitude_one() {
        let stats =
            JankStats::from_intervals(&[16.0, 16.0, 32.0, 16.0, 16.0], 16.0).expect("stats");
        assert_eq!(stats.jank_count, 1);
        assert_eq!(stats.total_jank, 1);
        assert_eq!(stats.jank_per_frame, vec![0, 1, 0, 0]);
    }

    #[test]
    fn small_jitter_rounds_away() {
        let stats = JankStats::from_intervals(&[16.0, 19.0, 16.0], 16.0).expect("stats");
        assert_eq!(stats.jank_count, 0);
    }

    #[test]
    fn windows_fold_without_a_cross_window_interval() {
        let mut total = JankStats::from_intervals(&[16.0, 32.0], 16.0).expect("first");
        total.extend(JankStats::from_intervals(&[16.0, 16.0, 48.0], 16.0).expect("second"));
        assert_eq!(total.jank_count, 2);
        assert_eq!(total.total_jank, 3);
        assert_eq!(total.frame_intervals_ms.len(), 5);
        assert_eq!(total.jank_per_frame, vec![1, 0, 2]);
    }

    #[test]
    fn zero_refresh_period_is_rejected() {
        assert!(JankStats::from_intervals(&[16.0, 16.0], 0.0).is_err());
    }

    #[test]
    fn parses_latency_dump_skipping_pending_frames() {
        let dump = format!(
            "16666666\n\n0 0 0\n1 1000 2\n3 {PENDING_FENCE_TIMESTAMP} 4\n5 2000 6\ngarbage\n"
        );
        let parsed = parse_latency_dump(&dump).expect("dump");
        assert_eq!(parsed.refresh_period_ns, 16_666_666);
        assert_eq!(parsed.present_timestamps_ns, vec![1000, 2000]);
        assert!((parsed.refresh_period_ms() - 16.666_666).abs() < 1e-9);
    }

    #[test]
    fn malformed_dumps_are_sampling_failures() {
        for dump in ["", "not-a-number\n", "0\n", "16666666\n1 x 2\n"] {
            let err = parse_latency_dump(dump).unwrap_err();
            assert!(matches!(err, Error::Sampling(_)), "{dump:?}: {err}");
        }
    }

    #[test]
    fn first_delay_counts_as_jank() {
        let result = frame_jankiness(&[16.0, 16.0, 33.0, 16.0], 16.0, DEFAULT_JANK_THRESHOLD_MS)
            .expect("jankiness");
        assert_eq!(result.jank_count, 1);
        assert!((result.max_delay_ms - 17.0).abs() < f64::EPSILON);
        assert_eq!(result.jankiness_ms, vec![0.0, 0.0, 17.0, 0.0]);
    }

    #[test]
    fn caught_up_frames_are_not_jank() {
        let result = frame_jankiness(&[16.0, 26.0, 6.0, 16.0], 16.0, DEFAULT_JANK_THRESHOLD_MS)
            .expect("jankiness");
        assert_eq!(result.jank_count, 1);
        assert_eq!(result.jankiness_ms, vec![0.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn jankiness_needs_a_positive_nominal_interval() {
        for nominal in [0.0, -16.0, f64::NAN] {
            let err = frame_jankiness(&[16.0, 40.0], nominal, DEFAULT_JANK_THRESHOLD_MS).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{nominal}: {err}");
        }
        let err = frame_jankiness(&[16.0], 16.0, -1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err}");
    }
}
