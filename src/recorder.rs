//! Per-invocation accumulator of named measurements.
//!
//! A recorder is owned by the test that creates it. Once the test is done it
//! calls [`MeasurementRecorder::finish`] and hands the resulting [`Report`]
//! to the delivery layer.

use crate::error::Result;
use crate::measurement::{Extreme, Measurement, Report, ResultType, ResultUnit};

/// Identity of the calling code as `module::path:line`.
///
/// Locations are always explicit parameters to the recorder; this macro is a
/// convenience for callers that have no better identity at hand.
#[macro_export]
macro_rules! call_site {
    () => {
        concat!(module_path!(), ":", line!())
    };
}

#[derive(Debug, Default)]
pub struct MeasurementRecorder {
    summary: Option<Measurement>,
    details: Vec<Measurement>,
}

impl MeasurementRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-value measurement.
    pub fn add_value(
        &mut self,
        location: impl Into<String>,
        message: impl Into<String>,
        value: f64,
        result_type: ResultType,
        unit: ResultUnit,
    ) -> Result<()> {
        let measurement = Measurement::scalar(location, message, value, result_type, unit)?;
        tracing::debug!(
            event = "recorder.value",
            location = %measurement.location,
            message = %measurement.message,
            value,
            unit = unit.as_str(),
            "Recorded value"
        );
        self.details.push(measurement);
        Ok(())
    }

    /// Append an array measurement. Average, the requested extreme and
    /// standard deviation are computed now and stored with the raw values.
    pub fn add_values(
        &mut self,
        location: impl Into<String>,
        message: impl Into<String>,
        values: &[f64],
        result_type: ResultType,
        unit: ResultUnit,
        extreme: Extreme,
    ) -> Result<()> {
        let measurement = Measurement::array(
            location,
            message,
            values.to_vec(),
            result_type,
            unit,
            extreme,
        )?;
        if let Some(stats) = measurement.stats {
            tracing::debug!(
                event = "recorder.values",
                location = %measurement.location,
                message = %measurement.message,
                count = values.len(),
                average = stats.average,
                extreme = %stats.extreme,
                extreme_value = stats.extreme_value,
                stddev = stats.stddev,
                unit = unit.as_str(),
                "Recorded value array"
            );
        }
        self.details.push(measurement);
        Ok(())
    }

    /// Set the report summary. A second call replaces the first.
    pub fn set_summary(
        &mut self,
        location: impl Into<String>,
        message: impl Into<String>,
        value: f64,
        result_type: ResultType,
        unit: ResultUnit,
    ) -> Result<()> {
        let measurement = Measurement::scalar(location, message, value, result_type, unit)?;
        if let Some(previous) = self.summary.replace(measurement) {
            tracing::warn!(
                event = "recorder.summary.overwrite",
                previous = %previous.message,
                "Report summary overwritten"
            );
        }
        Ok(())
    }

    #[must_use]
    pub const fn summary(&self) -> Option<&Measurement> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn details(&self) -> &[Measurement] {
        &self.details
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.details.is_empty()
    }

    /// Consume the recorder and produce its report.
    #[must_use]
    pub fn finish(self) -> Report {
        Report {
            summary: self.summary,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::measurement::MeasurementKind;

    #[test]
    fn details_keep_insertion_order() {
        let mut recorder = MeasurementRecorder::new();
        recorder
            .add_value("t:1", "first", 1.0, ResultType::Neutral, ResultUnit::Count)
            .expect("value");
        recorder
            .add_values(
                "t:2",
                "second",
                &[1.0, 2.0],
                ResultType::LowerBetter,
                ResultUnit::Ms,
                Extreme::Min,
            )
            .expect("values");
        recorder
            .add_value("t:3", "third", 3.0, ResultType::HigherBetter, ResultUnit::Score)
            .expect("value");

        let report = recorder.finish();
        let messages: Vec<_> = report.details.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(report.details[1].kind, MeasurementKind::Array);
        assert!(report.summary.is_none());
    }

    #[test]
    fn empty_array_is_rejected_and_not_recorded() {
        let mut recorder = MeasurementRecorder::new();
        let err = recorder
            .add_values("t", "none", &[], ResultType::Neutral, ResultUnit::Ms, Extreme::Max)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(recorder.is_empty());
    }

    #[test]
    fn second_summary_overwrites_first() {
        let mut recorder = MeasurementRecorder::new();
        recorder
            .set_summary("t", "Score", 1.0, ResultType::HigherBetter, ResultUnit::Score)
            .expect("summary");
        recorder
            .set_summary("t", "Score v2", 2.0, ResultType::HigherBetter, ResultUnit::Score)
            .expect("summary");
        let summary = recorder.summary().expect("summary set");
        assert_eq!(summary.message, "Score v2");
        assert_eq!(summary.values, vec![2.0]);
    }

    #[test]
    fn call_site_names_module_and_line() {
        let site = call_site!();
        assert!(site.starts_with("perfreport::recorder::tests:"), "{site}");
    }
}
