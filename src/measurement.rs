//! Measurement and report data model.

use crate::error::{Error, Result};
use crate::stats::{self, Summary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a reader should judge a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    #[default]
    Neutral,
    HigherBetter,
    LowerBetter,
}

impl ResultType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::HigherBetter => "higher_better",
            Self::LowerBetter => "lower_better",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultUnit {
    #[default]
    None,
    Ms,
    Us,
    Count,
    Score,
    Byte,
    Fps,
    Mbps,
}

impl ResultUnit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ms => "ms",
            Self::Us => "us",
            Self::Count => "count",
            Self::Score => "score",
            Self::Byte => "byte",
            Self::Fps => "fps",
            Self::Mbps => "mbps",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Scalar,
    Array,
}

impl MeasurementKind {
    /// Tag used by the legacy text format.
    #[must_use]
    pub const fn wire_tag(self) -> &'static str {
        match self {
            Self::Scalar => "d",
            Self::Array => "da",
        }
    }

    #[must_use]
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag {
            "d" => Some(Self::Scalar),
            "da" => Some(Self::Array),
            _ => None,
        }
    }
}

/// Which extreme an array measurement reports alongside its average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Min,
    Max,
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Min => "min",
            Self::Max => "max",
        })
    }
}

impl FromStr for Extreme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(Error::decode(format!("unknown extreme '{other}'"))),
        }
    }
}

/// Statistics embedded with an array measurement at record time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayStats {
    pub average: f64,
    pub extreme: Extreme,
    pub extreme_value: f64,
    pub stddev: f64,
}

impl ArrayStats {
    #[must_use]
    pub const fn from_summary(summary: &Summary, extreme: Extreme) -> Self {
        let extreme_value = match extreme {
            Extreme::Min => summary.min,
            Extreme::Max => summary.max,
        };
        Self {
            average: summary.mean,
            extreme,
            extreme_value,
            stddev: summary.stddev,
        }
    }

    /// Whether every field agrees with `other` within `tolerance`.
    #[must_use]
    pub fn agrees_with(&self, other: &Self, tolerance: f64) -> bool {
        self.extreme == other.extreme
            && (self.average - other.average).abs() <= tolerance
            && (self.extreme_value - other.extreme_value).abs() <= tolerance
            && (self.stddev - other.stddev).abs() <= tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub location: String,
    pub message: String,
    pub kind: MeasurementKind,
    pub values: Vec<f64>,
    #[serde(default)]
    pub result_type: ResultType,
    #[serde(default)]
    pub unit: ResultUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ArrayStats>,
}

impl Measurement {
    pub fn scalar(
        location: impl Into<String>,
        message: impl Into<String>,
        value: f64,
        result_type: ResultType,
        unit: ResultUnit,
    ) -> Result<Self> {
        ensure_finite(&[value])?;
        Ok(Self {
            location: location.into(),
            message: message.into(),
            kind: MeasurementKind::Scalar,
            values: vec![value],
            result_type,
            unit,
            stats: None,
        })
    }

    pub fn array(
        location: impl Into<String>,
        message: impl Into<String>,
        values: Vec<f64>,
        result_type: ResultType,
        unit: ResultUnit,
        extreme: Extreme,
    ) -> Result<Self> {
        ensure_finite(&values)?;
        let summary = stats::summarize(&values)?;
        Ok(Self {
            location: location.into(),
            message: message.into(),
            kind: MeasurementKind::Array,
            values,
            result_type,
            unit,
            stats: Some(ArrayStats::from_summary(&summary, extreme)),
        })
    }

    /// Recompute array statistics from the raw values.
    pub fn recompute_stats(&self) -> Result<Option<ArrayStats>> {
        let Some(embedded) = self.stats else {
            return Ok(None);
        };
        let summary = stats::summarize(&self.values)?;
        Ok(Some(ArrayStats::from_summary(&summary, embedded.extreme)))
    }

    /// Check structural invariants: scalars hold exactly one value, arrays
    /// hold at least one and carry statistics.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            MeasurementKind::Scalar if self.values.len() != 1 => {
                Err(Error::invalid_input(format!(
                    "scalar measurement '{}' has {} values",
                    self.message,
                    self.values.len()
                )))
            }
            MeasurementKind::Array if self.values.is_empty() => Err(Error::invalid_input(
                format!("array measurement '{}' has no values", self.message),
            )),
            MeasurementKind::Array if self.stats.is_none() => Err(Error::invalid_input(
                format!("array measurement '{}' has no statistics", self.message),
            )),
            _ => ensure_finite(&self.values),
        }
    }
}

/// All measurements produced by one test invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Measurement>,
    #[serde(default)]
    pub details: Vec<Measurement>,
}

impl Report {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.details.is_empty()
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.summary.iter().chain(self.details.iter())
    }

    /// Find the first detail row with the given message.
    #[must_use]
    pub fn detail(&self, message: &str) -> Option<&Measurement> {
        self.details.iter().find(|m| m.message == message)
    }

    pub fn validate(&self) -> Result<()> {
        self.measurements().try_for_each(Measurement::validate)
    }
}

fn ensure_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::invalid_input(format!(
            "value at index {index} is not finite: {}",
            values[index]
        ))),
        None => Ok(()),
    }
}
