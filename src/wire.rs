//! Text encodings for moving a [`Report`] through a string-only channel.
//!
//! Two formats are supported:
//!
//! - **Legacy**: `location|message|kind|payload` rows joined by `+++`, with
//!   an optional leading summary row terminated by `++++`. Array rows embed
//!   `average <m> min|max <x> stddev <s>` after the raw values. Result type
//!   and unit are not carried.
//! - **Tagged**: a JSON envelope with a schema tag and a SHA-256 of the
//!   report body. Every measurement field travels, and embedded statistics
//!   are checked against the raw values on decode.
//!
//! [`decode`] accepts either and picks by the first non-blank character.

use crate::error::{Error, Result};
use crate::measurement::{ArrayStats, Measurement, MeasurementKind, Report, ResultType, ResultUnit};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::OnceLock;

pub const ROW_SEPARATOR: &str = "+++";
pub const SUMMARY_SEPARATOR: &str = "++++";
pub const FIELD_SEPARATOR: char = '|';
pub const TAGGED_SCHEMA: &str = "perfreport.wire.v2";

const STATS_TOLERANCE: f64 = 1e-9;

static LEGACY_STATS_REGEX: OnceLock<Regex> = OnceLock::new();

fn legacy_stats_regex() -> &'static Regex {
    LEGACY_STATS_REGEX.get_or_init(|| {
        Regex::new(r"^average\s+(\S+)\s+(min|max)\s+(\S+)\s+stddev\s+(\S+)$")
            .expect("legacy stats regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    Legacy,
    #[default]
    Tagged,
}

impl WireFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" | "v1" | "text" => Some(Self::Legacy),
            "tagged" | "v2" | "json" => Some(Self::Tagged),
            _ => None,
        }
    }
}

impl FromStr for WireFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::config(format!("unknown wire format '{s}'")))
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Tagged => "tagged",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaggedEnvelope {
    schema: String,
    encoded_at: String,
    payload_sha256: String,
    report: Report,
}

pub fn encode(report: &Report, format: WireFormat) -> Result<String> {
    match format {
        WireFormat::Legacy => encode_legacy(report),
        WireFormat::Tagged => encode_tagged(report),
    }
}

pub fn decode(payload: &str) -> Result<Report> {
    if payload.trim_start().starts_with('{') {
        decode_tagged(payload)
    } else {
        decode_legacy(payload)
    }
}

pub fn encode_legacy(report: &Report) -> Result<String> {
    let mut out = String::new();
    if let Some(summary) = &report.summary {
        out.push_str(&encode_legacy_row(summary)?);
        out.push_str(SUMMARY_SEPARATOR);
    }
    let rows = report
        .details
        .iter()
        .map(encode_legacy_row)
        .collect::<Result<Vec<_>>>()?;
    out.push_str(&rows.join(ROW_SEPARATOR));
    Ok(out)
}

fn encode_legacy_row(measurement: &Measurement) -> Result<String> {
    measurement.validate()?;
    check_legacy_field("location", &measurement.location)?;
    check_legacy_field("message", &measurement.message)?;

    let mut row = format!(
        "{loc}{sep}{msg}{sep}{kind}{sep}",
        loc = measurement.location,
        msg = measurement.message,
        kind = measurement.kind.wire_tag(),
        sep = FIELD_SEPARATOR,
    );
    match (measurement.kind, measurement.stats) {
        (MeasurementKind::Scalar, _) => {
            let _ = write!(row, "{}", measurement.values[0]);
        }
        (MeasurementKind::Array, Some(stats)) => {
            let values = measurement
                .values
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                row,
                "{values}{FIELD_SEPARATOR}average {} {} {} stddev {}",
                stats.average, stats.extreme, stats.extreme_value, stats.stddev
            );
        }
        (MeasurementKind::Array, None) => {
            return Err(Error::invalid_input(format!(
                "array measurement '{}' has no statistics",
                measurement.message
            )));
        }
    }
    Ok(row)
}

fn check_legacy_field(name: &str, value: &str) -> Result<()> {
    if value.contains(FIELD_SEPARATOR) || value.contains('+') {
        return Err(Error::invalid_input(format!(
            "{name} '{value}' contains a reserved separator character ('|' or '+')"
        )));
    }
    // A leading '{' would make `decode` take the payload for a tagged one,
    // and receivers trim the payload ends.
    if value.starts_with('{') || value.trim() != value {
        return Err(Error::invalid_input(format!(
            "{name} '{value}' may not start with '{{' or have surrounding whitespace"
        )));
    }
    Ok(())
}

pub fn decode_legacy(payload: &str) -> Result<Report> {
    let (summary_row, rows) = match payload.split_once(SUMMARY_SEPARATOR) {
        Some((summary, rest)) => (Some(summary), rest),
        None => (None, payload),
    };

    let summary = summary_row.map(decode_legacy_row).transpose()?;
    let details = if rows.is_empty() {
        Vec::new()
    } else {
        rows.split(ROW_SEPARATOR)
            .map(decode_legacy_row)
            .collect::<Result<Vec<_>>>()?
    };
    Ok(Report { summary, details })
}

fn decode_legacy_row(row: &str) -> Result<Measurement> {
    let fields: Vec<&str> = row.split(FIELD_SEPARATOR).collect();
    let kind = fields
        .get(2)
        .and_then(|tag| MeasurementKind::from_wire_tag(tag))
        .ok_or_else(|| Error::decode(format!("row has no valid kind field: '{row}'")))?;

    let expected_fields = match kind {
        MeasurementKind::Scalar => 4,
        MeasurementKind::Array => 5,
    };
    if fields.len() != expected_fields {
        return Err(Error::decode(format!(
            "{} row must have {expected_fields} fields, found {}: '{row}'",
            kind.wire_tag(),
            fields.len()
        )));
    }

    let (values, stats) = match kind {
        MeasurementKind::Scalar => (vec![parse_number(fields[3])?], None),
        MeasurementKind::Array => {
            let values = fields[3]
                .split_whitespace()
                .map(parse_number)
                .collect::<Result<Vec<_>>>()?;
            if values.is_empty() {
                return Err(Error::decode(format!("array row has no values: '{row}'")));
            }
            (values, Some(parse_legacy_stats(fields[4])?))
        }
    };

    Ok(Measurement {
        location: fields[0].to_string(),
        message: fields[1].to_string(),
        kind,
        values,
        result_type: ResultType::Neutral,
        unit: ResultUnit::None,
        stats,
    })
}

fn parse_legacy_stats(text: &str) -> Result<ArrayStats> {
    let captures = legacy_stats_regex()
        .captures(text.trim())
        .ok_or_else(|| Error::decode(format!("malformed array statistics: '{text}'")))?;
    Ok(ArrayStats {
        average: parse_number(&captures[1])?,
        extreme: captures[2].parse()?,
        extreme_value: parse_number(&captures[3])?,
        stddev: parse_number(&captures[4])?,
    })
}

fn parse_number(text: &str) -> Result<f64> {
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|err| Error::decode(format!("invalid number '{text}': {err}")))?;
    if !value.is_finite() {
        return Err(Error::decode(format!("non-finite number '{text}'")));
    }
    Ok(value)
}

pub fn encode_tagged(report: &Report) -> Result<String> {
    report.validate()?;
    let envelope = TaggedEnvelope {
        schema: TAGGED_SCHEMA.to_string(),
        encoded_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        payload_sha256: report_hash(report)?,
        report: report.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode_tagged(payload: &str) -> Result<Report> {
    let envelope: TaggedEnvelope = serde_json::from_str(payload)
        .map_err(|err| Error::decode(format!("malformed tagged payload: {err}")))?;
    if envelope.schema != TAGGED_SCHEMA {
        return Err(Error::decode(format!(
            "unsupported schema '{}', expected '{TAGGED_SCHEMA}'",
            envelope.schema
        )));
    }

    let actual = report_hash(&envelope.report)?;
    if actual != envelope.payload_sha256 {
        return Err(Error::decode(format!(
            "payload hash mismatch: expected={} actual={actual}",
            envelope.payload_sha256
        )));
    }

    envelope
        .report
        .validate()
        .map_err(|err| Error::decode(err.to_string()))?;
    verify_stats(&envelope.report)?;
    Ok(envelope.report)
}

/// Recompute every array measurement's statistics from its raw values and
/// fail if any embedded figure disagrees.
pub fn verify_stats(report: &Report) -> Result<()> {
    for measurement in report.measurements() {
        let (Some(embedded), Some(recomputed)) = (
            measurement.stats,
            measurement
                .recompute_stats()
                .map_err(|err| Error::decode(err.to_string()))?,
        ) else {
            continue;
        };
        let scale = measurement
            .values
            .iter()
            .fold(1.0_f64, |acc, v| acc.max(v.abs()));
        if !embedded.agrees_with(&recomputed, STATS_TOLERANCE * scale) {
            return Err(Error::decode(format!(
                "statistics for '{}' disagree with raw values: embedded={embedded:?} recomputed={recomputed:?}",
                measurement.message
            )));
        }
    }
    Ok(())
}

fn report_hash(report: &Report) -> Result<String> {
    let bytes = serde_json::to_vec(report)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
