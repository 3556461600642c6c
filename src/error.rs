//! Error types for report recording, transport and sampling.

use crate::store::ReportKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied values that cannot be recorded or encoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wire payload could not be decoded.
    #[error("transport decode error: {0}")]
    TransportDecode(String),

    /// No report is stored under the requested key.
    #[error("no report stored for {key}")]
    StoreMiss { key: ReportKey },

    /// The background sampling loop failed.
    #[error("sampling failed: {0}")]
    Sampling(String),

    /// The background sampling loop did not report back in time.
    #[error("sampling loop did not stop within {timeout_ms} ms")]
    JoinTimeout { timeout_ms: u64 },

    #[error("insufficient samples: required {required}, collected {collected}")]
    InsufficientSamples { required: usize, collected: usize },

    /// Out-of-band report transport. The payload is an encoded report, not
    /// an error description; receivers decode it.
    #[error("{payload}")]
    ReportToHost { payload: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::TransportDecode(message.into())
    }

    pub fn sampling(message: impl Into<String>) -> Self {
        Self::Sampling(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error is the deliberate report transport rather than a
    /// genuine failure.
    #[must_use]
    pub const fn is_report_transport(&self) -> bool {
        matches!(self, Self::ReportToHost { .. })
    }

    /// The encoded report carried by [`Error::ReportToHost`].
    #[must_use]
    pub fn report_payload(&self) -> Option<&str> {
        match self {
            Self::ReportToHost { payload } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_transport_displays_payload_verbatim() {
        let err = Error::ReportToHost {
            payload: "a|b|d|1".to_string(),
        };
        assert!(err.is_report_transport());
        assert_eq!(err.to_string(), "a|b|d|1");
        assert_eq!(err.report_payload(), Some("a|b|d|1"));
    }

    #[test]
    fn genuine_errors_carry_no_payload() {
        let err = Error::invalid_input("empty values");
        assert!(!err.is_report_transport());
        assert_eq!(err.report_payload(), None);
        assert_eq!(err.to_string(), "invalid input: empty values");
    }
}
