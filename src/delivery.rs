//! Getting a finished report from the test that produced it to the
//! consumer that collects it.
//!
//! Two paths exist:
//! - **Remote**: the test cannot reach the store. The encoded report is
//!   returned as [`Error::ReportToHost`] (or placed in a metrics map); the
//!   host-side relay decodes it and ingests it into the store.
//! - **Local**: the test shares a process with the store and puts the report
//!   directly.
//!
//! Either way the consumer calls [`ReportDelivery::collect`] exactly once.

use crate::config::PerfReportConfig;
use crate::error::{Error, Result};
use crate::measurement::Report;
use crate::store::{ReportKey, ReportStore};
use crate::wire::{self, WireFormat};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metrics-map key carrying the encoded report.
pub const METRICS_KEY: &str = "perfreport.result";

pub type Metrics = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct ReportDelivery {
    store: Arc<ReportStore>,
    format: WireFormat,
}

impl ReportDelivery {
    #[must_use]
    pub const fn new(store: Arc<ReportStore>, format: WireFormat) -> Self {
        Self { store, format }
    }

    #[must_use]
    pub const fn from_config(store: Arc<ReportStore>, config: &PerfReportConfig) -> Self {
        Self::new(store, config.wire_format)
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<ReportStore> {
        &self.store
    }

    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    // ------------------------------------------------------------------
    // Test side
    // ------------------------------------------------------------------

    /// Remote path. A non-empty report comes back as
    /// `Err(Error::ReportToHost { payload })`; an empty report is not
    /// transported and yields `Ok(())`. Encoding problems surface as their
    /// own errors.
    pub fn deliver_remote(&self, report: &Report) -> Result<()> {
        if report.is_empty() {
            tracing::debug!(event = "delivery.remote.skip", "Empty report not transported");
            return Ok(());
        }
        let payload = wire::encode(report, self.format)?;
        tracing::debug!(
            event = "delivery.remote",
            format = %self.format,
            bytes = payload.len(),
            "Report handed to host transport"
        );
        Err(Error::ReportToHost { payload })
    }

    /// Remote path through an instrumentation metrics map. Empty reports
    /// produce an empty map.
    pub fn to_metrics(&self, report: &Report) -> Result<Metrics> {
        let mut metrics = Metrics::new();
        if !report.is_empty() {
            metrics.insert(METRICS_KEY.to_string(), wire::encode(report, self.format)?);
        }
        Ok(metrics)
    }

    /// Local path: store the report under `key`, replacing any earlier one.
    pub fn deliver_local(&self, key: ReportKey, report: Report) {
        tracing::debug!(
            event = "delivery.local",
            key = %key,
            rows = report.details.len(),
            "Report stored locally"
        );
        self.store.put(key, report);
    }

    // ------------------------------------------------------------------
    // Host side
    // ------------------------------------------------------------------

    /// Decode the payload of a failure message produced by
    /// [`ReportDelivery::deliver_remote`].
    pub fn receive_failure(message: &str) -> Result<Report> {
        wire::decode(message.trim())
    }

    /// Decode the report in a metrics map, if there is one.
    pub fn receive_metrics(metrics: &Metrics) -> Result<Option<Report>> {
        metrics
            .get(METRICS_KEY)
            .map(|payload| wire::decode(payload))
            .transpose()
    }

    pub fn ingest_failure(&self, key: ReportKey, message: &str) -> Result<()> {
        let report = Self::receive_failure(message)?;
        self.store.put(key, report);
        Ok(())
    }

    /// Returns whether the map carried a report.
    pub fn ingest_metrics(&self, key: ReportKey, metrics: &Metrics) -> Result<bool> {
        match Self::receive_metrics(metrics)? {
            Some(report) => {
                self.store.put(key, report);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Triage a finished test body. A report transport is decoded and
    /// stored; genuine errors are passed back to the caller untouched.
    /// Returns whether a report was stored.
    pub fn ingest_outcome(&self, key: ReportKey, outcome: Result<()>) -> Result<bool> {
        match outcome {
            Ok(()) => Ok(false),
            Err(Error::ReportToHost { payload }) => {
                self.ingest_failure(key, &payload)?;
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------
    // Consumer side
    // ------------------------------------------------------------------

    /// Consume the report stored under `key`.
    pub fn collect(&self, key: &ReportKey) -> Result<Report> {
        self.store
            .take(key)
            .ok_or_else(|| Error::StoreMiss { key: key.clone() })
    }
}
