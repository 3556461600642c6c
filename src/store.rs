//! Process-wide, key-addressed holding area for finished reports.
//!
//! Producers `put` a report under the key of the test that produced it and a
//! single consumer later `take`s it, which removes the entry. The map is
//! sharded, so sessions working on unrelated keys do not contend on one lock.
//!
//! Callers must not race a `put` and a `take` on the same key; keys are
//! unique per live session/test pair by construction.

use crate::error::{Error, Result};
use crate::measurement::Report;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KEY_SEPARATOR: char = '#';

/// `<session>#<class>#<method>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportKey {
    session: String,
    class: String,
    method: String,
}

impl ReportKey {
    pub fn new(
        session: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> Result<Self> {
        let key = Self {
            session: session.into(),
            class: class.into(),
            method: method.into(),
        };
        for (name, part) in [
            ("session", &key.session),
            ("class", &key.class),
            ("method", &key.method),
        ] {
            if part.is_empty() {
                return Err(Error::invalid_input(format!("report key {name} is empty")));
            }
            if part.contains(KEY_SEPARATOR) {
                return Err(Error::invalid_input(format!(
                    "report key {name} '{part}' contains '{KEY_SEPARATOR}'"
                )));
            }
        }
        Ok(key)
    }

    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.session, self.class, self.method
        )
    }
}

impl FromStr for ReportKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(session), Some(class), Some(method), None) => Self::new(session, class, method),
            _ => Err(Error::invalid_input(format!(
                "report key '{s}' must have the form <session>#<class>#<method>"
            ))),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReportStore {
    entries: DashMap<ReportKey, Report>,
}

impl ReportStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `report` under `key`, replacing any report already there.
    pub fn put(&self, key: ReportKey, report: Report) {
        let replaced = self.entries.insert(key.clone(), report).is_some();
        tracing::trace!(
            event = "store.put",
            key = %key,
            replaced,
            "Report stored"
        );
    }

    /// Remove and return the report stored under `key`.
    pub fn take(&self, key: &ReportKey) -> Option<Report> {
        let taken = self.entries.remove(key).map(|(_, report)| report);
        tracing::trace!(
            event = "store.take",
            key = %key,
            hit = taken.is_some(),
            "Report taken"
        );
        taken
    }

    #[must_use]
    pub fn contains(&self, key: &ReportKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
