// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Operational metric records.
//!
//! A [`MetricRecord`] is a named metric with a string key/value payload. Validity is decided once,
//! when the record is built, and never re-checked: records that fail the check are dropped by the
//! engine before they reach the buffer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

/// Key/value payload attached to an operational metric.
pub type Fields = BTreeMap<String, String>;

/// A single operational metric, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    #[serde(rename = "key")]
    name: String,
    /// Milliseconds since the Unix epoch at construction time
    timestamp: i64,
    #[serde(rename = "value")]
    fields: Fields,
    #[serde(skip)]
    valid: bool,
}

impl MetricRecord {
    /// Builds a record stamped with the current wall-clock time.
    ///
    /// # Examples
    ///
    /// ```
    /// use client_metrics::record::{Fields, MetricRecord};
    ///
    /// let fields = Fields::from([("outcome".to_string(), "ok".to_string())]);
    /// assert!(MetricRecord::new("call.setup", fields).is_valid());
    /// assert!(!MetricRecord::new("", Fields::new()).is_valid());
    /// ```
    pub fn new(name: impl Into<String>, fields: Fields) -> Self {
        Self::with_timestamp(name, fields, now_millis())
    }

    pub fn with_timestamp(name: impl Into<String>, fields: Fields, timestamp: i64) -> Self {
        let name = name.into();
        let valid = is_well_formed(&name, &fields);
        Self {
            name,
            timestamp,
            fields,
            valid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

// A record needs a non-blank name and at least one field.
fn is_well_formed(name: &str, fields: &Fields) -> bool {
    !name.trim().is_empty() && !fields.is_empty()
}

pub(crate) fn now_millis() -> i64 {
    UNIX_EPOCH
        .elapsed()
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
