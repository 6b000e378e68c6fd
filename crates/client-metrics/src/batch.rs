// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use derive_more::Display;
use serde::Serialize;

use crate::diagnostic::ClientMetric;
use crate::record::MetricRecord;

/// The two event classes kept apart all the way to the collector.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    #[display("operational")]
    Operational,
    #[display("diagnostic")]
    Diagnostic,
}

/// A drained queue, tagged with its kind so the two classes can never be merged.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Operational(Vec<MetricRecord>),
    Diagnostic(Vec<ClientMetric>),
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    metrics: &'a [T],
}

impl Batch {
    pub fn kind(&self) -> BatchKind {
        match self {
            Self::Operational(_) => BatchKind::Operational,
            Self::Diagnostic(_) => BatchKind::Diagnostic,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Operational(records) => records.len(),
            Self::Diagnostic(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the batch as the collector's `{"metrics": [...]}` body.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Operational(records) => serde_json::to_vec(&Envelope { metrics: records }),
            Self::Diagnostic(events) => serde_json::to_vec(&Envelope { metrics: events }),
        }
    }
}
