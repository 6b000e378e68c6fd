// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock transports for testing

use async_trait::async_trait;
use client_metrics::batch::{Batch, BatchKind};
use client_metrics::diagnostic::ClientMetric;
use client_metrics::error::TransportError;
use client_metrics::transport::{Ack, TransportClient};
use std::sync::Mutex;
use tokio::sync::Semaphore;

/// Mock transport that records every batch it is handed
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Batch>>,
    fail_kind: Option<BatchKind>,
}

impl RecordingTransport {
    /// Records everything but reports failure for batches of `kind`
    pub fn failing(kind: BatchKind) -> Self {
        Self {
            fail_kind: Some(kind),
            ..Default::default()
        }
    }

    fn record(&self, batch: Batch) -> Result<Ack, TransportError> {
        let ack = Ack {
            kind: batch.kind(),
            count: batch.len(),
        };
        self.batches.lock().unwrap().push(batch);
        if self.fail_kind == Some(ack.kind) {
            return Err(TransportError::Other("collector unreachable".to_string()));
        }
        Ok(ack)
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn kinds(&self) -> Vec<BatchKind> {
        self.batches().iter().map(Batch::kind).collect()
    }

    /// Names of each operational batch, in send order
    pub fn operational_names(&self) -> Vec<Vec<String>> {
        self.batches()
            .into_iter()
            .filter_map(|batch| match batch {
                Batch::Operational(records) => Some(
                    records
                        .iter()
                        .map(|record| record.name().to_string())
                        .collect(),
                ),
                Batch::Diagnostic(_) => None,
            })
            .collect()
    }

    pub fn diagnostic_batches(&self) -> Vec<Vec<ClientMetric>> {
        self.batches()
            .into_iter()
            .filter_map(|batch| match batch {
                Batch::Diagnostic(events) => Some(events),
                Batch::Operational(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl TransportClient for RecordingTransport {
    async fn send(&self, batch: Batch) -> Result<Ack, TransportError> {
        self.record(batch)
    }
}

/// Mock transport whose sends block until the test opens the gate
pub struct GatedTransport {
    gate: Semaphore,
    pub recorder: RecordingTransport,
}

impl GatedTransport {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            recorder: RecordingTransport::default(),
        }
    }

    pub fn open(&self, sends: usize) {
        self.gate.add_permits(sends);
    }
}

#[async_trait]
impl TransportClient for GatedTransport {
    async fn send(&self, batch: Batch) -> Result<Ack, TransportError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;
        self.recorder.record(batch)
    }
}
