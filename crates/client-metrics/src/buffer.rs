// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dual-queue event buffer.
//!
//! Operational records and diagnostic events live in separate FIFO queues, each behind its own
//! lock. A drain swaps the whole queue out under the lock, so a record is observed by exactly one
//! drain even when a timer flush and a threshold flush race.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::batch::{Batch, BatchKind};
use crate::diagnostic::ClientMetric;
use crate::record::MetricRecord;

#[derive(Debug, Default)]
pub struct EventBuffer {
    operational: Mutex<Vec<MetricRecord>>,
    diagnostic: Mutex<Vec<ClientMetric>>,
}

// A panic while holding the lock cannot leave a Vec half-pushed, so the data is still usable.
fn lock<T>(queue: &Mutex<T>) -> MutexGuard<'_, T> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the operational queue and returns its new length.
    pub fn add(&self, record: MetricRecord) -> usize {
        let mut queue = lock(&self.operational);
        queue.push(record);
        queue.len()
    }

    /// Appends to the diagnostic queue and returns its new length.
    pub fn add_diagnostic(&self, event: ClientMetric) -> usize {
        let mut queue = lock(&self.diagnostic);
        queue.push(event);
        queue.len()
    }

    /// Current length of one queue. May be stale as soon as it returns.
    pub fn count(&self, kind: BatchKind) -> usize {
        match kind {
            BatchKind::Operational => lock(&self.operational).len(),
            BatchKind::Diagnostic => lock(&self.diagnostic).len(),
        }
    }

    /// Removes and returns every element of one queue in arrival order.
    ///
    /// Returns `None` when the queue was empty so the caller can skip the network call.
    pub fn drain_all(&self, kind: BatchKind) -> Option<Batch> {
        let batch = match kind {
            BatchKind::Operational => {
                Batch::Operational(std::mem::take(&mut *lock(&self.operational)))
            }
            BatchKind::Diagnostic => {
                Batch::Diagnostic(std::mem::take(&mut *lock(&self.diagnostic)))
            }
        };
        (!batch.is_empty()).then_some(batch)
    }
}
