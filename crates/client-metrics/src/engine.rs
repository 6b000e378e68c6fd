// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The metrics engine.
//!
//! The engine owns the [`EventBuffer`] and the [`FlushScheduler`] and is the only producer-facing
//! API. Every flush, whether the timer fired or a queue went over `buffer_limit`, runs the same
//! algorithm:
//!
//! ```text
//!   drain diagnostic ──► spawn send(Diagnostic batch) ─┐
//!   drain operational ─► spawn send(Operational batch) ┴─► log outcome, never re-enqueue
//! ```
//!
//! Telemetry must never break the host, so no error escapes `track`, `report_diagnostic`,
//! `flush` or `release`. Invalid records are dropped, failed sends are logged, and calls made
//! after `release` are logged at warn level and ignored.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn, Instrument};

use crate::auth::Authenticator;
use crate::batch::{Batch, BatchKind};
use crate::buffer::EventBuffer;
use crate::config::{EngineConfig, HttpTransportConfig};
use crate::diagnostic::{ClientContext, ClientMetric, Identifiers, MediaLine, Payload};
use crate::error::{EngineError, TransportError};
use crate::record::{Fields, MetricRecord};
use crate::scheduler::FlushScheduler;
use crate::transport::{Ack, HttpTransport, TransportClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Released,
}

pub type SendResult = Result<Ack, TransportError>;

struct Inner {
    config: EngineConfig,
    buffer: EventBuffer,
    transport: Arc<dyn TransportClient>,
    client_context: ClientContext,
    media_lines: RwLock<Option<Vec<MediaLine>>>,
    // Producers hold the read side while appending so none can slip in behind the final flush.
    lifecycle: RwLock<Lifecycle>,
    runtime: Handle,
}

pub struct MetricsEngine {
    inner: Arc<Inner>,
    scheduler: FlushScheduler,
}

impl MetricsEngine {
    /// Creates an engine on the current tokio runtime and starts its flush timer.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn TransportClient>,
        client_context: ClientContext,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        Self::with_runtime(config, transport, client_context, runtime)
    }

    /// Creates an engine whose timer and sends run on `runtime`.
    ///
    /// Useful when the engine is built from a thread that is not itself inside the runtime.
    pub fn with_runtime(
        config: EngineConfig,
        transport: Arc<dyn TransportClient>,
        client_context: ClientContext,
        runtime: Handle,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let inner = Arc::new(Inner {
            buffer: EventBuffer::new(),
            transport,
            client_context,
            media_lines: RwLock::new(None),
            lifecycle: RwLock::new(Lifecycle::Running),
            runtime,
            config,
        });

        // The timer only holds a weak reference so dropping the engine frees the buffer.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let scheduler =
            FlushScheduler::start(&inner.runtime, inner.config.flush_interval, move || {
                if let Some(inner) = weak.upgrade() {
                    debug!("Periodic flush");
                    inner.flush();
                }
            });

        Ok(Self { inner, scheduler })
    }

    /// Creates an engine posting to the collector over HTTP with `authenticator`'s credentials.
    pub fn with_authenticator(
        config: EngineConfig,
        http_config: HttpTransportConfig,
        authenticator: Arc<Authenticator>,
        client_context: ClientContext,
    ) -> Result<Self, EngineError> {
        let transport = HttpTransport::new(http_config, authenticator)?;
        Self::new(config, Arc::new(transport), client_context)
    }

    /// Records an operational metric.
    ///
    /// Records with a blank name or no fields are silently dropped. Queuing more than
    /// `buffer_limit` records flushes both queues immediately.
    pub fn track(&self, name: impl Into<String>, fields: Fields) {
        let lifecycle = self.inner.lifecycle.read().unwrap_or_else(PoisonError::into_inner);
        let record = MetricRecord::new(name, fields);
        if *lifecycle == Lifecycle::Released {
            warn!(
                "Ignoring metric '{}': metrics engine already released",
                record.name()
            );
            return;
        }
        if !record.is_valid() {
            debug!("Dropping malformed metric '{}'", record.name());
            return;
        }

        let queued = self.inner.buffer.add(record);
        if queued > self.inner.config.buffer_limit {
            debug!("Operational buffer over limit, flushing");
            self.inner.flush();
        }
    }

    /// Records a media-quality diagnostic event for one reporting interval.
    ///
    /// The event is assembled from the injected [`ClientContext`], the current media lines and the
    /// caller's identifiers and payload.
    pub fn report_diagnostic(&self, identifiers: Identifiers, payload: Payload) {
        let lifecycle = self.inner.lifecycle.read().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == Lifecycle::Released {
            warn!("Ignoring diagnostic event: metrics engine already released");
            return;
        }

        let media_lines = self
            .inner
            .media_lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let event = self
            .inner
            .client_context
            .media_quality_event(identifiers, media_lines, payload);

        let queued = self.inner.buffer.add_diagnostic(ClientMetric::new(event));
        if queued > self.inner.config.buffer_limit {
            debug!("Diagnostic buffer over limit, flushing");
            self.inner.flush();
        }
    }

    /// Replaces the media lines embedded in subsequent diagnostic events.
    pub fn set_media_lines(&self, media_lines: Option<Vec<MediaLine>>) {
        *self
            .inner
            .media_lines
            .write()
            .unwrap_or_else(PoisonError::into_inner) = media_lines;
    }

    /// Drains both queues and sends each non-empty batch.
    ///
    /// The returned handle may be awaited for the send results or dropped.
    pub fn flush(&self) -> FlushHandle {
        let lifecycle = self.inner.lifecycle.read().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == Lifecycle::Released {
            warn!("Ignoring flush: metrics engine already released");
            return FlushHandle::default();
        }
        self.inner.flush()
    }

    /// Flushes whatever is buffered and stops the timer. Terminal and idempotent.
    ///
    /// The timer is stopped before this returns; in-flight sends are not awaited unless the
    /// returned handle is.
    pub fn release(&self) -> FlushHandle {
        let mut lifecycle = self
            .inner
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == Lifecycle::Released {
            debug!("Metrics engine already released");
            return FlushHandle::default();
        }
        *lifecycle = Lifecycle::Released;

        let handle = self.inner.flush();
        self.scheduler.stop();
        debug!("Metrics engine released");
        handle
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self
            .inner
            .lifecycle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_released(&self) -> bool {
        self.lifecycle() == Lifecycle::Released
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Number of items currently buffered in one queue
    pub fn count(&self, kind: BatchKind) -> usize {
        self.inner.buffer.count(kind)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl Inner {
    fn flush(&self) -> FlushHandle {
        let diagnostic = self
            .buffer
            .drain_all(BatchKind::Diagnostic)
            .map(|batch| self.dispatch(batch));
        let operational = self
            .buffer
            .drain_all(BatchKind::Operational)
            .map(|batch| self.dispatch(batch));

        FlushHandle {
            diagnostic,
            operational,
        }
    }

    fn dispatch(&self, batch: Batch) -> JoinHandle<SendResult> {
        let transport = Arc::clone(&self.transport);
        self.runtime
            .spawn(deliver(transport, batch).in_current_span())
    }
}

async fn deliver(transport: Arc<dyn TransportClient>, batch: Batch) -> SendResult {
    let kind = batch.kind();
    let count = batch.len();
    debug!("Flushing {count} {kind} metrics");

    match transport.send(batch).await {
        Ok(ack) => {
            debug!("Successfully flushed {count} {kind} metrics");
            Ok(ack)
        }
        Err(e) => {
            error!("Failed to flush {count} {kind} metrics, data dropped: {e}");
            Err(e)
        }
    }
}

/// In-flight sends started by one flush.
#[derive(Debug, Default)]
pub struct FlushHandle {
    diagnostic: Option<JoinHandle<SendResult>>,
    operational: Option<JoinHandle<SendResult>>,
}

/// Outcome of one flush. `None` means the queue was empty and nothing was sent.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub diagnostic: Option<SendResult>,
    pub operational: Option<SendResult>,
}

impl FlushReport {
    /// Number of batches handed to the transport
    pub fn batches(&self) -> usize {
        usize::from(self.diagnostic.is_some()) + usize::from(self.operational.is_some())
    }

    pub fn is_success(&self) -> bool {
        [&self.diagnostic, &self.operational]
            .into_iter()
            .flatten()
            .all(Result::is_ok)
    }
}

impl FlushHandle {
    /// Number of batches this flush sent
    pub fn batches(&self) -> usize {
        usize::from(self.diagnostic.is_some()) + usize::from(self.operational.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.batches() == 0
    }

    /// Waits for every send of this flush to complete.
    pub async fn wait(self) -> FlushReport {
        FlushReport {
            diagnostic: join(self.diagnostic).await,
            operational: join(self.operational).await,
        }
    }
}

async fn join(handle: Option<JoinHandle<SendResult>>) -> Option<SendResult> {
    let handle = handle?;
    Some(
        handle
            .await
            .unwrap_or_else(|e| Err(TransportError::Other(format!("send task failed: {e}")))),
    )
}

impl IntoFuture for FlushHandle {
    type Output = FlushReport;
    type IntoFuture = Pin<Box<dyn Future<Output = FlushReport> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
