// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use client_metrics::config::EngineConfig;
use client_metrics::diagnostic::{ClientContext, Identifiers, Payload};
use client_metrics::engine::MetricsEngine;
use client_metrics::record::Fields;
use client_metrics::transport::TransportClient;
use std::sync::Arc;
use std::time::Duration;

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Create an engine on the current runtime with the given buffer limit
pub fn create_engine(transport: Arc<dyn TransportClient>, buffer_limit: usize) -> MetricsEngine {
    let config = EngineConfig {
        buffer_limit,
        flush_interval: FLUSH_INTERVAL,
    };
    MetricsEngine::new(config, transport, ClientContext::default())
        .expect("failed to create metrics engine")
}

pub fn fields() -> Fields {
    Fields::from([("outcome".to_string(), "ok".to_string())])
}

pub fn identifiers(call_id: &str) -> Identifiers {
    Identifiers {
        call_id: Some(call_id.to_string()),
        ..Default::default()
    }
}

pub fn interval(jitter: u64) -> Payload {
    let mut payload = Payload::new();
    payload.insert("jitter".to_string(), serde_json::json!(jitter));
    payload
}

/// Let spawned sends and timer ticks run without moving the clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
