// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use client_metrics::auth::Authenticator;
use client_metrics::config::{EngineConfig, HttpTransportConfig};
use client_metrics::diagnostic::ClientContext;
use client_metrics::engine::MetricsEngine;
use client_metrics::error::TransportError;
use common::helpers::{fields, identifiers, interval};
use mockito::{Matcher, Server};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};

fn create_engine(url: String, authenticator: Authenticator, buffer_limit: usize) -> MetricsEngine {
    let config = EngineConfig {
        buffer_limit,
        ..Default::default()
    };
    MetricsEngine::with_authenticator(
        config,
        HttpTransportConfig::new(url),
        Arc::new(authenticator),
        ClientContext::default(),
    )
    .expect("failed to create metrics engine")
}

#[tokio::test]
async fn threshold_flush_posts_operational_metrics() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/metrics")
        .match_header("authorization", "Bearer mock-token")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "metrics": [
                { "key": "m1", "value": { "outcome": "ok" } },
                { "key": "m2", "value": { "outcome": "ok" } }
            ]
        })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let engine = create_engine(
        server.url(),
        Authenticator::new_from_static_token("mock-token"),
        1,
    );
    engine.track("m1", fields());
    engine.track("m2", fields());

    let flushed = async {
        while !mock.matched_async().await {
            sleep(Duration::from_millis(20)).await;
        }
    };
    match timeout(Duration::from_secs(2), flushed).await {
        Ok(_) => mock.assert_async().await,
        Err(_) => panic!("timed out before server received metric flush"),
    }
}

#[tokio::test]
async fn release_posts_diagnostics_to_clientmetrics() {
    let mut server = Server::new_async().await;
    let diagnostics = server
        .mock("POST", "/clientmetrics")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("diagnostic-event".to_string()),
            Matcher::Regex("client.mediaquality.event".to_string()),
            Matcher::Regex("call-7".to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let operational = server
        .mock("POST", "/metrics")
        .expect(0)
        .create_async()
        .await;

    let engine = create_engine(
        server.url(),
        Authenticator::new_from_static_token("mock-token"),
        50,
    );
    engine.report_diagnostic(identifiers("call-7"), interval(3));
    engine.report_diagnostic(identifiers("call-7"), interval(4));

    let report = engine.release().await;
    assert!(report.is_success());
    assert_eq!(report.batches(), 1);

    diagnostics.assert_async().await;
    operational.assert_async().await;
}

#[tokio::test]
async fn rejected_batch_is_dropped() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/metrics")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let engine = create_engine(
        server.url(),
        Authenticator::new_from_static_token("mock-token"),
        50,
    );
    engine.track("m1", fields());

    let report = engine.flush().await;
    assert!(matches!(
        report.operational,
        Some(Err(TransportError::Status { .. }))
    ));
    assert!(engine.flush().await.operational.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn token_is_resolved_per_request() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("POST", "/metrics")
        .match_header("authorization", "Bearer token-0")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/metrics")
        .match_header("authorization", "Bearer token-1")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let issued = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&issued);
    let authenticator = Authenticator::from_fn(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Some(format!("token-{n}")) }
    });
    let engine = create_engine(server.url(), authenticator, 50);

    engine.track("m1", fields());
    assert!(engine.flush().await.is_success());
    engine.track("m2", fields());
    assert!(engine.release().await.is_success());

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(issued.load(Ordering::SeqCst), 2);
}
