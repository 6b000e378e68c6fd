// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The network boundary of the engine.
//!
//! [`TransportClient`] is the only thing the engine knows about delivery: it hands over a drained
//! [`Batch`] and observes the result for logging. [`HttpTransport`] is the collector-backed
//! implementation, posting JSON with a bearer token from an [`Authenticator`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

use crate::auth::Authenticator;
use crate::batch::{Batch, BatchKind};
use crate::config::HttpTransportConfig;
use crate::error::{EngineError, TransportError};

const OPERATIONAL_PATH: &str = "metrics";
const DIAGNOSTIC_PATH: &str = "clientmetrics";

/// Acknowledgement of a delivered batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub kind: BatchKind,
    pub count: usize,
}

#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Delivers one batch. The kind is carried by the batch itself.
    async fn send(&self, batch: Batch) -> Result<Ack, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<HttpTransportConfig>,
    authenticator: Arc<Authenticator>,
}

impl HttpTransport {
    pub fn new(
        config: HttpTransportConfig,
        authenticator: Arc<Authenticator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(proxy) = &config.https_proxy {
            let proxy =
                reqwest::Proxy::https(proxy).map_err(|e| EngineError::HttpClient(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            authenticator,
        })
    }

    fn url(&self, kind: BatchKind) -> String {
        match kind {
            BatchKind::Operational => self.config.url_for(OPERATIONAL_PATH),
            BatchKind::Diagnostic => self.config.url_for(DIAGNOSTIC_PATH),
        }
    }

    fn headers(token: &str) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TransportError::InvalidToken)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl TransportClient for HttpTransport {
    async fn send(&self, batch: Batch) -> Result<Ack, TransportError> {
        let kind = batch.kind();
        let count = batch.len();

        let Some(token) = self.authenticator.bearer_token().await else {
            return Err(TransportError::MissingCredentials);
        };
        let body = batch.to_json()?;

        let url = self.url(kind);
        debug!("Posting {count} {kind} metrics to {url}");
        let response = self
            .client
            .post(&url)
            .headers(Self::headers(&token)?)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Ack { kind, count });
        }
        // Don't read the body on success, only to explain a rejection
        let body = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            "access denied, verify the credentials".to_string()
        } else {
            response.text().await.unwrap_or_default()
        };
        Err(TransportError::Status { status, body })
    }
}
