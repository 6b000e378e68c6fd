// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors raised while building or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),
}

/// Errors that can occur when constructing a metrics engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Metrics engine requires a running tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors returned by a transport when a batch could not be delivered
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No credentials available to authorize the request")]
    MissingCredentials,

    #[error("Credential token is not a valid header value")]
    InvalidToken,

    #[error("Failed to serialize batch: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{status}: collector rejected batch: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Transport error: {0}")]
    Other(String),
}
