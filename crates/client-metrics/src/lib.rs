// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client-side telemetry batching.
//!
//! Application code reports operational metrics and diagnostic events to a
//! [`MetricsEngine`](engine::MetricsEngine). The engine buffers them in two queues and flushes
//! both to a [`TransportClient`](transport::TransportClient) whenever a queue grows past its limit
//! and on a fixed timer. Delivery is best-effort: failed batches are logged and dropped.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod auth;
pub mod batch;
pub mod buffer;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod record;
pub mod scheduler;
pub mod transport;
