// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::sync::Arc;
use std::{future::Future, pin::Pin};

pub type TokenResolverFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Option<String>> + Send>> + Send + Sync>;

/// Opaque credential provider for the collector.
///
/// Only the HTTP transport reads it; the engine passes it through untouched.
#[derive(Clone)]
pub enum Authenticator {
    Static(String),
    // Resolved on every request so rotated tokens are picked up.
    Dynamic(TokenResolverFn),
}

impl Authenticator {
    pub fn new_from_resolver(resolver_fn: TokenResolverFn) -> Self {
        Self::Dynamic(resolver_fn)
    }

    /// Wraps an async closure as a [`TokenResolverFn`].
    pub fn from_fn<F, Fut>(resolve: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(
            move || -> Pin<Box<dyn Future<Output = Option<String>> + Send>> {
                Box::pin(resolve())
            },
        ))
    }

    pub fn new_from_static_token(token: &str) -> Self {
        Self::Static(token.to_string())
    }

    pub async fn bearer_token(&self) -> Option<String> {
        let token = match self {
            Self::Static(token) => Some(token.clone()),
            Self::Dynamic(resolver_fn) => (resolver_fn)().await,
        };
        token.filter(|token| !token.is_empty())
    }
}

impl Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authenticator")
    }
}
