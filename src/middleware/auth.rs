//! Bearer token gate for the artifact store's latest-file lookups

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;

/// Outcome of checking an `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerCheck {
    Granted,
    /// Header missing or not a bearer credential
    Missing,
    /// Bearer credential present but wrong
    Rejected,
}

/// Authentication layer
#[derive(Clone)]
pub struct BearerAuthLayer {
    token: Arc<Option<String>>,
}

impl BearerAuthLayer {
    /// With no configured token every credential is rejected
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn check(&self, header: Option<&str>) -> BearerCheck {
        let Some(presented) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
            return BearerCheck::Missing;
        };
        match self.token.as_deref() {
            Some(expected) if constant_time_eq(presented.as_bytes(), expected.as_bytes()) => BearerCheck::Granted,
            _ => BearerCheck::Rejected,
        }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthMiddleware {
            inner,
            gate: self.clone(),
        }
    }
}

/// Authentication middleware service
#[derive(Clone)]
pub struct BearerAuthMiddleware<S> {
    inner: S,
    gate: BearerAuthLayer,
}

impl<S> Service<Request<Body>> for BearerAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match self.gate.check(header) {
            BearerCheck::Granted => {
                let future = self.inner.call(request);
                Box::pin(async move { future.await })
            }
            BearerCheck::Missing => {
                warn!(path = %request.uri().path(), "No bearer token provided");
                Box::pin(async move { Ok(AppError::Unauthorized.into_response()) })
            }
            BearerCheck::Rejected => {
                warn!(path = %request.uri().path(), "Invalid bearer token provided");
                Box::pin(async move { Ok(AppError::Forbidden.into_response()) })
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
