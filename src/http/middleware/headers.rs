//! Tower adapter for the header rewrite engine.
//!
//! Wrap a service with `option_layer(rewriter.map(HeaderRewriteLayer::new))`
//! so that frontends without header rules skip the stage entirely.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use tower::{Layer, Service};

use crate::rewrite::HeaderRewriter;

/// Layer that rewrites request headers before the inner service runs.
#[derive(Debug, Clone)]
pub struct HeaderRewriteLayer {
    rewriter: HeaderRewriter,
}

impl HeaderRewriteLayer {
    pub fn new(rewriter: HeaderRewriter) -> Self {
        Self { rewriter }
    }
}

impl<S> Layer<S> for HeaderRewriteLayer {
    type Service = HeaderRewriteService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HeaderRewriteService {
            inner,
            rewriter: self.rewriter.clone(),
        }
    }
}

/// Service produced by [`HeaderRewriteLayer`].
#[derive(Debug, Clone)]
pub struct HeaderRewriteService<S> {
    inner: S,
    rewriter: HeaderRewriter,
}

impl<S> Service<Request<Body>> for HeaderRewriteService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        self.rewriter.modify_request_headers(&mut req);
        self.inner.call(req)
    }
}
