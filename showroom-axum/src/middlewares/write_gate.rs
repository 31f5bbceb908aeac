use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::debug;

use crate::{ShowroomAxumError, WriteGate};

/// Middleware that puts every mutating request behind a [`WriteGate`].
///
/// `GET`, `HEAD` and `OPTIONS` pass through untouched.
#[derive(Clone)]
pub struct WriteGateLayer {
    gate: Arc<dyn WriteGate>,
}

impl WriteGateLayer {
    pub fn new(gate: Arc<dyn WriteGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for WriteGateLayer {
    type Service = WriteGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        WriteGateService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

#[derive(Clone)]
pub struct WriteGateService<S> {
    inner: S,
    gate: Arc<dyn WriteGate>,
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl<S> Service<Request<Body>> for WriteGateService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        if !is_read(req.method()) {
            if let Err(err) = self.gate.authorize(req.headers()) {
                debug!(method = %req.method(), path = %req.uri().path(), error = %err, "write rejected");
                let response = ShowroomAxumError::from(err).into_response();
                return Box::pin(async move { Ok(response) });
            }
        }

        Box::pin(async move { inner.call(req).await })
    }
}
