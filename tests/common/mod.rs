#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use braip_tracker::{
    config::AppConfig,
    events::BroadcastHub,
    repositories::{InMemoryOrderStore, NoopMirror, OrderMirror},
    services::OrderService,
    AppState,
};

/// Router plus shared state over an in-memory store and a chosen mirror.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mirror(Arc::new(NoopMirror))
    }

    pub fn with_mirror(mirror: Arc<dyn OrderMirror>) -> Self {
        let config = AppConfig {
            environment: "test".into(),
            ping_message: "pong".into(),
            sse_subscriber_buffer: 16,
            ..AppConfig::default()
        };
        let orders = OrderService::new(
            Arc::new(InMemoryOrderStore::new()),
            mirror,
            BroadcastHub::new(config.sse_subscriber_buffer),
        );
        let state = AppState::new(config, orders);
        let router = braip_tracker::app(state.clone());
        Self { router, state }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.raw_request(request).await
    }

    pub async fn raw_request(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
