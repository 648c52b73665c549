//! Braip order tracker
//!
//! Ingests shipment webhooks from the Braip sales platform, maps vendor status
//! codes onto kanban columns, keeps the live board in memory and streams every
//! change to connected dashboards over server-sent events.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;
pub mod webhooks;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::future::Future;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub orders: services::OrderService,
}

impl AppState {
    pub fn new(config: config::AppConfig, orders: services::OrderService) -> Self {
        Self {
            config: Arc::new(config),
            orders,
        }
    }
}

/// Routes served under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::save_order),
        )
        .route("/orders/updates", get(handlers::updates::order_updates))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route("/webhooks/braip", post(handlers::orders::braip_webhook))
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        .route("/mirror/health", get(handlers::health::mirror_health))
}

/// Full application router with request ids, HTTP tracing and Swagger UI.
///
/// CORS and compression depend on deployment settings and are layered on by
/// the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

/// Serves `router` until `shutdown` resolves.
///
/// Open update streams never end on their own, so the hub is closed as soon as
/// the signal arrives; graceful shutdown then waits only for in-flight requests.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    router: Router,
    hub: events::BroadcastHub,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            hub.close();
        })
        .await
}
