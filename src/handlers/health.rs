use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Open SSE connections
    pub subscribers: usize,
    /// Orders held in memory
    pub orders: usize,
    /// Configured mirror backend
    pub mirror: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MirrorHealthResponse {
    pub success: bool,
    pub mirror: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/ping",
    responses((status = 200, description = "Liveness check", body = PingResponse)),
    tag = "health"
)]
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        message: state.config.ping_message.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service status", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, orders) = match state.orders.count().await {
        Ok(count) => ("up", count),
        Err(e) => {
            tracing::warn!(error = %e, "order store unavailable");
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        subscribers: state.orders.hub().subscriber_count(),
        orders,
        mirror: state.orders.mirror_name().to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/mirror/health",
    responses(
        (status = 200, description = "Mirror reachable", body = MirrorHealthResponse),
        (status = 502, description = "Mirror unreachable", body = MirrorHealthResponse),
    ),
    tag = "health"
)]
pub async fn mirror_health(State(state): State<AppState>) -> impl IntoResponse {
    let mirror = state.orders.mirror_name().to_string();
    match state.orders.mirror_health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(MirrorHealthResponse {
                success: true,
                mirror,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(mirror = %mirror, error = %e, "mirror health check failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(MirrorHealthResponse {
                    success: false,
                    mirror,
                    message: Some(e.response_message()),
                }),
            )
        }
    }
}
