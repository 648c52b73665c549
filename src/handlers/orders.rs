use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::{ErrorResponse, ServiceError};
use crate::models::{Order, OrderInput, StatusChange};
use crate::webhooks::{is_webhook_shaped, BraipWebhookPayload};
use crate::AppState;

const WEBHOOK_ACCEPTED: &str = "Pedido atualizado com sucesso!";

/// Current board snapshot
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// Body returned after an order was written
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveOrderResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub order: Order,
}

impl SaveOrderResponse {
    fn manual(order: Order) -> Self {
        Self {
            success: true,
            message: None,
            order,
        }
    }

    fn webhook(order: Order) -> Self {
        Self {
            success: true,
            message: Some(WEBHOOK_ACCEPTED.to_string()),
            order,
        }
    }
}

/// List every order, most recently updated first
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Current orders", body = OrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, ServiceError> {
    let orders = state.orders.list().await?;
    Ok(Json(OrdersResponse { orders }))
}

/// Create or update an order
///
/// Accepts either a Braip webhook body (snake_case, with `purchase_id`) or an
/// order-shaped body from the board.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = OrderInput,
    responses(
        (status = 200, description = "Order saved and broadcast", body = SaveOrderResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn save_order(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveOrderResponse>, ServiceError> {
    let Json(body) = body?;

    if is_webhook_shaped(&body) {
        let payload = BraipWebhookPayload::from_json(body)?;
        let order = state.orders.ingest_webhook(payload).await?;
        return Ok(Json(SaveOrderResponse::webhook(order)));
    }

    let input: OrderInput = serde_json::from_value(body).map_err(|e| {
        ServiceError::invalid_field("body", e.to_string()).with_message("Payload inválido")
    })?;
    let order = state.orders.save_manual(input).await?;
    Ok(Json(SaveOrderResponse::manual(order)))
}

/// Braip shipment webhook
#[utoipa::path(
    post,
    path = "/api/webhooks/braip",
    request_body = BraipWebhookPayload,
    responses(
        (status = 200, description = "Order updated and broadcast", body = SaveOrderResponse),
        (status = 400, description = "Invalid webhook or unknown vendor status", body = ErrorResponse),
    ),
    tag = "webhooks"
)]
pub async fn braip_webhook(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveOrderResponse>, ServiceError> {
    let Json(body) = body?;
    let payload = BraipWebhookPayload::from_json(body)?;
    let order = state.orders.ingest_webhook(payload).await?;
    Ok(Json(SaveOrderResponse::webhook(order)))
}

/// Move an order to another column
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = String, Path, description = "Order id or purchase id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed and broadcast", body = SaveOrderResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<SaveOrderResponse>, ServiceError> {
    let Json(change) = body?;
    let order = state.orders.move_status(&id, change).await?;
    Ok(Json(SaveOrderResponse::manual(order)))
}
