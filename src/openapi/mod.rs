use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::{ErrorResponse, FieldError};
use crate::events::OrderEvent;
use crate::handlers::{health, orders, updates};
use crate::models::{BraipStatus, Order, OrderInput, OrderStatus, StatusChange};
use crate::webhooks::BraipWebhookPayload;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Braip Order Tracker API",
        version = "0.1.0",
        description = r#"
# Braip Order Tracker

Receives shipment webhooks from Braip, maps vendor codes onto the six board
columns and pushes every change to connected dashboards over SSE.

## Status mapping

| Vendor code | Column |
|---|---|
| PAGAMENTO_CONFIRMADO | placed |
| EM_ANDAMENTO | progress |
| POSTADO, AGUARDANDO_RETIRADA | pickup |
| ENTREGUE | delivered |
| FRUSTRADO, NAO_RETIRADO | failed |

`delivered_unpaid` is only reachable through a manual edit. Unknown vendor
codes are rejected with `400`.

## Error Handling

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Payload do webhook inválido",
  "errors": [{ "field": "purchase_id", "message": "purchase_id is required" }],
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        orders::list_orders,
        orders::save_order,
        orders::braip_webhook,
        orders::update_order_status,
        updates::order_updates,
        health::ping,
        health::health,
        health::mirror_health,
    ),
    components(schemas(
        Order,
        OrderInput,
        OrderStatus,
        BraipStatus,
        StatusChange,
        BraipWebhookPayload,
        OrderEvent,
        orders::OrdersResponse,
        orders::SaveOrderResponse,
        health::PingResponse,
        health::HealthResponse,
        health::MirrorHealthResponse,
        ErrorResponse,
        FieldError,
    )),
    tags(
        (name = "orders", description = "Order board endpoints"),
        (name = "webhooks", description = "Inbound vendor webhooks"),
        (name = "health", description = "Liveness and dependency checks")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
