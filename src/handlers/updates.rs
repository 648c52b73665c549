use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use crate::AppState;

/// Live order updates as server-sent events
///
/// The first event is `CONNECTED`; each later event is an `ORDER_UPDATE`
/// carrying the full order. Closing the connection ends the subscription.
#[utoipa::path(
    get,
    path = "/api/orders/updates",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = crate::events::OrderEvent),
    ),
    tag = "orders"
)]
pub async fn order_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.orders.hub().subscribe();
    tracing::debug!(subscriber = subscription.id(), "update stream opened");

    let stream = subscription.map(|event| Event::default().json_data(&event));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.sse_keep_alive()))
}
