use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

pub mod hub;

pub use hub::{BroadcastHub, PublishReport, Subscription};

pub const CONNECTED_MESSAGE: &str = "Connected to order updates";

/// Payload of one server-sent event on the order updates stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// First event on every new subscription.
    Connected { message: String },
    OrderUpdate {
        data: Order,
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn connected() -> Self {
        OrderEvent::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    pub fn order_update(order: Order) -> Self {
        OrderEvent::OrderUpdate {
            data: order,
            timestamp: Utc::now(),
        }
    }
}
