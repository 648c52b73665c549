use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::events::BroadcastHub;
use crate::models::{BraipStatus, Order, OrderInput, OrderStatus, StatusChange};
use crate::repositories::{OrderKey, OrderMirror, OrderStore, StoreWrite};
use crate::services::status_mapper::{map_vendor_status, parse_vendor_code};
use crate::webhooks::{BraipWebhookPayload, VendorUpdate};

/// Where a write entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IngestSource {
    Webhook,
    Manual,
    StatusMove,
}

/// The single write path for orders: store, then mirror, then broadcast.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    mirror: Arc<dyn OrderMirror>,
    hub: BroadcastHub,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        mirror: Arc<dyn OrderMirror>,
        hub: BroadcastHub,
    ) -> Self {
        Self { store, mirror, hub }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn mirror_name(&self) -> &'static str {
        self.mirror.name()
    }

    pub async fn list(&self) -> Result<Vec<Order>, ServiceError> {
        self.store.list().await
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        self.store.count().await
    }

    /// Applies a vendor webhook and returns the resulting order.
    #[instrument(skip(self, payload))]
    pub async fn ingest_webhook(
        &self,
        payload: BraipWebhookPayload,
    ) -> Result<Order, ServiceError> {
        let update = payload.into_update()?;
        let purchase_id = update.purchase_id.clone();

        let written = self
            .store
            .update_or_insert(
                OrderKey::PurchaseId(&purchase_id),
                Box::new(move |stored| Ok(apply_vendor_update(stored, update))),
            )
            .await?;

        self.commit(written, IngestSource::Webhook).await
    }

    /// Saves an order-shaped body from the form or the board.
    #[instrument(skip(self, input))]
    pub async fn save_manual(&self, input: OrderInput) -> Result<Order, ServiceError> {
        input.validate()?;

        let (Some(purchase_id), Some(buyer_name), Some(raw_status)) = (
            input.purchase_id.clone(),
            input.buyer_name.clone(),
            input.status.clone(),
        ) else {
            return Err(ServiceError::invalid_field("body", "missing required fields")
                .with_message("Payload inválido"));
        };

        let status = parse_internal_status(&raw_status)?;
        let braip_status = input
            .braip_status
            .as_deref()
            .and_then(|raw| match parse_vendor_code(raw) {
                Ok(code) => Some(code),
                Err(_) => {
                    debug!(braip_status = raw, "ignoring unknown vendor code on manual edit");
                    None
                }
            });

        let requested_id = input.id.clone();
        let key = OrderKey::Form {
            id: requested_id.as_deref(),
            purchase_id: &purchase_id,
        };
        let order_purchase_id = purchase_id.clone();

        let merge = move |stored: Option<&Order>| -> Result<Order, ServiceError> {
            let id = match (stored, input.id) {
                (Some(stored), _) => stored.id.clone(),
                (None, Some(id)) => id,
                (None, None) => Uuid::new_v4().to_string(),
            };
            let current_location = input
                .current_location
                .unwrap_or_else(|| default_location(status, braip_status));

            Ok(Order {
                id,
                purchase_id: order_purchase_id,
                buyer_name,
                phone_number: input.phone_number,
                product: input.product,
                product_title: input.product_title,
                quantity: input.quantity,
                product_value: input.product_value,
                purchase_date: input
                    .purchase_date
                    .unwrap_or_else(|| Utc::now().date_naive()),
                tracking_code: input.tracking_code,
                current_location,
                observations: input.observations,
                status,
                braip_status,
                updated_at: Utc::now(),
            })
        };

        let written = self.store.update_or_insert(key, Box::new(merge)).await?;
        self.commit(written, IngestSource::Manual).await
    }

    /// Moves an existing order to another board column.
    #[instrument(skip(self, change))]
    pub async fn move_status(
        &self,
        key: &str,
        change: StatusChange,
    ) -> Result<Order, ServiceError> {
        let status = parse_internal_status(&change.status)?;
        let missing = key.to_string();

        let written = self
            .store
            .update_or_insert(
                OrderKey::IdOrPurchaseId(key),
                Box::new(move |stored| {
                    let mut order = stored.cloned().ok_or_else(|| {
                        ServiceError::NotFound(format!("Order {} not found", missing))
                    })?;
                    order.status = status;
                    order.updated_at = Utc::now();
                    Ok(order)
                }),
            )
            .await?;

        self.commit(written, IngestSource::StatusMove).await
    }

    /// Loads the mirror's rows into the store without broadcasting.
    pub async fn hydrate(&self) -> Result<usize, ServiceError> {
        let orders = self.mirror.fetch_all().await?;
        let total = orders.len();
        // Oldest first so that the newest row wins on duplicate keys.
        for order in orders.into_iter().rev() {
            self.store.upsert(order).await?;
        }
        info!(mirror = self.mirror.name(), orders = total, "store hydrated from mirror");
        Ok(total)
    }

    pub async fn mirror_health(&self) -> Result<(), ServiceError> {
        self.mirror.ping().await
    }

    async fn commit(&self, written: StoreWrite, source: IngestSource) -> Result<Order, ServiceError> {
        let StoreWrite {
            order: stored,
            created,
        } = written;

        if created {
            info!(
                %source,
                purchase_id = %stored.purchase_id,
                status = %stored.status,
                "order created"
            );
        } else {
            info!(
                %source,
                purchase_id = %stored.purchase_id,
                status = %stored.status,
                "order updated"
            );
        }

        if let Err(e) = self.mirror.upsert(&stored).await {
            warn!(
                mirror = self.mirror.name(),
                purchase_id = %stored.purchase_id,
                error = %e,
                "mirror write failed, continuing with in-memory state"
            );
        }

        self.hub.publish(&stored);
        Ok(stored)
    }
}

/// Builds the order a webhook leaves behind. Fields Braip never sends are
/// carried over from the stored order.
fn apply_vendor_update(stored: Option<&Order>, update: VendorUpdate) -> Order {
    let mapped = map_vendor_status(update.status);
    let updated_at = update.updated_at.unwrap_or_else(Utc::now);

    match stored {
        Some(stored) => Order {
            id: stored.id.clone(),
            purchase_id: update.purchase_id,
            buyer_name: update.buyer_name,
            phone_number: stored.phone_number.clone(),
            product: update
                .product_title
                .clone()
                .or_else(|| stored.product.clone()),
            product_title: update.product_title.or_else(|| stored.product_title.clone()),
            quantity: stored.quantity,
            product_value: stored.product_value,
            purchase_date: stored.purchase_date,
            tracking_code: update.tracking_code.or_else(|| stored.tracking_code.clone()),
            current_location: mapped.location.to_string(),
            observations: stored.observations.clone(),
            status: mapped.status,
            braip_status: Some(update.status),
            updated_at,
        },
        None => Order {
            id: update.purchase_id.clone(),
            purchase_id: update.purchase_id,
            buyer_name: update.buyer_name,
            phone_number: None,
            product: update.product_title.clone(),
            product_title: update.product_title,
            quantity: Some(1),
            product_value: Some(Decimal::ZERO),
            purchase_date: Utc::now().date_naive(),
            tracking_code: update.tracking_code,
            current_location: mapped.location.to_string(),
            observations: None,
            status: mapped.status,
            braip_status: Some(update.status),
            updated_at,
        },
    }
}

fn parse_internal_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw.trim()).map_err(|_| ServiceError::InvalidStatus(raw.to_string()))
}

fn default_location(status: OrderStatus, braip_status: Option<BraipStatus>) -> String {
    braip_status
        .map(|code| map_vendor_status(code).location)
        .unwrap_or_else(|| status.label())
        .to_string()
}
