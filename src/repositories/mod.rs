use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::Order;

pub mod memory;
pub mod mirror;
pub mod order_repository;
pub mod postgrest;

pub use memory::InMemoryOrderStore;
pub use mirror::{NoopMirror, OrderMirror};
pub use order_repository::DatabaseMirror;
pub use postgrest::PostgrestMirror;

/// Selects the stored order a write applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey<'a> {
    /// Vendor writes, keyed by purchase id alone.
    PurchaseId(&'a str),
    /// Form writes. `id` wins only when that order already carries `purchase_id`
    /// or no order does yet; otherwise the order holding `purchase_id` is used.
    Form {
        id: Option<&'a str>,
        purchase_id: &'a str,
    },
    /// Board moves: an id, else a purchase id.
    IdOrPurchaseId(&'a str),
}

/// Builds the new order from the stored one, if any. Runs under the store lock.
pub type OrderMerge = Box<dyn FnOnce(Option<&Order>) -> Result<Order, ServiceError> + Send>;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreWrite {
    pub order: Order,
    pub created: bool,
}

/// Live system of record for orders.
///
/// At most one stored order exists per `purchaseId` and per `id`, and no write
/// removes an order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Resolves `key`, applies `merge` to the match and stores the result as
    /// one atomic step. An `id` already held by another order is replaced with
    /// a fresh one.
    async fn update_or_insert(
        &self,
        key: OrderKey<'_>,
        merge: OrderMerge,
    ) -> Result<StoreWrite, ServiceError>;

    /// Stores a complete order. A match found by purchase id keeps its stored id.
    async fn upsert(&self, order: Order) -> Result<Order, ServiceError> {
        let id = order.id.clone();
        let purchase_id = order.purchase_id.clone();
        let key = OrderKey::Form {
            id: Some(&id),
            purchase_id: &purchase_id,
        };
        let written = self
            .update_or_insert(
                key,
                Box::new(move |stored| {
                    let mut order = order;
                    if let Some(stored) = stored {
                        order.id = stored.id.clone();
                    }
                    Ok(order)
                }),
            )
            .await?;
        Ok(written.order)
    }

    /// Snapshot of every order, most recently updated first.
    async fn list(&self) -> Result<Vec<Order>, ServiceError>;

    /// Looks an order up by `id`, then by `purchaseId`.
    async fn find(&self, key: &str) -> Result<Option<Order>, ServiceError>;

    async fn count(&self) -> Result<usize, ServiceError>;
}
