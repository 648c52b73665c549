use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{OrderKey, OrderMerge, OrderStore, StoreWrite};
use crate::errors::ServiceError;
use crate::models::Order;

/// Process-local order store guarded by a single lock.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn locate(orders: &[Order], key: OrderKey<'_>) -> Option<usize> {
    let by_purchase_id =
        |purchase_id: &str| orders.iter().position(|o| o.purchase_id == purchase_id);
    let by_id = |id: &str| orders.iter().position(|o| o.id == id);

    match key {
        OrderKey::PurchaseId(purchase_id) => by_purchase_id(purchase_id),
        OrderKey::Form { id, purchase_id } => {
            let holder = by_purchase_id(purchase_id);
            id.and_then(by_id)
                .filter(|index| holder.map_or(true, |held| held == *index))
                .or(holder)
        }
        OrderKey::IdOrPurchaseId(key) => by_id(key).or_else(|| by_purchase_id(key)),
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn update_or_insert(
        &self,
        key: OrderKey<'_>,
        merge: OrderMerge,
    ) -> Result<StoreWrite, ServiceError> {
        let mut orders = self.orders.write().await;

        let index = locate(&orders, key);
        let mut order = merge(index.map(|i| &orders[i]))?;

        let held_elsewhere = |pred: &dyn Fn(&Order) -> bool| {
            orders
                .iter()
                .enumerate()
                .any(|(i, o)| Some(i) != index && pred(o))
        };

        if held_elsewhere(&|o: &Order| o.purchase_id == order.purchase_id) {
            return Err(ServiceError::InternalError(format!(
                "purchase id {} is held by another order",
                order.purchase_id
            )));
        }
        if held_elsewhere(&|o: &Order| o.id == order.id) {
            let fresh = Uuid::new_v4().to_string();
            debug!(taken = %order.id, id = %fresh, "order id already in use, assigning a new one");
            order.id = fresh;
        }

        match index {
            Some(i) => orders[i] = order.clone(),
            None => orders.push(order.clone()),
        }

        Ok(StoreWrite {
            order,
            created: index.is_none(),
        })
    }

    async fn list(&self) -> Result<Vec<Order>, ServiceError> {
        let mut snapshot = self.orders.read().await.clone();
        snapshot.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(snapshot)
    }

    async fn find(&self, key: &str) -> Result<Option<Order>, ServiceError> {
        let orders = self.orders.read().await;
        Ok(locate(&orders, OrderKey::IdOrPurchaseId(key)).map(|i| orders[i].clone()))
    }

    async fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.orders.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::Arc;

    fn order(id: &str, purchase_id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.into(),
            purchase_id: purchase_id.into(),
            buyer_name: "Ana".into(),
            phone_number: None,
            product: None,
            product_title: None,
            quantity: Some(1),
            product_value: None,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            tracking_code: None,
            current_location: status.label().into(),
            observations: None,
            status,
            braip_status: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn same_purchase_id_replaces_existing_order() {
        let store = InMemoryOrderStore::new();
        store
            .upsert(order("P1", "P1", OrderStatus::Placed))
            .await
            .unwrap();
        store
            .upsert(order("P1", "P1", OrderStatus::Delivered))
            .await
            .unwrap();

        let orders = store.list().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn matches_by_purchase_id_when_id_differs() {
        let store = InMemoryOrderStore::new();
        store
            .upsert(order("uuid-1", "P1", OrderStatus::Placed))
            .await
            .unwrap();
        store
            .upsert(order("P1", "P1", OrderStatus::Pickup))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let found = store.find("P1").await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Pickup);
    }

    #[tokio::test]
    async fn id_of_another_purchase_never_removes_that_order() {
        let store = InMemoryOrderStore::new();
        store.upsert(order("a", "P1", OrderStatus::Placed)).await.unwrap();
        store.upsert(order("b", "P2", OrderStatus::Placed)).await.unwrap();

        let stored = store
            .upsert(order("b", "P1", OrderStatus::Failed))
            .await
            .unwrap();

        assert_eq!(stored.id, "a");
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.find("a").await.unwrap().unwrap().status, OrderStatus::Failed);
        assert_eq!(store.find("b").await.unwrap().unwrap().status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn new_purchase_with_taken_id_gets_a_fresh_id() {
        let store = InMemoryOrderStore::new();
        store.upsert(order("P2", "P1", OrderStatus::Placed)).await.unwrap();

        let written = store
            .update_or_insert(
                OrderKey::PurchaseId("P2"),
                Box::new(|stored| {
                    assert!(stored.is_none());
                    Ok(order("P2", "P2", OrderStatus::Pickup))
                }),
            )
            .await
            .unwrap();

        assert!(written.created);
        assert_ne!(written.order.id, "P2");
        let mut purchase_ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.purchase_id)
            .collect();
        purchase_ids.sort();
        assert_eq!(purchase_ids, vec!["P1", "P2"]);
    }

    #[tokio::test]
    async fn form_key_uses_id_when_purchase_is_new() {
        let store = InMemoryOrderStore::new();
        store.upsert(order("a", "P1", OrderStatus::Placed)).await.unwrap();

        let written = store
            .update_or_insert(
                OrderKey::Form {
                    id: Some("a"),
                    purchase_id: "P9",
                },
                Box::new(|stored| {
                    let mut next = stored.cloned().unwrap();
                    next.purchase_id = "P9".into();
                    Ok(next)
                }),
            )
            .await
            .unwrap();

        assert!(!written.created);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.find("P9").await.unwrap().unwrap().id, "a");
    }

    #[tokio::test]
    async fn failed_merge_leaves_store_untouched() {
        let store = InMemoryOrderStore::new();
        let err = store
            .update_or_insert(
                OrderKey::IdOrPurchaseId("missing"),
                Box::new(|stored| {
                    stored
                        .cloned()
                        .ok_or_else(|| ServiceError::NotFound("missing".into()))
                }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let store = InMemoryOrderStore::new();
        let mut old = order("P1", "P1", OrderStatus::Placed);
        old.updated_at = Utc::now() - Duration::hours(2);
        store.upsert(old).await.unwrap();
        store.upsert(order("P2", "P2", OrderStatus::Placed)).await.unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["P2", "P1"]);
    }

    #[tokio::test]
    async fn find_prefers_id_over_purchase_id() {
        let store = InMemoryOrderStore::new();
        store.upsert(order("X", "P1", OrderStatus::Placed)).await.unwrap();
        store.upsert(order("P1", "P9", OrderStatus::Failed)).await.unwrap();

        let found = store.find("P1").await.unwrap().unwrap();
        assert_eq!(found.purchase_id, "P9");
        assert!(store.find("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_upserts_keep_one_order_per_purchase_id() {
        let store = Arc::new(InMemoryOrderStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let status = if i % 2 == 0 {
                    OrderStatus::Progress
                } else {
                    OrderStatus::Pickup
                };
                store
                    .upsert(order(&format!("P{}", i % 4), &format!("P{}", i % 4), status))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 4);
    }
}
