//! Property-based tests for status mapping and the order store.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use proptest::sample::select;
use strum::IntoEnumIterator;

use braip_tracker::{
    events::BroadcastHub,
    models::{BraipStatus, Order, OrderStatus},
    repositories::{InMemoryOrderStore, NoopMirror, OrderStore},
    services::{
        status_mapper::{map_vendor_code, map_vendor_status},
        OrderService,
    },
    webhooks::BraipWebhookPayload,
};

fn vendor_status_strategy() -> impl Strategy<Value = BraipStatus> {
    select(BraipStatus::iter().collect::<Vec<_>>())
}

fn internal_status_strategy() -> impl Strategy<Value = OrderStatus> {
    select(OrderStatus::iter().collect::<Vec<_>>())
}

fn order(purchase_id: &str, status: OrderStatus, minute: i64) -> Order {
    Order {
        id: purchase_id.into(),
        purchase_id: purchase_id.into(),
        buyer_name: "Ana".into(),
        phone_number: None,
        product: None,
        product_title: None,
        quantity: Some(1),
        product_value: None,
        purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        tracking_code: None,
        current_location: status.label().into(),
        observations: None,
        status,
        braip_status: None,
        updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn mapping_is_deterministic(vendor in vendor_status_strategy()) {
        prop_assert_eq!(map_vendor_status(vendor), map_vendor_status(vendor));
        let (parsed, mapped) = map_vendor_code(&vendor.to_string()).unwrap();
        prop_assert_eq!(parsed, vendor);
        prop_assert_eq!(mapped, map_vendor_status(vendor));
        prop_assert_ne!(mapped.status, OrderStatus::DeliveredUnpaid);
    }

    #[test]
    fn codes_outside_the_table_are_rejected(code in "[A-Z_]{1,24}") {
        let known = BraipStatus::iter().any(|s| s.to_string() == code);
        prop_assert_eq!(map_vendor_code(&code).is_ok(), known);
    }

    #[test]
    fn store_keeps_one_order_per_purchase_id(
        writes in prop::collection::vec((0u8..5, internal_status_strategy()), 1..40)
    ) {
        let rt = runtime();
        let store = InMemoryOrderStore::new();
        let mut latest = std::collections::HashMap::new();

        rt.block_on(async {
            for (i, (key, status)) in writes.iter().enumerate() {
                let purchase_id = format!("P{}", key);
                store
                    .upsert(order(&purchase_id, *status, i as i64))
                    .await
                    .unwrap();
                latest.insert(purchase_id, *status);
            }
        });

        let orders = rt.block_on(store.list()).unwrap();
        prop_assert_eq!(orders.len(), latest.len());
        for stored in &orders {
            prop_assert_eq!(Some(&stored.status), latest.get(&stored.purchase_id));
        }
        prop_assert!(orders.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
    }

    #[test]
    fn repeated_webhooks_converge_on_last_status(
        codes in prop::collection::vec(vendor_status_strategy(), 1..10)
    ) {
        let rt = runtime();
        let service = OrderService::new(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(NoopMirror),
            BroadcastHub::new(4),
        );

        rt.block_on(async {
            for code in &codes {
                let payload = BraipWebhookPayload::from_json(serde_json::json!({
                    "purchase_id": "P1",
                    "buyer_name": "A",
                    "status": code.to_string(),
                }))
                .unwrap();
                service.ingest_webhook(payload).await.unwrap();
            }
        });

        let orders = rt.block_on(service.list()).unwrap();
        let last = *codes.last().unwrap();
        prop_assert_eq!(orders.len(), 1);
        prop_assert_eq!(orders[0].status, map_vendor_status(last).status);
        prop_assert_eq!(orders[0].braip_status, Some(last));
    }
}
