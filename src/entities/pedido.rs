use chrono::Utc;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{BraipStatus, Order, OrderStatus};
use crate::services::status_mapper::{map_vendor_status, vendor_code_for};

pub const UNKNOWN_LOCATION: &str = "Localização não informada";

/// A row of the mirrored `pedidos` table.
///
/// `status` holds a Braip vendor code, which is what the table has always
/// stored. The board column goes to the optional `board_status` column; it is
/// omitted from JSON when unset so tables without it keep accepting writes.
/// Missing keys deserialize to `None`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pedidos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub purchase_id: String,
    #[serde(default)]
    pub id: Option<String>,
    pub buyer_name: String,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub product_value: Option<f64>,
    #[serde(default)]
    pub purchase_date: Option<Date>,
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for Model {
    fn from(order: &Order) -> Self {
        let vendor_code = order
            .braip_status
            .filter(|code| map_vendor_status(*code).status == order.status)
            .unwrap_or_else(|| vendor_code_for(order.status));

        Self {
            purchase_id: order.purchase_id.clone(),
            id: Some(order.id.clone()),
            buyer_name: order.buyer_name.clone(),
            buyer_phone: order.phone_number.clone(),
            product_title: order.product_title.clone().or_else(|| order.product.clone()),
            quantity: order.quantity.and_then(|q| i32::try_from(q).ok()),
            product_value: order.product_value.and_then(|v| v.to_f64()),
            purchase_date: Some(order.purchase_date),
            tracking_code: order.tracking_code.clone(),
            current_location: Some(order.current_location.clone()),
            observations: order.observations.clone(),
            status: Some(vendor_code.to_string()),
            board_status: Some(order.status.to_string()),
            updated_at: Some(order.updated_at),
        }
    }
}

impl Model {
    /// Resolves the board column for this row.
    ///
    /// `board_status` wins when present. Otherwise `status` is read as a
    /// vendor code and mapped, or taken as-is when it already names a column.
    /// `None` means the row carries no usable status.
    pub fn resolve_status(&self) -> Option<(OrderStatus, Option<BraipStatus>)> {
        let raw = self.status.as_deref().map(str::trim);
        let vendor = raw.and_then(|code| BraipStatus::from_str(code).ok());

        if let Some(status) = self
            .board_status
            .as_deref()
            .and_then(|board| OrderStatus::from_str(board.trim()).ok())
        {
            return Some((status, vendor));
        }

        match vendor {
            Some(code) => Some((map_vendor_status(code).status, Some(code))),
            None => raw
                .and_then(|value| OrderStatus::from_str(value).ok())
                .map(|status| (status, None)),
        }
    }

    /// Converts the row into an order, or `None` if its status is unusable.
    pub fn into_order(self) -> Option<Order> {
        let (status, braip_status) = self.resolve_status()?;
        let today = Utc::now().date_naive();

        Some(Order {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| self.purchase_id.clone()),
            purchase_id: self.purchase_id,
            buyer_name: self.buyer_name,
            phone_number: self.buyer_phone,
            product: self.product_title.clone(),
            product_title: self.product_title,
            quantity: Some(
                self.quantity
                    .and_then(|q| u32::try_from(q).ok())
                    .filter(|q| *q > 0)
                    .unwrap_or(1),
            ),
            product_value: Some(
                self.product_value
                    .and_then(Decimal::from_f64)
                    .unwrap_or(Decimal::ZERO),
            ),
            purchase_date: self.purchase_date.unwrap_or(today),
            tracking_code: self.tracking_code,
            current_location: self
                .current_location
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            observations: self.observations,
            status,
            braip_status,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn row(status: Option<&str>, board_status: Option<&str>) -> Model {
        Model {
            purchase_id: "P1".into(),
            id: None,
            buyer_name: "Ana".into(),
            buyer_phone: None,
            product_title: Some("Kit".into()),
            quantity: None,
            product_value: None,
            purchase_date: None,
            tracking_code: None,
            current_location: None,
            observations: None,
            status: status.map(str::to_string),
            board_status: board_status.map(str::to_string),
            updated_at: None,
        }
    }

    fn order(status: OrderStatus, braip_status: Option<BraipStatus>) -> Order {
        Order {
            id: "P1".into(),
            purchase_id: "P1".into(),
            buyer_name: "Ana".into(),
            phone_number: None,
            product: Some("Kit".into()),
            product_title: Some("Kit".into()),
            quantity: Some(1),
            product_value: Some(Decimal::ZERO),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            tracking_code: None,
            current_location: status.label().into(),
            observations: None,
            status,
            braip_status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sparse_row_gets_defaults() {
        let order = row(Some("POSTADO"), None).into_order().unwrap();
        assert_eq!(order.id, "P1");
        assert_eq!(order.quantity, Some(1));
        assert_eq!(order.product_value, Some(Decimal::ZERO));
        assert_eq!(order.current_location, UNKNOWN_LOCATION);
        assert_eq!(order.product.as_deref(), Some("Kit"));
        assert_eq!(order.status, OrderStatus::Pickup);
        assert_eq!(order.braip_status, Some(BraipStatus::Postado));
    }

    #[test]
    fn board_status_column_wins_over_vendor_code() {
        let order = row(Some("ENTREGUE"), Some("delivered_unpaid"))
            .into_order()
            .unwrap();
        assert_eq!(order.status, OrderStatus::DeliveredUnpaid);
        assert_eq!(order.braip_status, Some(BraipStatus::Entregue));
    }

    #[test]
    fn column_name_in_status_is_accepted() {
        let order = row(Some("progress"), None).into_order().unwrap();
        assert_eq!(order.status, OrderStatus::Progress);
        assert_eq!(order.braip_status, None);
    }

    #[test]
    fn row_without_usable_status_is_rejected() {
        assert!(row(Some("shipped"), None).into_order().is_none());
        assert!(row(None, None).into_order().is_none());
    }

    #[test]
    fn status_column_always_holds_a_vendor_code() {
        let kept = Model::from(&order(
            OrderStatus::Pickup,
            Some(BraipStatus::AguardandoRetirada),
        ));
        assert_eq!(kept.status.as_deref(), Some("AGUARDANDO_RETIRADA"));
        assert_eq!(kept.board_status.as_deref(), Some("pickup"));

        // Moved on the board away from the column its code maps to.
        let moved = Model::from(&order(OrderStatus::Failed, Some(BraipStatus::Postado)));
        assert_eq!(moved.status.as_deref(), Some("FRUSTRADO"));

        let manual = Model::from(&order(OrderStatus::DeliveredUnpaid, None));
        assert_eq!(manual.status.as_deref(), Some("ENTREGUE"));
        assert_eq!(manual.board_status.as_deref(), Some("delivered_unpaid"));
    }

    #[test]
    fn order_round_trips_through_row() {
        let order = order(OrderStatus::DeliveredUnpaid, Some(BraipStatus::Entregue));
        let back = Model::from(&order).into_order().unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn unset_board_status_is_left_out_of_json() {
        let mut model = Model::from(&order(OrderStatus::Placed, None));
        model.board_status = None;
        let value = serde_json::to_value(&model).unwrap();
        assert!(value.get("board_status").is_none());
        assert_eq!(value["status"], "PAGAMENTO_CONFIRMADO");
    }

    #[test]
    fn postgrest_json_with_missing_keys_decodes() {
        let model: Model = serde_json::from_value(json!({
            "purchase_id": "P2",
            "buyer_name": "Bia",
            "status": "PAGAMENTO_CONFIRMADO",
            "updated_at": "2024-06-01T13:00:00+00:00"
        }))
        .unwrap();
        assert!(model.quantity.is_none());
        assert_eq!(model.into_order().unwrap().status, OrderStatus::Placed);
    }
}
