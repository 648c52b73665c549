use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use validator::Validate;

/// Kanban column an order currently occupies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Progress,
    Pickup,
    Delivered,
    /// Only reachable through a manual edit; no vendor code maps here.
    DeliveredUnpaid,
    Failed,
}

impl OrderStatus {
    /// Human readable column title shown on the board.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Pedido Agendado",
            OrderStatus::Progress => "Pedido em Andamento",
            OrderStatus::Pickup => "Pedido Aguardando Retirada",
            OrderStatus::Delivered => "Pedido Entregue e Pago",
            OrderStatus::DeliveredUnpaid => "Pedido Entregue e Não Pago",
            OrderStatus::Failed => "Pedido Frustrado",
        }
    }
}

/// Shipment status codes sent by the Braip platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BraipStatus {
    PagamentoConfirmado,
    EmAndamento,
    Postado,
    AguardandoRetirada,
    Entregue,
    Frustrado,
    NaoRetirado,
}

/// An order card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub purchase_id: String,
    pub buyer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<f64>)]
    pub product_value: Option<Decimal>,
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
    pub current_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub braip_status: Option<BraipStatus>,
    pub updated_at: DateTime<Utc>,
}

/// Order-shaped body submitted by the order form or a board drag.
///
/// Everything except `purchaseId`, `buyerName` and `status` may be omitted.
/// Blank strings are treated as absent so that untouched form inputs do not
/// fail parsing.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    pub purchase_id: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    pub buyer_name: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone_number: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub product: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub product_title: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<u32>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub product_value: Option<Decimal>,

    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub purchase_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub tracking_code: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub current_location: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub observations: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub braip_status: Option<String>,
}

/// Body of a drag-and-drop column move.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: String,
}

pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_as_none(deserializer)? {
        None => Ok(None),
        Some(raw) => {
            // The form sends plain dates; fall back to the date part of a full timestamp.
            let date_part = raw.get(..10).unwrap_or(&raw);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
