use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::{FieldError, ServiceError};
use crate::models::{order::blank_as_none, BraipStatus};
use crate::services::status_mapper::parse_vendor_code;

const INVALID_WEBHOOK: &str = "Payload do webhook inválido";

const STRING_FIELDS: [&str; 6] = [
    "buyer_name",
    "purchase_id",
    "tracking_code",
    "product_title",
    "status",
    "updated_at",
];

/// Shipment update as posted by Braip.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BraipWebhookPayload {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    #[schema(example = "Maria Silva")]
    pub buyer_name: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    #[schema(example = "BRP-10293")]
    pub purchase_id: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub tracking_code: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub product_title: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    #[schema(example = "POSTADO")]
    pub status: Option<String>,

    /// RFC 3339 timestamp of the change on the vendor side
    #[serde(default, deserialize_with = "blank_as_none")]
    pub updated_at: Option<String>,
}

/// A webhook that passed validation, with the vendor code parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorUpdate {
    pub buyer_name: String,
    pub purchase_id: String,
    pub tracking_code: Option<String>,
    pub product_title: Option<String>,
    pub status: BraipStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Vendor bodies use snake_case identity keys; the order form sends camelCase.
pub fn is_webhook_shaped(body: &Value) -> bool {
    match body.as_object() {
        Some(map) => {
            map.contains_key("purchase_id")
                && map.contains_key("status")
                && !map.contains_key("purchaseId")
        }
        None => false,
    }
}

impl BraipWebhookPayload {
    /// Decodes a raw JSON body, reporting wrongly typed fields by name.
    pub fn from_json(body: Value) -> Result<Self, ServiceError> {
        let Some(map) = body.as_object() else {
            return Err(ServiceError::invalid_field(
                "body",
                "webhook body must be a JSON object",
            )
            .with_message(INVALID_WEBHOOK));
        };

        let type_errors: Vec<FieldError> = STRING_FIELDS
            .iter()
            .filter(|field| matches!(map.get(**field), Some(v) if !v.is_string() && !v.is_null()))
            .map(|field| FieldError::new(*field, format!("{} must be a string", field)))
            .collect();

        if !type_errors.is_empty() {
            return Err(ServiceError::ValidationError {
                message: INVALID_WEBHOOK.to_string(),
                errors: type_errors,
            });
        }

        serde_json::from_value(body).map_err(|e| {
            ServiceError::invalid_field("body", e.to_string()).with_message(INVALID_WEBHOOK)
        })
    }

    /// Checks required fields, then parses the vendor status and timestamp.
    pub fn into_update(self) -> Result<VendorUpdate, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::from(e).with_message(INVALID_WEBHOOK))?;

        let (Some(buyer_name), Some(purchase_id), Some(raw_status)) =
            (self.buyer_name, self.purchase_id, self.status)
        else {
            return Err(ServiceError::invalid_field("body", "missing required fields")
                .with_message(INVALID_WEBHOOK));
        };

        let status = parse_vendor_code(&raw_status)?;

        let updated_at = self
            .updated_at
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|_| {
                        ServiceError::invalid_field(
                            "updated_at",
                            format!("updated_at must be an RFC 3339 timestamp, got '{}'", raw),
                        )
                        .with_message(INVALID_WEBHOOK)
                    })
            })
            .transpose()?;

        Ok(VendorUpdate {
            buyer_name,
            purchase_id,
            tracking_code: self.tracking_code,
            product_title: self.product_title,
            status,
            updated_at,
        })
    }
}
