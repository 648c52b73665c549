use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder,
};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::OrderMirror;
use crate::entities::pedido::{self, Column, Entity as Pedido};
use crate::errors::ServiceError;
use crate::models::Order;

/// Mirror writing straight to the `pedidos` table over a sea-orm connection.
///
/// The table is expected to carry every entity column, `board_status` included.
#[derive(Debug, Clone)]
pub struct DatabaseMirror {
    db: Arc<DatabaseConnection>,
}

impl DatabaseMirror {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn active_model(order: &Order) -> pedido::ActiveModel {
        let row = pedido::Model::from(order);
        pedido::ActiveModel {
            purchase_id: Set(row.purchase_id),
            id: Set(row.id),
            buyer_name: Set(row.buyer_name),
            buyer_phone: Set(row.buyer_phone),
            product_title: Set(row.product_title),
            quantity: Set(row.quantity),
            product_value: Set(row.product_value),
            purchase_date: Set(row.purchase_date),
            tracking_code: Set(row.tracking_code),
            current_location: Set(row.current_location),
            observations: Set(row.observations),
            status: Set(row.status),
            board_status: Set(row.board_status),
            updated_at: Set(row.updated_at),
        }
    }
}

#[async_trait]
impl OrderMirror for DatabaseMirror {
    fn name(&self) -> &'static str {
        "database"
    }

    #[instrument(skip(self, order), fields(purchase_id = %order.purchase_id))]
    async fn upsert(&self, order: &Order) -> Result<(), ServiceError> {
        Pedido::insert(Self::active_model(order))
            .on_conflict(
                OnConflict::column(Column::PurchaseId)
                    .update_columns([
                        Column::Id,
                        Column::BuyerName,
                        Column::BuyerPhone,
                        Column::ProductTitle,
                        Column::Quantity,
                        Column::ProductValue,
                        Column::PurchaseDate,
                        Column::TrackingCode,
                        Column::CurrentLocation,
                        Column::Observations,
                        Column::Status,
                        Column::BoardStatus,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Order>, ServiceError> {
        let rows = Pedido::find()
            .order_by_desc(Column::UpdatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let purchase_id = row.purchase_id.clone();
                let order = row.into_order();
                if order.is_none() {
                    warn!(%purchase_id, "skipping mirror row without a usable status");
                }
                order
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.db.ping().await?;
        Ok(())
    }
}
