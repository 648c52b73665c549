use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::Order;

/// Best-effort copy of the order table kept outside the process.
///
/// The live store stays authoritative; callers log mirror failures and carry on.
#[async_trait]
pub trait OrderMirror: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Inserts or replaces the row keyed by `purchase_id`.
    async fn upsert(&self, order: &Order) -> Result<(), ServiceError>;

    /// Every row that converts into an order, most recently updated first.
    async fn fetch_all(&self) -> Result<Vec<Order>, ServiceError>;

    async fn ping(&self) -> Result<(), ServiceError>;
}

/// Mirror used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

#[async_trait]
impl OrderMirror for NoopMirror {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn upsert(&self, _order: &Order) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
