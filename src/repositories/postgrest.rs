use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, warn};

use super::OrderMirror;
use crate::entities::pedido;
use crate::errors::ServiceError;
use crate::models::Order;

/// Mirror backed by a PostgREST endpoint such as Supabase's REST API.
///
/// Rows carry the table's original column set. `board_status` is only sent
/// when enabled, since PostgREST rejects writes naming unknown columns.
#[derive(Clone)]
pub struct PostgrestMirror {
    client: Client,
    endpoint: String,
    api_key: String,
    board_status: bool,
}

impl std::fmt::Debug for PostgrestMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestMirror")
            .field("endpoint", &self.endpoint)
            .field("board_status", &self.board_status)
            .finish_non_exhaustive()
    }
}

impl PostgrestMirror {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.into(),
            board_status: false,
        })
    }

    /// Also writes the board column to `board_status`.
    pub fn with_board_status(mut self, enabled: bool) -> Self {
        self.board_status = enabled;
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::MirrorError(format!(
            "PostgREST responded {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl OrderMirror for PostgrestMirror {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    #[instrument(skip(self, order), fields(purchase_id = %order.purchase_id))]
    async fn upsert(&self, order: &Order) -> Result<(), ServiceError> {
        let mut row = pedido::Model::from(order);
        if !self.board_status {
            row.board_status = None;
        }
        let response = self
            .authorized(self.client.post(&self.endpoint))
            .query(&[("on_conflict", "purchase_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Order>, ServiceError> {
        let response = self
            .authorized(self.client.get(&self.endpoint))
            .query(&[("select", "*"), ("order", "updated_at.desc")])
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        Ok(rows
            .into_iter()
            .filter_map(|raw| {
                let row: pedido::Model = match serde_json::from_value(raw) {
                    Ok(row) => row,
                    Err(e) => {
                        warn!(error = %e, "skipping undecodable mirror row");
                        return None;
                    }
                };
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
        let response = self
            .authorized(self.client.get(&self.endpoint))
            .query(&[("select", "purchase_id"), ("limit", "1")])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
