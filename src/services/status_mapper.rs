//! Vendor status → board column.
//!
//! The table is total over [`BraipStatus`]. Raw codes that do not parse are
//! rejected with [`ServiceError::UnrecognizedVendorStatus`]; there is no
//! fallback column. `delivered_unpaid` is never produced here, only a manual
//! edit can put an order in that column.

use std::str::FromStr;

use crate::errors::ServiceError;
use crate::models::{BraipStatus, OrderStatus};

/// Result of mapping one vendor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedStatus {
    pub status: OrderStatus,
    pub location: &'static str,
}

pub fn map_vendor_status(vendor: BraipStatus) -> MappedStatus {
    let (status, location) = match vendor {
        BraipStatus::PagamentoConfirmado => (
            OrderStatus::Placed,
            "Pagamento confirmado - Aguardando processamento",
        ),
        BraipStatus::EmAndamento => (
            OrderStatus::Progress,
            "Pedido em andamento - Preparando envio",
        ),
        BraipStatus::Postado => (OrderStatus::Pickup, "Postado nos Correios"),
        BraipStatus::AguardandoRetirada => (
            OrderStatus::Pickup,
            "Disponível para retirada na agência",
        ),
        BraipStatus::Entregue => (OrderStatus::Delivered, "Entregue ao destinatário"),
        BraipStatus::Frustrado => (OrderStatus::Failed, "Entrega frustrada"),
        BraipStatus::NaoRetirado => (
            OrderStatus::Failed,
            "Não retirado - Devolvido ao remetente",
        ),
    };
    MappedStatus { status, location }
}

/// Parses a raw vendor code. Surrounding whitespace is ignored, case is not.
pub fn parse_vendor_code(code: &str) -> Result<BraipStatus, ServiceError> {
    BraipStatus::from_str(code.trim())
        .map_err(|_| ServiceError::UnrecognizedVendorStatus(code.to_string()))
}

pub fn map_vendor_code(code: &str) -> Result<(BraipStatus, MappedStatus), ServiceError> {
    let vendor = parse_vendor_code(code)?;
    Ok((vendor, map_vendor_status(vendor)))
}

/// Vendor code recorded for a column when an order carries none of its own
/// or has been moved away from the column its code maps to.
pub fn vendor_code_for(status: OrderStatus) -> BraipStatus {
    match status {
        OrderStatus::Placed => BraipStatus::PagamentoConfirmado,
        OrderStatus::Progress => BraipStatus::EmAndamento,
        OrderStatus::Pickup => BraipStatus::Postado,
        OrderStatus::Delivered | OrderStatus::DeliveredUnpaid => BraipStatus::Entregue,
        OrderStatus::Failed => BraipStatus::Frustrado,
    }
}
