pub mod orders;
pub mod status_mapper;

pub use orders::{IngestSource, OrderService};
