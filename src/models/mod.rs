pub mod order;

pub use order::{BraipStatus, Order, OrderInput, OrderStatus, StatusChange};
