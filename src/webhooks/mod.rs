/// Inbound webhooks from the sales platform
pub mod braip;

pub use braip::{is_webhook_shaped, BraipWebhookPayload, VendorUpdate};
