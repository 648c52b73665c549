pub mod health;
pub mod orders;
pub mod updates;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
