use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// A single failed field in a rejected payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "purchase_id")]
    pub field: String,
    #[schema(example = "purchase_id is required")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Bad Request",
    "message": "Payload do webhook inválido",
    "errors": [{ "field": "purchase_id", "message": "purchase_id is required" }],
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    pub success: bool,
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Field-level problems for rejected payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Unrecognized vendor status: {0}")]
    UnrecognizedVendorStatus(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence mirror error: {0}")]
    MirrorError(String),

    #[error("Broadcast write error: {0}")]
    BroadcastError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<FieldError> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| {
                    let message = match (&failure.message, &*failure.code) {
                        (Some(message), _) => message.to_string(),
                        (None, "required") => format!("{} is required", field),
                        (None, code) => format!("{} is invalid ({})", field, code),
                    };
                    FieldError::new(field, message)
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::ValidationError {
            message: "Payload inválido".to_string(),
            errors,
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::ValidationError {
            message: "Payload inválido".to_string(),
            errors: vec![FieldError::new("body", rejection.body_text())],
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(err: sea_orm::DbErr) -> Self {
        ServiceError::MirrorError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::MirrorError(err.to_string())
    }
}

impl ServiceError {
    /// Single-field validation failure.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        ServiceError::ValidationError {
            message: message.clone(),
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Replaces the top-level message of a validation failure, keeping its field list.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            ServiceError::ValidationError { errors, .. } => ServiceError::ValidationError {
                message: message.into(),
                errors,
            },
            other => other,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. }
            | Self::UnrecognizedVendorStatus(_)
            | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MirrorError(_) => StatusCode::BAD_GATEWAY,
            Self::BroadcastError(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message suitable for HTTP responses. Internal failures get a generic text.
    pub fn response_message(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::BroadcastError(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            Self::MirrorError(_) => "Persistence mirror unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            Self::ValidationError { errors, .. } if !errors.is_empty() => Some(errors.clone()),
            Self::UnrecognizedVendorStatus(code) => Some(vec![FieldError::new(
                "status",
                format!("unrecognized vendor status '{}'", code),
            )]),
            Self::InvalidStatus(status) => Some(vec![FieldError::new(
                "status",
                format!("unknown order status '{}'", status),
            )]),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            errors: self.field_errors(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
