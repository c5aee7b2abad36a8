use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error body returned to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
}

/// Unified error type for every fallible operation in the service.
///
/// Authorization failures are produced at the guard boundary and never reach
/// store code; gateway failures are kept distinct from internal ones so a
/// caller can tell a processor outage apart from a bug on our side.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing or malformed credentials")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment gateway error: {0}")]
    GatewayError(String),

    #[error("Payment gateway timed out")]
    GatewayTimeout,

    #[error("Order {0} is already settled")]
    AlreadySettled(Uuid),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidToken | ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::AlreadySettled(_) => StatusCode::CONFLICT,
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Database details stay in the logs, not in the response body.
        let message = match &self {
            ServiceError::DatabaseError(err) => {
                tracing::error!(error = %err, "database operation failed");
                "a storage error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_failures_map_to_distinct_statuses() {
        assert_eq!(ServiceError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::InvalidToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn gateway_failures_map_to_upstream_statuses() {
        assert_eq!(
            ServiceError::GatewayError("declined".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ServiceError::GatewayTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn resettlement_maps_to_conflict() {
        assert_eq!(
            ServiceError::AlreadySettled(Uuid::new_v4()).status_code(),
            StatusCode::CONFLICT
        );
    }
}
