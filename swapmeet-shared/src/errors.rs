use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Swipe and match errors
/// - E3xxx: Trade lifecycle errors
/// - E4xxx: Messaging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Matching (E2xxx)
    PostNotFound,
    CannotSwipeOwnPost,
    MatchNotFound,
    NotMatchParticipant,

    // Trade (E3xxx)
    NoItemSelected,
    ItemNotLiked,
    AlreadyProposed,
    ItemsNotChosen,
    TradeAlreadyExists,
    TradeNotFound,
    InvalidTransition,
    ShippingIncomplete,
    ProofUploadFailed,
    ActionInFlight,

    // Messaging (E4xxx)
    MessageEmpty,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",
            Self::PayloadTooLarge => "E0008",

            // Auth
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",

            // Matching
            Self::PostNotFound => "E2001",
            Self::CannotSwipeOwnPost => "E2002",
            Self::MatchNotFound => "E2003",
            Self::NotMatchParticipant => "E2004",

            // Trade
            Self::NoItemSelected => "E3001",
            Self::ItemNotLiked => "E3002",
            Self::AlreadyProposed => "E3003",
            Self::ItemsNotChosen => "E3004",
            Self::TradeAlreadyExists => "E3005",
            Self::TradeNotFound => "E3006",
            Self::InvalidTransition => "E3007",
            Self::ShippingIncomplete => "E3008",
            Self::ProofUploadFailed => "E3009",
            Self::ActionInFlight => "E3010",

            // Messaging
            Self::MessageEmpty => "E4001",
        }
    }

    /// Reverse lookup used by clients decoding an error envelope.
    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: &[ErrorCode] = &[
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest,
            ErrorCode::PayloadTooLarge,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::PostNotFound,
            ErrorCode::CannotSwipeOwnPost,
            ErrorCode::MatchNotFound,
            ErrorCode::NotMatchParticipant,
            ErrorCode::NoItemSelected,
            ErrorCode::ItemNotLiked,
            ErrorCode::AlreadyProposed,
            ErrorCode::ItemsNotChosen,
            ErrorCode::TradeAlreadyExists,
            ErrorCode::TradeNotFound,
            ErrorCode::InvalidTransition,
            ErrorCode::ShippingIncomplete,
            ErrorCode::ProofUploadFailed,
            ErrorCode::ActionInFlight,
            ErrorCode::MessageEmpty,
        ];
        ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError | Self::BadRequest | Self::NoItemSelected
            | Self::ItemsNotChosen | Self::ShippingIncomplete | Self::MessageEmpty
            | Self::ItemNotLiked => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::PostNotFound | Self::MatchNotFound
            | Self::TradeNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchParticipant | Self::CannotSwipeOwnPost => StatusCode::FORBIDDEN,
            Self::AlreadyProposed | Self::TradeAlreadyExists | Self::InvalidTransition
            | Self::ActionInFlight => StatusCode::CONFLICT,
            Self::ProofUploadFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// The code this error surfaces as, if it carries one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Validation(_) => Some(ErrorCode::ValidationError),
            AppError::Database(diesel::result::Error::NotFound) => Some(ErrorCode::NotFound),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Infrastructure failures are logged in full and surfaced generically.
        let (code, message, details) = match self {
            AppError::Known { code, message, details } => (code, message, details),
            AppError::Validation(message) => (ErrorCode::ValidationError, message, None),
            AppError::Database(diesel::result::Error::NotFound) => {
                (ErrorCode::NotFound, "resource not found".to_string(), None)
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (ErrorCode::InternalError, "database error".to_string(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (ErrorCode::InternalError, "internal server error".to_string(), None)
            }
        };

        let status = code.status_code();
        if status.is_server_error() {
            tracing::error!(code = code.code(), "{message}");
        } else {
            tracing::debug!(code = code.code(), "{message}");
        }

        let mut body = ApiErrorResponse::new(code.code(), message);
        if let Some(details) = details {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let err = AppError::new(ErrorCode::ItemsNotChosen, "both sides must choose an item first");
        let value = body_json(err).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E3004");
        assert_eq!(value["error"]["message"], "both sides must choose an item first");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn conflict_codes_map_to_409() {
        for code in [ErrorCode::TradeAlreadyExists, ErrorCode::InvalidTransition, ErrorCode::ActionInFlight] {
            let response = AppError::new(code, "x").into_response();
            assert_eq!(response.status(), StatusCode::CONFLICT);
        }
    }

    #[tokio::test]
    async fn database_not_found_is_404() {
        let response = AppError::Database(diesel::result::Error::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let value = body_json(AppError::Internal(anyhow::anyhow!("pool exhausted"))).await;
        assert_eq!(value["error"]["code"], "E0001");
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn details_are_serialized() {
        let err = AppError::with_details(
            ErrorCode::ShippingIncomplete,
            "courier, tracking code and proof image are required",
            serde_json::json!({ "missing": ["image"] }),
        );
        let value = body_json(err).await;
        assert_eq!(value["error"]["details"]["missing"][0], "image");
    }

    #[test]
    fn codes_round_trip_through_lookup() {
        assert_eq!(ErrorCode::from_code("E3005"), Some(ErrorCode::TradeAlreadyExists));
        assert_eq!(ErrorCode::from_code("E4001"), Some(ErrorCode::MessageEmpty));
        assert_eq!(ErrorCode::from_code("E9999"), None);
    }
}
