use crate::application::lending::LendingApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LendingApplicationError);

impl From<LendingApplicationError> for ApiError {
    fn from(err: LendingApplicationError) -> Self {
        ApiError(err)
    }
}

impl From<crate::domain::ValidationError> for ApiError {
    fn from(err: crate::domain::ValidationError) -> Self {
        ApiError(LendingApplicationError::InvalidInput(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self.0 {
            // 404 Not Found
            LendingApplicationError::ItemNotFound => (
                StatusCode::NOT_FOUND,
                "ITEM_NOT_FOUND",
                "Item not found".to_string(),
            ),

            // 403 Forbidden - 利用者の立場による拒否
            LendingApplicationError::AlreadyHolder => (
                StatusCode::FORBIDDEN,
                "ALREADY_HOLDER",
                "You already have this item".to_string(),
            ),
            LendingApplicationError::NotHolder => (
                StatusCode::FORBIDDEN,
                "NOT_HOLDER",
                "You are not the current holder of this item".to_string(),
            ),

            // 400 Bad Request - 状態と合わない要求
            LendingApplicationError::AlreadyQueued => (
                StatusCode::BAD_REQUEST,
                "ALREADY_QUEUED",
                "You are already in the reservation queue for this item".to_string(),
            ),
            LendingApplicationError::NotBorrowed => (
                StatusCode::BAD_REQUEST,
                "NOT_BORROWED",
                "Item is not borrowed".to_string(),
            ),

            // 422 Unprocessable Entity - 入力値の不正
            LendingApplicationError::InvalidInput(ref e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_INPUT",
                e.to_string(),
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            LendingApplicationError::DomainError(ref msg) => {
                tracing::error!("Domain error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DOMAIN_ERROR",
                    "Inconsistent lending state".to_string(),
                )
            }
            LendingApplicationError::StorageFailure(ref e) => {
                tracing::error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_FAILURE",
                    "Failed to access storage".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
