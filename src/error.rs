use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::domain::moderation::{ReviewDenial, TransitionError};
use crate::domain::tag_codec::TagCodecError;
use crate::models::db_operations::DbError;

/// Every failure a request can end with.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("You must be logged in.")]
    Unauthenticated,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found.")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(DbError),
    #[error("{0}")]
    Upstream(String),
    #[error("Chat assistant is not configured.")]
    ChatUnavailable,
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse { success: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: String) -> Self {
        ApiResponse { success: false, data: None, error: Some(message) }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::TagIdsExhausted => {
                AppError::Validation(
                    "No more tags can be created: all 63 tag slots hold a live tag. Delete a tag to free one."
                        .to_string(),
                )
            }
            other => AppError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(DbError::Rusqlite(e))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Storage(DbError::Pool(e))
    }
}

impl From<TagCodecError> for AppError {
    fn from(e: TagCodecError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<ReviewDenial> for AppError {
    fn from(e: ReviewDenial) -> Self {
        match e {
            ReviewDenial::OwnPost => AppError::Forbidden(e.to_string()),
            ReviewDenial::NotValidated | ReviewDenial::AlreadyReviewed => AppError::Validation(e.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(format!("File system error: {}", e))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ChatUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details go to the log, never to the client.
        let message = match self {
            AppError::Storage(e) => {
                log::error!("Storage failure: {}", e);
                "An internal storage error occurred.".to_string()
            }
            AppError::Internal(e) => {
                log::error!("Internal failure: {}", e);
                "An unexpected error occurred.".to_string()
            }
            AppError::Upstream(e) => {
                log::warn!("Chat provider failure: {}", e);
                "The chat assistant is unavailable right now.".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_not_leaked() {
        let err = AppError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn review_denials_map_to_client_errors() {
        assert_eq!(AppError::from(ReviewDenial::OwnPost).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(ReviewDenial::AlreadyReviewed).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(DbError::TagIdsExhausted).status_code(), StatusCode::BAD_REQUEST);
    }
}
