/*
 * Responsibility
 * - Gateway-wide AppError
 * - IntoResponse (HTTP status / JSON error body)
 * - the single place where resolver failures become client-visible errors
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::resolver::ResolveError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("arguments invalid: header must have operationID")]
    MissingOperationId,
    #[error("arguments invalid: token is empty")]
    MissingCredential,
    #[error("token invalid: {0}")]
    InvalidToken(String),
    #[error("token type error")]
    RoleMismatch,
    #[error("token authority unavailable")]
    AuthorityUnavailable,
    #[error("token authority timed out")]
    AuthorityTimeout,
    #[error("upstream service unavailable")]
    UpstreamUnavailable,
    #[error("request timed out")]
    RequestTimeout,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingOperationId | AppError::MissingCredential => "ARGS_INVALID",
            AppError::InvalidToken(_) => "TOKEN_INVALID",
            AppError::RoleMismatch => "TOKEN_TYPE_ERROR",
            AppError::AuthorityUnavailable => "AUTHORITY_UNAVAILABLE",
            AppError::AuthorityTimeout => "AUTHORITY_TIMEOUT",
            AppError::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::Internal => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingOperationId => StatusCode::BAD_REQUEST,
            AppError::MissingCredential | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::RoleMismatch => StatusCode::FORBIDDEN,
            AppError::AuthorityUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AuthorityTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Transport(_) => AppError::AuthorityUnavailable,
            ResolveError::DeadlineExceeded => AppError::AuthorityTimeout,
            ResolveError::Rejected(reason) => AppError::InvalidToken(reason),
            // The authority answered with something we cannot trust
            ResolveError::UnknownRole(_) | ResolveError::MalformedResponse(_) => {
                AppError::InvalidToken(e.to_string())
            }
        }
    }
}
