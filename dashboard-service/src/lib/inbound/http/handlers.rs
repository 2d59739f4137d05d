use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::account::errors::AccountError;
use crate::domain::session::errors::SessionError;

pub mod accounts;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// HTTP-facing failures.
///
/// Internal errors keep their detail for the server log only; the response
/// body always carries a generic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InvalidCredentials,
    Unauthenticated,
    InvalidToken,
    Forbidden(String),
    RateLimited { retry_after_secs: u64 },
    BadRequest(String),
    UnprocessableEntity(String),
    Conflict(String),
    InternalServerError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated | ApiError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::InvalidToken => "invalid_token",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UnprocessableEntity(_) => "unprocessable_entity",
            ApiError::Conflict(_) => "conflict",
            ApiError::InternalServerError(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::Unauthenticated => "Authentication required".to_string(),
            ApiError::InvalidToken => {
                "Invalid or expired refresh token, please log in again".to_string()
            }
            ApiError::RateLimited { .. } => {
                "Too many failed login attempts, please try again later".to_string()
            }
            ApiError::InternalServerError(_) => "Internal server error".to_string(),
            ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InternalServerError(detail) = &self {
            tracing::error!(error = %detail, "Request failed with internal error");
        }

        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let body = ApiErrorData {
            error: self.category().to_string(),
            message: self.message(),
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }

        response
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => ApiError::InvalidCredentials,
            SessionError::RateLimited { retry_after } => ApiError::RateLimited {
                retry_after_secs: whole_seconds(retry_after),
            },
            SessionError::Unauthenticated => ApiError::Unauthenticated,
            SessionError::InvalidToken => ApiError::InvalidToken,
            SessionError::HashingFailed(_)
            | SessionError::TokenIssuance(_)
            | SessionError::Repository(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UsernameAlreadyExists(_) => ApiError::Conflict(err.to_string()),
            AccountError::InvalidUsername(_) | AccountError::InvalidPassword(_) => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            // A stored row with an unknown role is a data fault, not bad input
            AccountError::InvalidRole(_)
            | AccountError::HashingFailed(_)
            | AccountError::DatabaseError(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected unreadable request body");
        ApiError::BadRequest(
            "Request body must be a JSON object with the expected fields".to_string(),
        )
    }
}

/// Round up so clients never retry a moment too early.
fn whole_seconds(duration: Duration) -> u64 {
    let seconds = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    seconds.max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorData {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}
