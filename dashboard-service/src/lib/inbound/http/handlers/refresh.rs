use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::RefreshedSession;
use crate::domain::session::ports::SessionServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<RefreshResponseData>, ApiError> {
    // A missing or unreadable refresh token is just an invalid one.
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected unreadable refresh request");
        ApiError::InvalidToken
    })?;

    state
        .session_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|session| ApiSuccess::new(StatusCode::OK, session.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequestBody {
    refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponseData {
    pub access_token: String,
    pub csrf_token: String,
    pub expires_in: u64,
}

impl From<RefreshedSession> for RefreshResponseData {
    fn from(session: RefreshedSession) -> Self {
        Self {
            access_token: session.access_token,
            csrf_token: session.csrf_token,
            expires_in: session.expires_in,
        }
    }
}
