use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::session::ports::SessionServicePort;
use crate::inbound::http::middleware::bearer_token;
use crate::inbound::http::router::AppState;

/// Revokes the bearer token and, if supplied, the refresh token.
///
/// Always answers 200 so repeated or stale logouts are harmless.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequestBody>>,
) -> ApiSuccess<LogoutResponseData> {
    let access_token = bearer_token(&headers).unwrap_or_default();
    let refresh_token = body.as_ref().and_then(|Json(body)| body.refresh_token.as_deref());

    state
        .session_service
        .logout(access_token, refresh_token)
        .await;

    ApiSuccess::new(
        StatusCode::OK,
        LogoutResponseData {
            message: "Logged out".to_string(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequestBody {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub message: String,
}
